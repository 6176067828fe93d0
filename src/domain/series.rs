//! Quotes and the price/return series derived from them.
//!
//! Both series are built once from the loaded quotes and are read-only
//! afterwards. Tick indices are shared: `prices()[t]` and `returns()[t]`
//! describe the same tick.

use chrono::NaiveDateTime;

use super::error::ArlError;

/// One bid/ask quote as produced by a quote source.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub timestamp: Option<NaiveDateTime>,
    pub ask: f64,
    pub bid: f64,
}

impl Quote {
    pub fn mid(&self) -> f64 {
        (self.ask + self.bid) / 2.0
    }

    pub fn spread(&self) -> f64 {
        self.ask - self.bid
    }
}

/// Which side of the quote feeds the price series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriceField {
    #[default]
    Ask,
    Bid,
    Mid,
}

impl PriceField {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "ask" => Some(PriceField::Ask),
            "bid" => Some(PriceField::Bid),
            "mid" => Some(PriceField::Mid),
            _ => None,
        }
    }

    pub fn select(self, quote: &Quote) -> f64 {
        match self {
            PriceField::Ask => quote.ask,
            PriceField::Bid => quote.bid,
            PriceField::Mid => quote.mid(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    values: Vec<f64>,
}

impl PriceSeries {
    /// Rejects non-finite prices.
    pub fn new(values: Vec<f64>) -> Result<Self, ArlError> {
        if let Some(tick) = values.iter().position(|p| !p.is_finite()) {
            return Err(ArlError::numeric(tick, "price is not finite"));
        }
        Ok(Self { values })
    }

    pub fn from_quotes(quotes: &[Quote], field: PriceField) -> Result<Self, ArlError> {
        Self::new(quotes.iter().map(|q| field.select(q)).collect())
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Simple returns, `r[0] = 0` and `r[t] = p[t] / p[t-1] - 1`.
///
/// `r[t + 1]` is the return realized by a position held over `[t, t + 1)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnSeries {
    values: Vec<f64>,
}

impl ReturnSeries {
    pub fn from_prices(prices: &PriceSeries) -> Result<Self, ArlError> {
        let p = prices.values();
        let mut values = Vec::with_capacity(p.len());
        if !p.is_empty() {
            values.push(0.0);
        }
        for (t, w) in p.windows(2).enumerate() {
            let r = w[1] / w[0] - 1.0;
            if !r.is_finite() {
                return Err(ArlError::numeric(
                    t + 1,
                    format!("return from price {} to {} is not finite", w[0], w[1]),
                ));
            }
            values.push(r);
        }
        Ok(Self { values })
    }

    /// Wraps already-computed returns; rejects non-finite values.
    pub fn from_values(values: Vec<f64>) -> Result<Self, ArlError> {
        if let Some(tick) = values.iter().position(|r| !r.is_finite()) {
            return Err(ArlError::numeric(tick, "return is not finite"));
        }
        Ok(Self { values })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
