//! Risk control policies applied to the raw signal before each tick's P&L.
//!
//! Every policy shares one state record: the held raw direction
//! (`last_position`), a watermark and a stopped flag. A genuine change of the
//! raw signal opens a new position and resets the watermark. While the
//! position is held the drawdown policies compare against the watermark and
//! force the tick flat once the limit is breached; the stop then holds until
//! the raw signal changes again.

use std::fmt;

use super::equity::AccumulationMode;
use super::error::ArlError;
use super::signal::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum RiskControl {
    /// Never overrides the raw signal.
    #[default]
    NoControl,
    /// Trailing stop on the equity level: flat once equity falls more than
    /// `rate` below the best level seen since the position opened.
    PnlDrawdown { rate: f64 },
    /// Trailing stop on price: flat once price moves against the position by
    /// more than `threshold` from the most favorable price since entry.
    PriceDrawdown { threshold: f64 },
}

impl RiskControl {
    /// Parses a policy name (`none`, `pnl_drawdown`, `price_drawdown`).
    pub fn parse(kind: &str, threshold: f64) -> Option<Self> {
        match kind.trim().to_lowercase().as_str() {
            "none" | "no_control" => Some(RiskControl::NoControl),
            "pnl_drawdown" | "pnl" => Some(RiskControl::PnlDrawdown { rate: threshold }),
            "price_drawdown" | "price" => Some(RiskControl::PriceDrawdown { threshold }),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        let limit = match self {
            RiskControl::NoControl => return Ok(()),
            RiskControl::PnlDrawdown { rate } => *rate,
            RiskControl::PriceDrawdown { threshold } => *threshold,
        };
        if !limit.is_finite() || limit < 0.0 {
            return Err(format!("threshold must be finite and non-negative, got {limit}"));
        }
        Ok(())
    }

    pub fn requires_prices(&self) -> bool {
        matches!(self, RiskControl::PriceDrawdown { .. })
    }

    /// Drawdown policies work on the equity level, so they chain equity;
    /// the cost-only policy sums returns.
    pub fn default_accumulation(&self) -> AccumulationMode {
        match self {
            RiskControl::NoControl => AccumulationMode::Additive,
            RiskControl::PnlDrawdown { .. } | RiskControl::PriceDrawdown { .. } => {
                AccumulationMode::Chained
            }
        }
    }

    /// Decides the effective signal for one tick.
    ///
    /// `equity` is the equity level before this tick's P&L; `price` is the
    /// market price at the decision tick and is required by `PriceDrawdown`.
    pub fn apply(
        &self,
        state: &mut RiskState,
        raw: Signal,
        equity: f64,
        price: Option<f64>,
    ) -> Result<Signal, ArlError> {
        match *self {
            RiskControl::NoControl => {
                state.last_position = raw;
                Ok(raw)
            }
            RiskControl::PnlDrawdown { rate } => {
                if raw != state.last_position {
                    state.open(raw, equity);
                    return Ok(raw);
                }
                if state.stopped {
                    return Ok(Signal::Flat);
                }
                let diff = state.watermark - equity;
                if diff < 0.0 {
                    state.watermark = equity;
                } else if diff > rate {
                    state.stopped = true;
                    return Ok(Signal::Flat);
                }
                Ok(raw)
            }
            RiskControl::PriceDrawdown { threshold } => {
                let price = price.ok_or(ArlError::MissingPrices)?;
                if raw != state.last_position {
                    state.open(raw, price);
                    return Ok(raw);
                }
                if state.stopped {
                    return Ok(Signal::Flat);
                }
                let adverse = match raw {
                    Signal::Flat => return Ok(raw),
                    Signal::Long if price > state.watermark => {
                        state.watermark = price;
                        return Ok(raw);
                    }
                    Signal::Short if price < state.watermark => {
                        state.watermark = price;
                        return Ok(raw);
                    }
                    Signal::Long => state.watermark - price,
                    Signal::Short => price - state.watermark,
                };
                if adverse > threshold {
                    state.stopped = true;
                    return Ok(Signal::Flat);
                }
                Ok(raw)
            }
        }
    }
}

impl fmt::Display for RiskControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskControl::NoControl => write!(f, "none"),
            RiskControl::PnlDrawdown { rate } => write!(f, "pnl_drawdown({rate})"),
            RiskControl::PriceDrawdown { threshold } => write!(f, "price_drawdown({threshold})"),
        }
    }
}

/// Policy state carried tick to tick and segment to segment.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskState {
    /// Held raw direction; an override does not change it.
    pub last_position: Signal,
    /// Best equity level (PnL policy) or most favorable price (price policy)
    /// since the position opened.
    pub watermark: f64,
    /// Set when a drawdown limit forced the position flat.
    pub stopped: bool,
}

impl RiskState {
    pub fn new(watermark: f64) -> Self {
        Self {
            last_position: Signal::Flat,
            watermark,
            stopped: false,
        }
    }

    fn open(&mut self, position: Signal, reference: f64) {
        self.last_position = position;
        self.watermark = reference;
        self.stopped = false;
    }
}
