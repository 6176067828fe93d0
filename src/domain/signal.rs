//! Directional trading signal.

use std::fmt;

use super::error::ArlError;

/// Position direction at one tick: short, flat or long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Signal {
    Short,
    #[default]
    Flat,
    Long,
}

impl Signal {
    /// Sign of a raw predictor output. Exact zero is flat; non-finite output
    /// is a predictor error.
    pub fn from_prediction(value: f64) -> Result<Self, ArlError> {
        if !value.is_finite() {
            return Err(ArlError::predictor(format!(
                "prediction {value} is not finite"
            )));
        }
        Ok(if value > 0.0 {
            Signal::Long
        } else if value < 0.0 {
            Signal::Short
        } else {
            Signal::Flat
        })
    }

    pub fn from_i8(value: i8) -> Self {
        match value.signum() {
            1 => Signal::Long,
            -1 => Signal::Short,
            _ => Signal::Flat,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Signal::Short => -1.0,
            Signal::Flat => 0.0,
            Signal::Long => 1.0,
        }
    }

    pub fn is_flat(self) -> bool {
        self == Signal::Flat
    }

    /// Units traded when moving from `previous` to `self` (0, 1 or 2).
    pub fn turnover(self, previous: Signal) -> f64 {
        (self.as_f64() - previous.as_f64()).abs()
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v: i8 = match self {
            Signal::Short => -1,
            Signal::Flat => 0,
            Signal::Long => 1,
        };
        write!(f, "{v}")
    }
}

/// Converts a batch of raw predictions, failing on the first non-finite value.
pub fn signals_from_predictions(predictions: &[f64]) -> Result<Vec<Signal>, ArlError> {
    predictions.iter().map(|&p| Signal::from_prediction(p)).collect()
}
