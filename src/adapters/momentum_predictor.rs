//! Momentum baseline: the prediction is the summed return of the window.

use crate::domain::error::ArlError;
use crate::domain::featurizer::FeatureBatch;
use crate::ports::predictor_port::SignalPredictor;

/// Trains nothing; follows the direction of the most recent `lookback`
/// returns of each row (the whole row when `None`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MomentumPredictor {
    lookback: Option<usize>,
}

impl MomentumPredictor {
    pub fn new(lookback: Option<usize>) -> Self {
        Self { lookback }
    }
}

impl SignalPredictor for MomentumPredictor {
    fn train(&mut self, features: &FeatureBatch<'_>, targets: &[f64]) -> Result<(), ArlError> {
        if features.len() != targets.len() {
            return Err(ArlError::predictor(format!(
                "{} feature rows but {} targets",
                features.len(),
                targets.len()
            )));
        }
        Ok(())
    }

    fn predict(&mut self, features: &FeatureBatch<'_>) -> Result<Vec<f64>, ArlError> {
        let take = self.lookback.unwrap_or(features.width()).min(features.width());
        Ok(features
            .iter()
            .map(|row| row[row.len() - take..].iter().sum())
            .collect())
    }
}
