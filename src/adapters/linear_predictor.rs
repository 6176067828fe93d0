//! Online linear regressor over the feature window.
//!
//! Weights start at zero and persist from one segment to the next; each
//! `train` call runs `epochs` passes of per-row gradient steps on the squared
//! error. Training order is fixed, so runs are deterministic.

use crate::domain::error::ArlError;
use crate::domain::featurizer::FeatureBatch;
use crate::ports::predictor_port::SignalPredictor;
use tracing::trace;

pub const DEFAULT_LEARNING_RATE: f64 = 0.01;
pub const DEFAULT_EPOCHS: usize = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct LinearPredictor {
    learning_rate: f64,
    epochs: usize,
    weights: Vec<f64>,
    bias: f64,
}

impl LinearPredictor {
    pub fn new(learning_rate: f64, epochs: usize) -> Self {
        Self {
            learning_rate,
            epochs,
            weights: Vec::new(),
            bias: 0.0,
        }
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    fn output(&self, row: &[f64]) -> f64 {
        self.weights
            .iter()
            .zip(row)
            .fold(self.bias, |acc, (w, x)| acc + w * x)
    }

    fn ensure_width(&mut self, width: usize) {
        if self.weights.len() != width {
            self.weights = vec![0.0; width];
            self.bias = 0.0;
        }
    }
}

impl Default for LinearPredictor {
    fn default() -> Self {
        Self::new(DEFAULT_LEARNING_RATE, DEFAULT_EPOCHS)
    }
}

impl SignalPredictor for LinearPredictor {
    fn train(&mut self, features: &FeatureBatch<'_>, targets: &[f64]) -> Result<(), ArlError> {
        if features.len() != targets.len() {
            return Err(ArlError::predictor(format!(
                "{} feature rows but {} targets",
                features.len(),
                targets.len()
            )));
        }
        self.ensure_width(features.width());

        for _ in 0..self.epochs {
            for (row, &target) in features.iter().zip(targets) {
                let error = self.output(row) - target;
                let step = self.learning_rate * error;
                for (w, x) in self.weights.iter_mut().zip(row) {
                    *w -= step * x;
                }
                self.bias -= step;
            }
        }

        if self.bias.is_finite() && self.weights.iter().all(|w| w.is_finite()) {
            trace!(bias = self.bias, rows = features.len(), "linear predictor trained");
            Ok(())
        } else {
            Err(ArlError::predictor("weights diverged during training"))
        }
    }

    fn predict(&mut self, features: &FeatureBatch<'_>) -> Result<Vec<f64>, ArlError> {
        if self.weights.len() != features.width() {
            return Err(ArlError::predictor(format!(
                "model expects {} features, got {}",
                self.weights.len(),
                features.width()
            )));
        }
        Ok(features.iter().map(|row| self.output(row)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::featurizer::WindowFeaturizer;

    #[test]
    fn untrained_model_cannot_predict() {
        let returns = [0.0, 0.1, 0.2, 0.3];
        let m = WindowFeaturizer::new(2).featurize(&returns).unwrap();
        let mut model = LinearPredictor::default();
        assert!(matches!(
            model.predict(&m.batch(0..2)),
            Err(ArlError::Predictor { .. })
        ));
    }

    #[test]
    fn training_moves_prediction_toward_target() {
        // every target equals 1 and every feature row is constant
        let returns = [1.0; 12];
        let m = WindowFeaturizer::new(3).featurize(&returns).unwrap();
        let mut model = LinearPredictor::new(0.05, 20);
        let rows = 0..m.labelled_rows();
        model.train(&m.batch(rows.clone()), m.targets(rows)).unwrap();
        let predictions = model.predict(&m.batch(0..1)).unwrap();
        assert!((predictions[0] - 1.0).abs() < 0.05);
    }

    #[test]
    fn weights_persist_between_segments() {
        let returns = [0.5, -0.5, 0.5, -0.5, 0.5, -0.5, 0.5];
        let m = WindowFeaturizer::new(2).featurize(&returns).unwrap();
        let mut model = LinearPredictor::new(0.1, 1);
        model.train(&m.batch(0..2), m.targets(0..2)).unwrap();
        let after_first = model.weights().to_vec();
        model.train(&m.batch(2..4), m.targets(2..4)).unwrap();
        assert_ne!(model.weights(), after_first.as_slice());
        assert_eq!(model.weights().len(), 2);
    }

    #[test]
    fn training_is_deterministic() {
        let returns: Vec<f64> = (0..40).map(|i| ((i * 7) % 5) as f64 * 0.01 - 0.02).collect();
        let m = WindowFeaturizer::new(4).featurize(&returns).unwrap();
        let run = || {
            let mut model = LinearPredictor::new(0.1, 3);
            model.train(&m.batch(0..20), m.targets(0..20)).unwrap();
            model.predict(&m.batch(20..30)).unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn divergence_is_a_predictor_error() {
        let returns = [1e200; 6];
        let m = WindowFeaturizer::new(2).featurize(&returns).unwrap();
        let mut model = LinearPredictor::new(1.0, 5);
        let err = model.train(&m.batch(0..4), m.targets(0..4)).unwrap_err();
        assert!(matches!(err, ArlError::Predictor { .. }));
    }

    #[test]
    fn mismatched_targets_fail() {
        let returns = [0.0, 0.1, 0.2, 0.3];
        let m = WindowFeaturizer::new(2).featurize(&returns).unwrap();
        let mut model = LinearPredictor::default();
        assert!(model.train(&m.batch(0..2), &[0.1]).is_err());
    }
}
