//! Directional predictor port trait.

use crate::domain::error::ArlError;
use crate::domain::featurizer::FeatureBatch;

/// Model retrained on each training window and queried on the following
/// test window. Implementations own their parameters and any seeding.
pub trait SignalPredictor {
    /// Updates the model from one training batch; `targets[k]` is the
    /// return that followed row `k`.
    fn train(&mut self, features: &FeatureBatch<'_>, targets: &[f64]) -> Result<(), ArlError>;

    /// Raw signed output per row. The caller takes the sign; non-finite
    /// output is reported as a predictor error.
    fn predict(&mut self, features: &FeatureBatch<'_>) -> Result<Vec<f64>, ArlError>;
}

impl<P: SignalPredictor + ?Sized> SignalPredictor for Box<P> {
    fn train(&mut self, features: &FeatureBatch<'_>, targets: &[f64]) -> Result<(), ArlError> {
        (**self).train(features, targets)
    }

    fn predict(&mut self, features: &FeatureBatch<'_>) -> Result<Vec<f64>, ArlError> {
        (**self).predict(features)
    }
}
