//! Report generation port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::ArlError;

/// Port for writing the cumulative curve of a run.
pub trait ReportPort {
    fn write(&self, result: &BacktestResult, output_path: &str) -> Result<(), ArlError>;
}
