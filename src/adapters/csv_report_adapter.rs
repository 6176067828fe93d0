//! Curve report adapter writing `step,equity,signal` rows.
//!
//! Step 0 is the starting equity and has no signal; step `k` is the curve
//! after the `k`-th scored tick and carries that tick's effective signal.

use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::ArlError;
use crate::ports::report_port::ReportPort;

pub const HEADER: [&str; 3] = ["step", "equity", "signal"];

#[derive(Debug, Clone, Copy, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Reads the equity column back from a curve file. Files without a
    /// header named `equity` are read from their first column.
    pub fn read_curve(path: impl AsRef<Path>) -> Result<Vec<f64>, ArlError> {
        let path = path.as_ref();
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(|e| ArlError::Io {
                reason: format!("failed to read {}: {}", path.display(), e),
            })?;

        let mut column = 0;
        let mut curve = Vec::new();
        for (i, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| ArlError::data(format!("CSV parse error: {e}")))?;
            if i == 0 {
                if let Some(pos) = record.iter().position(|c| c.trim() == "equity") {
                    column = pos;
                    continue;
                }
            }
            let raw = record
                .get(column)
                .ok_or_else(|| ArlError::data(format!("row {}: missing equity column", i + 1)))?;
            let value: f64 = raw
                .trim()
                .parse()
                .map_err(|e| ArlError::data(format!("row {}: invalid value '{raw}': {e}", i + 1)))?;
            curve.push(value);
        }
        Ok(curve)
    }
}

fn write_error(path: &str, e: impl std::fmt::Display) -> ArlError {
    ArlError::Io {
        reason: format!("failed to write {path}: {e}"),
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, result: &BacktestResult, output_path: &str) -> Result<(), ArlError> {
        let mut wtr = csv::Writer::from_path(output_path).map_err(|e| write_error(output_path, e))?;
        wtr.write_record(HEADER)
            .map_err(|e| write_error(output_path, e))?;

        for (step, equity) in result.curve.iter().enumerate() {
            let signal = match step {
                0 => String::new(),
                k => result
                    .signals
                    .get(k - 1)
                    .map(|s| s.to_string())
                    .unwrap_or_default(),
            };
            wtr.write_record([step.to_string(), equity.to_string(), signal])
                .map_err(|e| write_error(output_path, e))?;
        }
        wtr.flush().map_err(|e| write_error(output_path, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::engine::{CarriedState, EngineConfig};
    use crate::domain::equity::AccumulationMode;
    use crate::domain::risk::RiskControl;
    use crate::domain::signal::Signal;
    use std::fs;
    use tempfile::TempDir;

    fn sample_result() -> BacktestResult {
        let config = EngineConfig::for_policy(0.0, RiskControl::NoControl);
        BacktestResult {
            mode: AccumulationMode::Additive,
            curve: vec![0.0, 0.01, -0.01],
            pnl: vec![0.01, -0.02],
            raw_signals: vec![Signal::Long, Signal::Short],
            signals: vec![Signal::Long, Signal::Short],
            segments: Vec::new(),
            final_state: CarriedState::initial(&config),
        }
    }

    #[test]
    fn writes_one_row_per_curve_point() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("curve.csv");
        let path_str = path.to_str().unwrap();
        CsvReportAdapter::new().write(&sample_result(), path_str).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "step,equity,signal");
        assert_eq!(lines[1], "0,0,");
        assert_eq!(lines[2], "1,0.01,1");
        assert_eq!(lines[3], "2,-0.01,-1");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn curve_reads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("curve.csv");
        CsvReportAdapter::new()
            .write(&sample_result(), path.to_str().unwrap())
            .unwrap();
        let curve = CsvReportAdapter::read_curve(&path).unwrap();
        assert_eq!(curve, vec![0.0, 0.01, -0.01]);
    }

    #[test]
    fn headerless_single_column_reads_first_column() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pt.csv");
        fs::write(&path, "1.0\n1.5\n0.5\n").unwrap();
        assert_eq!(CsvReportAdapter::read_curve(&path).unwrap(), vec![1.0, 1.5, 0.5]);
    }

    #[test]
    fn write_to_missing_directory_fails() {
        let err = CsvReportAdapter::new()
            .write(&sample_result(), "/nonexistent/dir/curve.csv")
            .unwrap_err();
        assert!(matches!(err, ArlError::Io { .. }));
    }
}
