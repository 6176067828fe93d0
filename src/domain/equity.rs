//! Concatenation of per-segment results into one cumulative P&L curve.

use std::fmt;

use super::engine::SegmentPnl;

/// How per-tick P&L becomes the cumulative curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulationMode {
    /// Per-tick P&L is a signed return; the curve is its running sum.
    Additive,
    /// Per-tick P&L is scaled by the equity level before the tick; the curve
    /// is the chained equity level.
    Chained,
}

impl AccumulationMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "additive" | "sum" => Some(AccumulationMode::Additive),
            "chained" | "equity" => Some(AccumulationMode::Chained),
            _ => None,
        }
    }

    pub fn default_initial_equity(self) -> f64 {
        match self {
            AccumulationMode::Additive => 0.0,
            AccumulationMode::Chained => 1.0,
        }
    }
}

impl fmt::Display for AccumulationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccumulationMode::Additive => write!(f, "additive"),
            AccumulationMode::Chained => write!(f, "chained"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EquityAccumulator {
    mode: AccumulationMode,
    initial: f64,
    pnl: Vec<f64>,
    levels: Vec<f64>,
}

impl EquityAccumulator {
    pub fn new(mode: AccumulationMode, initial: f64) -> Self {
        Self {
            mode,
            initial,
            pnl: Vec::new(),
            levels: Vec::new(),
        }
    }

    pub fn mode(&self) -> AccumulationMode {
        self.mode
    }

    /// Appends one segment, preserving timeline order.
    pub fn append(&mut self, segment: &SegmentPnl) {
        self.pnl.extend_from_slice(&segment.pnl);
        if self.mode == AccumulationMode::Chained {
            self.levels.extend_from_slice(&segment.equity);
        }
    }

    /// Number of scored ticks accumulated so far.
    pub fn ticks(&self) -> usize {
        self.pnl.len()
    }

    /// Concatenated per-tick net P&L.
    pub fn pnl(&self) -> &[f64] {
        &self.pnl
    }

    /// Level the next segment starts from.
    pub fn last_level(&self) -> f64 {
        match self.mode {
            AccumulationMode::Additive => self.pnl.iter().fold(self.initial, |acc, p| acc + p),
            AccumulationMode::Chained => self.levels.last().copied().unwrap_or(self.initial),
        }
    }

    /// Cumulative curve, starting with the initial equity and holding one
    /// point per scored tick.
    pub fn curve(&self) -> Vec<f64> {
        let mut curve = Vec::with_capacity(self.pnl.len() + 1);
        curve.push(self.initial);
        match self.mode {
            AccumulationMode::Additive => {
                let mut acc = self.initial;
                for p in &self.pnl {
                    acc += p;
                    curve.push(acc);
                }
            }
            AccumulationMode::Chained => curve.extend_from_slice(&self.levels),
        }
        curve
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::Signal;
    use approx::assert_abs_diff_eq;

    fn segment(pnl: &[f64], equity: &[f64]) -> SegmentPnl {
        SegmentPnl {
            pnl: pnl.to_vec(),
            equity: equity.to_vec(),
            effective: vec![Signal::Long; pnl.len()],
            overrides: 0,
        }
    }

    #[test]
    fn parse_modes() {
        assert_eq!(AccumulationMode::parse("additive"), Some(AccumulationMode::Additive));
        assert_eq!(AccumulationMode::parse("Chained"), Some(AccumulationMode::Chained));
        assert_eq!(AccumulationMode::parse("product"), None);
    }

    #[test]
    fn additive_curve_is_running_sum() {
        let mut acc = EquityAccumulator::new(AccumulationMode::Additive, 0.0);
        acc.append(&segment(&[0.01, -0.02], &[0.01, -0.01]));
        acc.append(&segment(&[0.03], &[0.02]));
        let curve = acc.curve();
        assert_eq!(curve.len(), 4);
        assert_abs_diff_eq!(curve[1], 0.01, epsilon = 1e-12);
        assert_abs_diff_eq!(curve[2], -0.01, epsilon = 1e-12);
        assert_abs_diff_eq!(curve[3], 0.02, epsilon = 1e-12);
        assert_abs_diff_eq!(acc.last_level(), 0.02, epsilon = 1e-12);
        assert_eq!(acc.ticks(), 3);
    }

    #[test]
    fn chained_curve_uses_levels() {
        let mut acc = EquityAccumulator::new(AccumulationMode::Chained, 1.0);
        acc.append(&segment(&[0.1, -0.11], &[1.1, 0.99]));
        assert_eq!(acc.last_level(), 0.99);
        acc.append(&segment(&[0.0099], &[0.9999]));
        assert_eq!(acc.curve(), vec![1.0, 1.1, 0.99, 0.9999]);
        assert_eq!(acc.pnl().len(), 3);
    }

    #[test]
    fn empty_accumulator() {
        let acc = EquityAccumulator::new(AccumulationMode::Chained, 1.0);
        assert_eq!(acc.curve(), vec![1.0]);
        assert_eq!(acc.last_level(), 1.0);
    }
}
