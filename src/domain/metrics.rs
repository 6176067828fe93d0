//! Curve and exposure statistics.

use std::ops::Range;

use super::backtest::BacktestResult;
use super::signal::Signal;

/// Largest peak-to-trough decline of a curve, in curve units.
#[derive(Debug, Clone, PartialEq)]
pub struct Drawdown {
    pub peak_index: usize,
    pub peak: f64,
    pub trough_index: usize,
    pub trough: f64,
}

impl Drawdown {
    pub fn depth(&self) -> f64 {
        self.peak - self.trough
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurveStats {
    pub points: usize,
    pub first: f64,
    pub last: f64,
    /// `last - first`.
    pub total_change: f64,
    pub mean: f64,
    /// Population variance.
    pub variance: f64,
    pub max_drawdown: Drawdown,
}

impl CurveStats {
    /// `None` for an empty curve.
    pub fn compute(curve: &[f64]) -> Option<Self> {
        let (&first, &last) = (curve.first()?, curve.last()?);
        let n = curve.len() as f64;
        let mean = curve.iter().sum::<f64>() / n;
        let variance = curve.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        Some(CurveStats {
            points: curve.len(),
            first,
            last,
            total_change: last - first,
            mean,
            variance,
            max_drawdown: compute_drawdown(curve),
        })
    }
}

/// Trough is the first point with the deepest fall below the running
/// maximum; peak is the first maximum before it.
fn compute_drawdown(curve: &[f64]) -> Drawdown {
    let mut running_max = f64::NEG_INFINITY;
    let mut trough_index = 0;
    let mut deepest = f64::NEG_INFINITY;
    for (i, &v) in curve.iter().enumerate() {
        if v > running_max {
            running_max = v;
        }
        if running_max - v > deepest {
            deepest = running_max - v;
            trough_index = i;
        }
    }

    let mut peak_index = 0;
    for i in 1..trough_index {
        if curve[i] > curve[peak_index] {
            peak_index = i;
        }
    }
    if trough_index == 0 {
        peak_index = 0;
    }

    Drawdown {
        peak_index,
        peak: curve[peak_index],
        trough_index,
        trough: curve[trough_index],
    }
}

/// Splits `len` items into `parts` contiguous ranges whose lengths differ by
/// at most one, longer ranges first.
pub fn split_ranges(len: usize, parts: usize) -> Vec<Range<usize>> {
    if parts == 0 {
        return Vec::new();
    }
    let base = len / parts;
    let extra = len % parts;
    let mut ranges = Vec::with_capacity(parts);
    let mut start = 0;
    for k in 0..parts {
        let size = base + usize::from(k < extra);
        ranges.push(start..start + size);
        start += size;
    }
    ranges
}

/// Stats for one period of a curve split into `parts` pieces.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodStats {
    pub period: usize,
    pub range: Range<usize>,
    pub stats: CurveStats,
}

/// Per-period statistics; empty periods are skipped.
pub fn period_stats(curve: &[f64], parts: usize) -> Vec<PeriodStats> {
    split_ranges(curve.len(), parts)
        .into_iter()
        .enumerate()
        .filter_map(|(period, range)| {
            let stats = CurveStats::compute(&curve[range.clone()])?;
            Some(PeriodStats {
                period,
                range,
                stats,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExposureStats {
    pub ticks: usize,
    pub long_ticks: usize,
    pub short_ticks: usize,
    pub flat_ticks: usize,
    /// Ticks whose effective signal differs from the one before (a run
    /// starts flat).
    pub position_changes: usize,
    /// Ticks where risk control replaced the raw signal.
    pub overrides: usize,
}

impl ExposureStats {
    pub fn compute(raw: &[Signal], effective: &[Signal]) -> Self {
        let mut stats = ExposureStats {
            ticks: effective.len(),
            ..Default::default()
        };
        let mut previous = Signal::Flat;
        for &signal in effective {
            match signal {
                Signal::Long => stats.long_ticks += 1,
                Signal::Short => stats.short_ticks += 1,
                Signal::Flat => stats.flat_ticks += 1,
            }
            if signal != previous {
                stats.position_changes += 1;
            }
            previous = signal;
        }
        stats.overrides = raw
            .iter()
            .zip(effective)
            .filter(|(r, e)| r != e)
            .count();
        stats
    }

    pub fn from_result(result: &BacktestResult) -> Self {
        Self::compute(&result.raw_signals, &result.signals)
    }

    pub fn time_in_market(&self) -> f64 {
        if self.ticks == 0 {
            0.0
        } else {
            (self.long_ticks + self.short_ticks) as f64 / self.ticks as f64
        }
    }
}
