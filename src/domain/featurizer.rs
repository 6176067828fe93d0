//! Sliding-window feature construction over a return series.
//!
//! Row `i` of the matrix is `returns[i .. i + W]`. The row ends at its
//! decision tick `i + W - 1` and its prediction target is `returns[i + W]`,
//! the return realized over the following tick. Rows borrow the underlying
//! series, so building the matrix copies nothing.

use std::ops::Range;

use super::error::ArlError;

/// Builds [`FeatureMatrix`] views with a fixed window length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowFeaturizer {
    window: usize,
}

impl WindowFeaturizer {
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Fails with `InvalidWindow` when the window is zero or longer than the series.
    pub fn featurize<'a>(&self, returns: &'a [f64]) -> Result<FeatureMatrix<'a>, ArlError> {
        if self.window == 0 || self.window > returns.len() {
            return Err(ArlError::InvalidWindow {
                window: self.window,
                len: returns.len(),
            });
        }
        Ok(FeatureMatrix {
            returns,
            window: self.window,
        })
    }
}

/// Read-only `(L - W + 1) x W` matrix of overlapping return windows.
#[derive(Debug, Clone, Copy)]
pub struct FeatureMatrix<'a> {
    returns: &'a [f64],
    window: usize,
}

impl<'a> FeatureMatrix<'a> {
    pub fn rows(&self) -> usize {
        self.returns.len() - self.window + 1
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn row(&self, i: usize) -> &'a [f64] {
        &self.returns[i..i + self.window]
    }

    /// Rows that have a prediction target; the last row never does.
    pub fn labelled_rows(&self) -> usize {
        self.rows() - 1
    }

    pub fn target(&self, i: usize) -> Option<f64> {
        self.returns.get(i + self.window).copied()
    }

    /// Targets for a range of labelled rows.
    pub fn targets(&self, rows: Range<usize>) -> &'a [f64] {
        &self.returns[rows.start + self.window..rows.end + self.window]
    }

    /// Tick at which the row's prediction is acted upon.
    pub fn decision_tick(&self, i: usize) -> usize {
        i + self.window - 1
    }

    pub fn batch(&self, rows: Range<usize>) -> FeatureBatch<'a> {
        debug_assert!(rows.end <= self.rows());
        FeatureBatch {
            matrix: *self,
            rows,
        }
    }
}

/// Contiguous block of rows handed to a predictor.
#[derive(Debug, Clone)]
pub struct FeatureBatch<'a> {
    matrix: FeatureMatrix<'a>,
    rows: Range<usize>,
}

impl<'a> FeatureBatch<'a> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.matrix.window
    }

    /// Row `k` of the batch, i.e. matrix row `rows.start + k`.
    pub fn row(&self, k: usize) -> &'a [f64] {
        self.matrix.row(self.rows.start + k)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a [f64]> + '_ {
        self.rows.clone().map(|i| self.matrix.row(i))
    }

    pub fn row_range(&self) -> Range<usize> {
        self.rows.clone()
    }
}
