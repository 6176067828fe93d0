//! Walk-forward segment generation.
//!
//! Segments start at `i = m, m + o, m + 2o, ...` while `i < n`; each trains
//! on rows `[i - m, i)` and scores rows `[i, i + o)`, the last test range
//! clamped to `n`.

use std::ops::Range;

use super::error::ArlError;

/// One retrain/score step of the walk-forward protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkForwardSegment {
    /// Segment number (0-indexed).
    pub index: usize,
    pub train: Range<usize>,
    pub test: Range<usize>,
}

impl WalkForwardSegment {
    pub fn test_len(&self) -> usize {
        self.test.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkForwardScheduler {
    total: usize,
    train_len: usize,
    step: usize,
}

impl WalkForwardScheduler {
    /// Fails with `InvalidSchedule` when `m == 0`, `o == 0` or `m >= n`.
    pub fn new(total: usize, train_len: usize, step: usize) -> Result<Self, ArlError> {
        if train_len == 0 {
            return Err(ArlError::invalid_schedule("training length must be positive"));
        }
        if step == 0 {
            return Err(ArlError::invalid_schedule("step length must be positive"));
        }
        if train_len >= total {
            return Err(ArlError::invalid_schedule(format!(
                "training length {train_len} leaves no test data in {total} rows"
            )));
        }
        Ok(Self {
            total,
            train_len,
            step,
        })
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn train_len(&self) -> usize {
        self.train_len
    }

    pub fn step(&self) -> usize {
        self.step
    }

    /// Segment `k`, if it starts before `n`. Pure in `(k, m, o, n)`.
    pub fn segment(&self, k: usize) -> Option<WalkForwardSegment> {
        let start = k.checked_mul(self.step)?.checked_add(self.train_len)?;
        if start >= self.total {
            return None;
        }
        Some(WalkForwardSegment {
            index: k,
            train: start - self.train_len..start,
            test: start..(start + self.step).min(self.total),
        })
    }

    pub fn segment_count(&self) -> usize {
        (self.total - self.train_len).div_ceil(self.step)
    }

    /// Number of rows scored across all segments.
    pub fn scored_rows(&self) -> usize {
        self.total - self.train_len
    }

    pub fn segments(&self) -> Segments {
        Segments {
            scheduler: *self,
            next: 0,
        }
    }
}

impl IntoIterator for &WalkForwardScheduler {
    type Item = WalkForwardSegment;
    type IntoIter = Segments;

    fn into_iter(self) -> Segments {
        self.segments()
    }
}

/// Lazy, single-pass iterator over the segments of a schedule.
#[derive(Debug, Clone)]
pub struct Segments {
    scheduler: WalkForwardScheduler,
    next: usize,
}

impl Iterator for Segments {
    type Item = WalkForwardSegment;

    fn next(&mut self) -> Option<WalkForwardSegment> {
        let segment = self.scheduler.segment(self.next)?;
        self.next += 1;
        Some(segment)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.scheduler.segment_count().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Segments {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_tile_the_timeline() {
        let s = WalkForwardScheduler::new(10, 4, 3).unwrap();
        let segs: Vec<_> = s.segments().collect();
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].train, 0..4);
        assert_eq!(segs[0].test, 4..7);
        assert_eq!(segs[1].train, 3..7);
        assert_eq!(segs[1].test, 7..10);
        assert_eq!(s.segment_count(), 2);
        assert_eq!(s.scored_rows(), 6);
    }

    #[test]
    fn last_test_range_is_clamped() {
        let s = WalkForwardScheduler::new(11, 4, 3).unwrap();
        let segs: Vec<_> = s.segments().collect();
        assert_eq!(segs.len(), 3);
        assert_eq!(segs[2].train, 6..10);
        assert_eq!(segs[2].test, 10..11);
        assert_eq!(segs[2].test_len(), 1);
        let scored: usize = segs.iter().map(|s| s.test_len()).sum();
        assert_eq!(scored, s.scored_rows());
    }

    #[test]
    fn train_ranges_have_fixed_length() {
        let s = WalkForwardScheduler::new(2000, 500, 120).unwrap();
        for seg in &s {
            assert_eq!(seg.train.len(), 500);
            assert_eq!(seg.train.end, seg.test.start);
        }
    }

    #[test]
    fn iterator_reports_exact_size() {
        let s = WalkForwardScheduler::new(10, 4, 3).unwrap();
        let mut it = s.segments();
        assert_eq!(it.len(), 2);
        it.next();
        assert_eq!(it.len(), 1);
    }

    #[test]
    fn schedule_is_restartable() {
        let s = WalkForwardScheduler::new(25, 5, 4).unwrap();
        let first: Vec<_> = s.segments().collect();
        let second: Vec<_> = s.segments().collect();
        assert_eq!(first, second);
        assert_eq!(s.segment(2), Some(first[2].clone()));
    }

    #[test]
    fn invalid_schedules() {
        assert!(matches!(
            WalkForwardScheduler::new(10, 0, 3),
            Err(ArlError::InvalidSchedule { .. })
        ));
        assert!(matches!(
            WalkForwardScheduler::new(10, 4, 0),
            Err(ArlError::InvalidSchedule { .. })
        ));
        assert!(matches!(
            WalkForwardScheduler::new(10, 10, 1),
            Err(ArlError::InvalidSchedule { .. })
        ));
        assert!(matches!(
            WalkForwardScheduler::new(10, 11, 1),
            Err(ArlError::InvalidSchedule { .. })
        ));
    }
}
