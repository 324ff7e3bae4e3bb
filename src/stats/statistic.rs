//! State held for one logical stream

use super::{Snapshot, StreamWindow};
use crate::estimator::{Estimator, Workspace};
use std::num::NonZeroUsize;

/// Window, latest raw count and last stabilized value of one stream.
///
/// Only [`crate::stats::StatsRegistry`] mutates a statistic; everything else
/// sees copies through [`Snapshot`].
#[derive(Debug)]
pub struct StreamStatistic {
    window: StreamWindow,
    current: u32,
    stabilized: u32,
    frame_count: u64,
    workspace: Workspace,
}

impl StreamStatistic {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            window: StreamWindow::new(capacity),
            current: 0,
            stabilized: 0,
            frame_count: 0,
            workspace: Workspace::with_capacity(capacity.get()),
        }
    }

    /// Push `raw` into the window and make it the current count
    pub fn append(&mut self, raw: u32) {
        self.window.push(raw);
        self.current = raw;
    }

    /// Re-run `estimator` over the current window contents
    pub fn recompute(&mut self, estimator: &dyn Estimator) {
        self.stabilized = estimator.estimate(self.window.samples(), &mut self.workspace);
    }

    /// One full update: append, count the frame, recompute.
    pub fn update(&mut self, raw: u32, estimator: &dyn Estimator) -> Snapshot {
        self.append(raw);
        self.frame_count += 1;
        self.recompute(estimator);
        self.snapshot()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            current: self.current,
            stabilized: self.stabilized,
            frame_count: self.frame_count,
        }
    }

    pub fn window(&self) -> &StreamWindow {
        &self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::{ModeEstimator, PercentileEstimator};

    fn statistic(capacity: usize) -> StreamStatistic {
        StreamStatistic::new(NonZeroUsize::new(capacity).unwrap())
    }

    #[test]
    fn test_new_statistic_is_zero_state() {
        let stat = statistic(10);
        assert_eq!(stat.snapshot(), Snapshot::ZERO);
        assert!(stat.window().is_empty());
    }

    #[test]
    fn test_update_tracks_all_fields() {
        let mut stat = statistic(6);
        let mode = ModeEstimator::new();

        for raw in [2, 2, 3, 3, 3] {
            stat.update(raw, &mode);
        }
        let snapshot = stat.update(1, &mode);

        assert_eq!(snapshot.current, 1);
        assert_eq!(snapshot.stabilized, 3);
        assert_eq!(snapshot.frame_count, 6);
        assert_eq!(stat.snapshot(), snapshot);
    }

    #[test]
    fn test_frame_count_keeps_growing_past_capacity() {
        let mut stat = statistic(4);
        let percentile = PercentileEstimator::default();

        for _ in 0..10 {
            stat.update(5, &percentile);
        }

        assert_eq!(stat.snapshot().frame_count, 10);
        assert_eq!(stat.window().len(), 4);
    }

    #[test]
    fn test_append_then_recompute() {
        let mut stat = statistic(4);
        let mode = ModeEstimator::new();

        stat.append(9);
        assert_eq!(stat.snapshot().current, 9);
        assert_eq!(stat.snapshot().stabilized, 0);

        stat.recompute(&mode);
        assert_eq!(stat.snapshot().stabilized, 9);
    }
}
