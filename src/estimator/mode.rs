//! Frequency-mode stabilizer

use super::{Estimator, EstimatorKind, Samples, Workspace};

/// Returns the most frequent count in the window.
///
/// Ties go to the value that first reaches the winning frequency while
/// scanning oldest to newest, so the result never depends on hash order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModeEstimator;

impl ModeEstimator {
    pub fn new() -> Self {
        Self
    }
}

impl Estimator for ModeEstimator {
    fn estimate(&self, samples: Samples<'_>, workspace: &mut Workspace) -> u32 {
        let tally = &mut workspace.tally;
        tally.clear();

        let mut best_value = 0;
        let mut best_count = 0;
        for value in samples.iter() {
            let count = tally.entry(value).or_insert(0);
            *count += 1;
            // strictly greater: a later value only wins by overtaking
            if *count > best_count {
                best_count = *count;
                best_value = value;
            }
        }

        best_value
    }

    fn kind(&self) -> EstimatorKind {
        EstimatorKind::Mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_most_frequent_value() {
        let mode = ModeEstimator::new();
        assert_eq!(mode.compute(&[2, 2, 3, 3, 3, 1]), 3);
        assert_eq!(mode.compute(&[7]), 7);
        assert_eq!(mode.compute(&[0, 0, 4]), 0);
    }

    #[test]
    fn test_tie_goes_to_first_to_reach_max() {
        let mode = ModeEstimator::new();
        assert_eq!(mode.compute(&[2, 2, 3, 3]), 2);
        assert_eq!(mode.compute(&[3, 3, 2, 2]), 3);
        // 3 is seen first, but 2 reaches frequency 2 first
        assert_eq!(mode.compute(&[3, 2, 2, 3]), 2);
    }

    #[test]
    fn test_split_samples() {
        let mode = ModeEstimator::new();
        let mut workspace = Workspace::default();

        // insertion order is front then back
        let samples = Samples::new(&[5, 6], &[6, 5]);
        assert_eq!(mode.estimate(samples, &mut workspace), 6);

        // workspace reuse must not leak counts between calls
        let samples = Samples::new(&[1], &[]);
        assert_eq!(mode.estimate(samples, &mut workspace), 1);
    }
}
