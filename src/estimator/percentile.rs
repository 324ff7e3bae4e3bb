//! Percentile stabilizer

use super::{Estimator, EstimatorKind, Samples, Workspace};
use crate::error::{CountError, CountResult};

/// Returns the value at `floor(len * fraction)` of the ascending window,
/// clamped to the last element.
///
/// Detector undercounts (occlusion) are far more common than overcounts, so
/// a high fraction tracks the true visible count while still discarding
/// rare spikes above it.
#[derive(Debug, Clone, Copy)]
pub struct PercentileEstimator {
    fraction: f64,
}

impl PercentileEstimator {
    /// Default target fraction
    pub const DEFAULT_FRACTION: f64 = 0.95;

    pub fn new(fraction: f64) -> CountResult<Self> {
        if !fraction.is_finite() || fraction <= 0.0 || fraction > 1.0 {
            return Err(CountError::InvalidPercentile(fraction));
        }
        Ok(Self { fraction })
    }

    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    /// Index selected for a window of `len` samples, `len > 0`
    pub fn index_for(&self, len: usize) -> usize {
        let index = (len as f64 * self.fraction).floor() as usize;
        index.min(len - 1)
    }
}

impl Default for PercentileEstimator {
    fn default() -> Self {
        Self {
            fraction: Self::DEFAULT_FRACTION,
        }
    }
}

impl Estimator for PercentileEstimator {
    fn estimate(&self, samples: Samples<'_>, workspace: &mut Workspace) -> u32 {
        if samples.is_empty() {
            return 0;
        }

        let sorted = &mut workspace.sorted;
        sorted.clear();
        sorted.extend(samples.iter());

        // selecting the k-th element yields the same value as a full sort
        let index = self.index_for(sorted.len());
        let (_, value, _) = sorted.select_nth_unstable(index);
        *value
    }

    fn kind(&self) -> EstimatorKind {
        EstimatorKind::Percentile
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_out_of_range_fraction() {
        assert!(PercentileEstimator::new(0.0).is_err());
        assert!(PercentileEstimator::new(-0.5).is_err());
        assert!(PercentileEstimator::new(1.01).is_err());
        assert!(PercentileEstimator::new(f64::NAN).is_err());
        assert!(PercentileEstimator::new(f64::INFINITY).is_err());
        assert!(PercentileEstimator::new(1.0).is_ok());
        assert_eq!(PercentileEstimator::default().fraction(), 0.95);
    }

    #[test]
    fn test_high_percentile_reaches_top_values() {
        let estimator = PercentileEstimator::new(0.95).unwrap();
        let mut window = vec![5; 18];
        window.extend([7, 7]);

        assert_eq!(estimator.index_for(20), 19);
        assert_eq!(estimator.compute(&window), 7);
    }

    #[test]
    fn test_index_clamped_to_last() {
        for fraction in [0.01, 0.5, 0.95, 1.0] {
            let estimator = PercentileEstimator::new(fraction).unwrap();
            assert_eq!(estimator.index_for(1), 0);
            assert_eq!(estimator.compute(&[4]), 4);
        }

        let estimator = PercentileEstimator::new(1.0).unwrap();
        assert_eq!(estimator.index_for(10), 9);
        assert_eq!(estimator.compute(&[1, 9, 3]), 9);
    }

    #[test]
    fn test_unsorted_input() {
        let estimator = PercentileEstimator::new(0.5).unwrap();
        // sorted: [1, 2, 3, 4, 8], floor(5 * 0.5) = 2
        assert_eq!(estimator.compute(&[8, 3, 1, 4, 2]), 3);
    }

    #[test]
    fn test_split_samples() {
        let estimator = PercentileEstimator::new(0.95).unwrap();
        let mut workspace = Workspace::default();
        let samples = Samples::new(&[3, 3, 3], &[9, 3]);

        // sorted: [3, 3, 3, 3, 9], floor(5 * 0.95) = 4
        assert_eq!(estimator.estimate(samples, &mut workspace), 9);
    }

    #[test]
    fn test_spike_rejected_in_large_window() {
        let estimator = PercentileEstimator::new(0.95).unwrap();
        let mut window = vec![3; 290];
        window.extend([5; 10]);

        assert_eq!(estimator.index_for(300), 285);
        assert_eq!(estimator.compute(&window), 3);
    }
}
