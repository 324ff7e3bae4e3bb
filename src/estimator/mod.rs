//! Stabilization estimators
//!
//! An estimator maps the raw counts held in one stream window to a single
//! stabilized count. Both strategies are total: an empty window yields 0.

use crate::config::StabilizationConfig;
use crate::error::{CountError, CountResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub mod mode;
pub mod percentile;

pub use mode::ModeEstimator;
pub use percentile::PercentileEstimator;

/// Available stabilization strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimatorKind {
    /// Most frequent value in the window
    Mode,
    /// Value at a fixed fraction of the sorted window
    Percentile,
}

impl fmt::Display for EstimatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EstimatorKind::Mode => write!(f, "mode"),
            EstimatorKind::Percentile => write!(f, "percentile"),
        }
    }
}

impl FromStr for EstimatorKind {
    type Err = CountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mode" => Ok(EstimatorKind::Mode),
            "percentile" => Ok(EstimatorKind::Percentile),
            other => Err(CountError::InvalidConfigValue {
                field: "estimator".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Read-only view over a window's contents in insertion order.
///
/// A ring buffer stores its contents as two contiguous runs, so the view
/// holds both and never copies.
#[derive(Debug, Clone, Copy)]
pub struct Samples<'a> {
    front: &'a [u32],
    back: &'a [u32],
}

impl<'a> Samples<'a> {
    pub fn new(front: &'a [u32], back: &'a [u32]) -> Self {
        Self { front, back }
    }

    pub fn len(&self) -> usize {
        self.front.len() + self.back.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = u32> + 'a {
        self.front.iter().chain(self.back.iter()).copied()
    }
}

impl<'a> From<&'a [u32]> for Samples<'a> {
    fn from(samples: &'a [u32]) -> Self {
        Self::new(samples, &[])
    }
}

/// Reusable scratch storage for estimation.
///
/// Each stream keeps one workspace so repeated estimation over a full
/// window does not allocate once the buffers have grown to window size.
#[derive(Debug, Default)]
pub struct Workspace {
    pub(crate) sorted: Vec<u32>,
    pub(crate) tally: HashMap<u32, usize>,
}

impl Workspace {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sorted: Vec::with_capacity(capacity),
            tally: HashMap::with_capacity(capacity.min(1024)),
        }
    }
}

/// Stabilization strategy over a window of raw counts
pub trait Estimator: Send + Sync {
    /// Compute the stabilized count for `samples` using `workspace` as scratch
    /// space. Must not depend on anything but the sample sequence.
    fn estimate(&self, samples: Samples<'_>, workspace: &mut Workspace) -> u32;

    /// Strategy implemented by this estimator
    fn kind(&self) -> EstimatorKind;

    /// Convenience form of [`Estimator::estimate`] over a plain slice
    fn compute(&self, window: &[u32]) -> u32 {
        let mut workspace = Workspace::with_capacity(window.len());
        self.estimate(Samples::from(window), &mut workspace)
    }
}

impl fmt::Debug for dyn Estimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Estimator({})", self.kind())
    }
}

/// Build the estimator selected by `config`
pub fn build_estimator(config: &StabilizationConfig) -> CountResult<Arc<dyn Estimator>> {
    match config.estimator {
        EstimatorKind::Mode => Ok(Arc::new(ModeEstimator::new())),
        EstimatorKind::Percentile => Ok(Arc::new(PercentileEstimator::new(config.percentile)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("mode".parse::<EstimatorKind>().unwrap(), EstimatorKind::Mode);
        assert_eq!(
            " Percentile ".parse::<EstimatorKind>().unwrap(),
            EstimatorKind::Percentile
        );
        assert!("median".parse::<EstimatorKind>().is_err());
        assert_eq!(EstimatorKind::Percentile.to_string(), "percentile");
    }

    #[test]
    fn test_samples_order() {
        let front = [4, 5];
        let back = [1, 2, 3];
        let samples = Samples::new(&front, &back);

        assert_eq!(samples.len(), 5);
        assert!(!samples.is_empty());
        assert_eq!(samples.iter().collect::<Vec<_>>(), vec![4, 5, 1, 2, 3]);
    }

    #[test]
    fn test_build_from_config() {
        let mut config = StabilizationConfig::default();
        let estimator = build_estimator(&config).unwrap();
        assert_eq!(estimator.kind(), EstimatorKind::Percentile);

        config.estimator = EstimatorKind::Mode;
        let estimator = build_estimator(&config).unwrap();
        assert_eq!(estimator.kind(), EstimatorKind::Mode);

        config.estimator = EstimatorKind::Percentile;
        config.percentile = 0.0;
        assert!(build_estimator(&config).is_err());
    }

    #[test]
    fn test_empty_window_is_zero() {
        let mode = ModeEstimator::new();
        let percentile = PercentileEstimator::new(0.95).unwrap();

        assert_eq!(mode.compute(&[]), 0);
        assert_eq!(percentile.compute(&[]), 0);
    }

    #[test]
    fn test_compute_leaves_input_untouched() {
        let window = vec![9, 1, 5, 1, 7];
        let percentile = PercentileEstimator::new(0.5).unwrap();
        let mode = ModeEstimator::new();

        assert_eq!(percentile.compute(&window), 5);
        assert_eq!(mode.compute(&window), 1);
        assert_eq!(window, vec![9, 1, 5, 1, 7]);
    }
}
