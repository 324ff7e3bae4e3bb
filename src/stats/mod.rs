//! Per-stream count statistics and the registry that owns them

use serde::Serialize;
use std::fmt;

pub mod registry;
pub mod statistic;
pub mod window;

pub use registry::StatsRegistry;
pub use statistic::StreamStatistic;
pub use window::StreamWindow;

/// Consistent copy of one stream's public fields at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Snapshot {
    /// Most recent raw count
    pub current: u32,
    /// Last estimator output
    pub stabilized: u32,
    /// Number of updates applied to the stream
    pub frame_count: u64,
}

impl Snapshot {
    /// State reported for a stream that has not received a frame yet
    pub const ZERO: Snapshot = Snapshot {
        current: 0,
        stabilized: 0,
        frame_count: 0,
    };

    pub fn has_data(&self) -> bool {
        self.frame_count > 0
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "current={} stabilized={} frames={}",
            self.current, self.stabilized, self.frame_count
        )
    }
}
