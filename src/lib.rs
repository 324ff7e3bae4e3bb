//! Pupcount Library
//!
//! Windowed stabilization of per-frame object counts coming from one or more
//! concurrent video streams. Noisy detector counts are smoothed over a
//! sliding window per stream and published to console, CSV, JSON and overlay
//! outputs.

pub mod config;
pub mod error;
pub mod estimator;
pub mod ingest;
pub mod observer;
pub mod overlay;
pub mod replay;
pub mod stats;

// Re-export commonly used types
pub use config::{AppConfig, LayoutConfig, OutputConfig, StabilizationConfig, StreamConfig};
pub use error::{CountError, CountResult};
pub use estimator::{build_estimator, Estimator, EstimatorKind, ModeEstimator, PercentileEstimator};
pub use ingest::{FrameIngestor, IngestError};
pub use observer::{
    ConsoleObserver, CsvObserver, FrameEvent, FrameObserver, JsonObserver, OverlayObserver,
};
pub use overlay::{CompositeLayout, OverlayBoard, OverlayText};
pub use stats::{Snapshot, StatsRegistry};

/// Current version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
