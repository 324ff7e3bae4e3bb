//! Per-frame observers fed by the ingestion adapter
//!
//! Observers receive each fresh snapshot after the registry lock has been
//! released. They are fire-and-forget: a failing observer is logged by the
//! ingestor and never stops the frame from being counted.

use crate::config::AppConfig;
use crate::count_context;
use crate::error::CountResult;
use crate::overlay::OverlayBoard;
use crate::stats::Snapshot;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

pub mod console;
pub mod csv;
pub mod json;
pub mod overlay;

pub use self::console::ConsoleObserver;
pub use self::csv::CsvObserver;
pub use self::json::JsonObserver;
pub use self::overlay::OverlayObserver;

/// One accepted frame, as handed to observers
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameEvent<'a> {
    pub stream: &'a str,
    pub frame_index: u64,
    #[serde(flatten)]
    pub snapshot: Snapshot,
}

/// Observer trait for the different per-frame outputs
pub trait FrameObserver: Send + Sync {
    /// Handle one frame event
    fn observe(&self, event: &FrameEvent<'_>) -> CountResult<()>;

    /// Get observer name
    fn name(&self) -> &str;
}

/// Build the observers enabled in `config.output`.
///
/// Returns the overlay board alongside so a render stage can read it.
pub fn from_config(
    config: &AppConfig,
) -> CountResult<(Vec<Box<dyn FrameObserver>>, Option<Arc<OverlayBoard>>)> {
    let output = &config.output;
    let mut observers: Vec<Box<dyn FrameObserver>> = Vec::new();

    if output.console {
        observers.push(Box::new(ConsoleObserver::new(Duration::from_millis(
            output.console_interval_ms,
        ))));
    }

    if let Some(dir) = &output.csv_dir {
        let csv = count_context!(CsvObserver::new(dir), "enabling csv output")?;
        observers.push(Box::new(csv));
    }

    if let Some(path) = &output.json_path {
        let json = count_context!(JsonObserver::new(path), "enabling json output")?;
        observers.push(Box::new(json));
    }

    let board = if output.overlay {
        let board = Arc::new(OverlayBoard::with_titles(&config.streams));
        observers.push(Box::new(OverlayObserver::new(Arc::clone(&board))));
        Some(board)
    } else {
        None
    };

    Ok((observers, board))
}
