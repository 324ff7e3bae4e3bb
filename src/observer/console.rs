//! Terminal log line per frame

use super::{FrameEvent, FrameObserver};
use crate::error::CountResult;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::info;

/// Logs one line per frame through `tracing`, at most once per `interval`
/// for each stream.
pub struct ConsoleObserver {
    interval: Duration,
    last_report: Mutex<HashMap<String, Instant>>,
}

impl ConsoleObserver {
    /// Create new console observer with specified interval
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_report: Mutex::new(HashMap::new()),
        }
    }

    /// Observer that logs every frame
    pub fn every_frame() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Whether a line for `stream` is due at `now`; records it if so
    fn due(&self, stream: &str, now: Instant) -> bool {
        if self.interval.is_zero() {
            return true;
        }

        let mut last_report = self.last_report.lock().unwrap_or_else(PoisonError::into_inner);
        match last_report.get_mut(stream) {
            Some(last) if now.duration_since(*last) < self.interval => false,
            Some(last) => {
                *last = now;
                true
            }
            None => {
                last_report.insert(stream.to_string(), now);
                true
            }
        }
    }
}

/// Terminal line for one frame
pub fn format_line(event: &FrameEvent<'_>) -> String {
    format!(
        "Frame Number={} | Stream={} | Current={} | Stabilized={}",
        event.frame_index, event.stream, event.snapshot.current, event.snapshot.stabilized
    )
}

impl FrameObserver for ConsoleObserver {
    fn observe(&self, event: &FrameEvent<'_>) -> CountResult<()> {
        if self.due(event.stream, Instant::now()) {
            info!(target: "pupcount::frames", "{}", format_line(event));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}
