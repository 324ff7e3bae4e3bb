//! Frame ingestion adapter
//!
//! The seam between the inference stage's per-frame callback and the
//! registry. Called synchronously on whatever thread the framework uses for
//! the stream; it never panics on bad input and never blocks on another
//! stream's observers.

use crate::observer::{FrameEvent, FrameObserver};
use crate::stats::{Snapshot, StatsRegistry};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Longest accepted stream name
pub const MAX_STREAM_NAME_LEN: usize = 64;

/// Reasons a frame event is refused before reaching the registry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    #[error("negative raw count {raw_count} for stream '{stream}'")]
    NegativeCount { stream: String, raw_count: i64 },

    #[error("raw count {raw_count} for stream '{stream}' exceeds the supported range")]
    CountOutOfRange { stream: String, raw_count: i64 },

    #[error("negative frame index {frame_index} for stream '{stream}'")]
    NegativeFrameIndex { stream: String, frame_index: i64 },

    #[error("invalid stream name {0:?}")]
    InvalidStreamName(String),
}

/// Stream names are 1 to 64 characters of ASCII letters, digits, `_`, `-`
/// or `.`, which keeps them usable as file name stems.
pub fn is_valid_stream_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_STREAM_NAME_LEN
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'))
        && name != "."
        && name != ".."
}

/// Check one raw frame event and convert it to registry types
pub fn validate(
    stream: &str,
    raw_count: i64,
    frame_index: i64,
) -> Result<(u32, u64), IngestError> {
    if !is_valid_stream_name(stream) {
        return Err(IngestError::InvalidStreamName(stream.to_string()));
    }

    if raw_count < 0 {
        return Err(IngestError::NegativeCount {
            stream: stream.to_string(),
            raw_count,
        });
    }
    let count = u32::try_from(raw_count).map_err(|_| IngestError::CountOutOfRange {
        stream: stream.to_string(),
        raw_count,
    })?;

    let index = u64::try_from(frame_index).map_err(|_| IngestError::NegativeFrameIndex {
        stream: stream.to_string(),
        frame_index,
    })?;

    Ok((count, index))
}

/// Per-frame entry point shared by every stream's callback
pub struct FrameIngestor {
    registry: Arc<StatsRegistry>,
    observers: Vec<Box<dyn FrameObserver>>,
    accepted: AtomicU64,
    rejected: AtomicU64,
}

impl FrameIngestor {
    pub fn new(registry: Arc<StatsRegistry>) -> Self {
        Self {
            registry,
            observers: Vec::new(),
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    /// Add an observer; called for every accepted frame in registration order
    pub fn add_observer(&mut self, observer: Box<dyn FrameObserver>) {
        self.observers.push(observer);
    }

    pub fn with_observers(mut self, observers: Vec<Box<dyn FrameObserver>>) -> Self {
        self.observers.extend(observers);
        self
    }

    /// Count one frame of `stream`.
    ///
    /// Rejected events are logged and returned as errors without touching
    /// the registry. Accepted events update the registry, then every observer
    /// sees the resulting snapshot after the registry lock is released.
    pub fn ingest(
        &self,
        stream: &str,
        raw_count: i64,
        frame_index: i64,
    ) -> Result<Snapshot, IngestError> {
        let (count, frame_index) = match validate(stream, raw_count, frame_index) {
            Ok(valid) => valid,
            Err(e) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "rejecting frame");
                return Err(e);
            }
        };

        let snapshot = self.registry.update(stream, count);
        self.accepted.fetch_add(1, Ordering::Relaxed);

        let event = FrameEvent {
            stream,
            frame_index,
            snapshot,
        };
        self.notify(&event);

        Ok(snapshot)
    }

    fn notify(&self, event: &FrameEvent<'_>) {
        for observer in &self.observers {
            if let Err(e) = observer.observe(event) {
                warn!(
                    observer = observer.name(),
                    stream = event.stream,
                    frame_index = event.frame_index,
                    error = %e,
                    "observer failed"
                );
            }
        }
    }

    pub fn registry(&self) -> &Arc<StatsRegistry> {
        &self.registry
    }

    /// Names of the registered observers, in call order
    pub fn observer_names(&self) -> Vec<&str> {
        self.observers.iter().map(|o| o.name()).collect()
    }

    pub fn accepted_frames(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn rejected_frames(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CountError, CountResult};
    use crate::estimator::ModeEstimator;
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;

    fn registry() -> Arc<StatsRegistry> {
        Arc::new(StatsRegistry::new(30, Arc::new(ModeEstimator::new())).unwrap())
    }

    struct Recording {
        seen: Arc<Mutex<Vec<(String, u64, Snapshot)>>>,
    }

    impl FrameObserver for Recording {
        fn observe(&self, event: &FrameEvent<'_>) -> CountResult<()> {
            self.seen
                .lock()
                .unwrap()
                .push((event.stream.to_string(), event.frame_index, event.snapshot));
            Ok(())
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    struct Failing;

    impl FrameObserver for Failing {
        fn observe(&self, _event: &FrameEvent<'_>) -> CountResult<()> {
            Err(CountError::ObserverFailed {
                observer: "failing".to_string(),
                message: "disk full".to_string(),
            })
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    /// Reads back from the registry while handling the event
    struct ReadsRegistry {
        registry: Arc<StatsRegistry>,
        seen: Arc<Mutex<Vec<(Snapshot, Snapshot)>>>,
    }

    impl FrameObserver for ReadsRegistry {
        fn observe(&self, event: &FrameEvent<'_>) -> CountResult<()> {
            let stored = self.registry.snapshot(event.stream);
            // a new stream needs the map's write lock
            self.registry.update("observer-side", 1);
            self.seen.lock().unwrap().push((event.snapshot, stored));
            Ok(())
        }

        fn name(&self) -> &str {
            "reads-registry"
        }
    }

    #[test]
    fn test_observers_may_read_registry() {
        let registry = registry();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let observer = ReadsRegistry {
            registry: Arc::clone(&registry),
            seen: Arc::clone(&seen),
        };
        let ingestor = FrameIngestor::new(Arc::clone(&registry))
            .with_observers(vec![Box::new(observer) as Box<dyn FrameObserver>]);

        let (done, finished) = std::sync::mpsc::channel();
        thread::spawn(move || {
            let result = ingestor.ingest("top", 3, 0).and_then(|_| ingestor.ingest("top", 5, 1));
            let _ = done.send(result);
        });

        let last = finished
            .recv_timeout(Duration::from_secs(5))
            .expect("ingest deadlocked while an observer read the registry")
            .unwrap();
        assert_eq!(last.frame_count, 2);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        for (event_snapshot, stored) in seen.iter() {
            assert_eq!(event_snapshot, stored);
        }
        assert_eq!(registry.snapshot("observer-side").frame_count, 2);
    }

    #[test]
    fn test_stream_name_rules() {
        assert!(is_valid_stream_name("top"));
        assert!(is_valid_stream_name("cam-2_side.v1"));
        assert!(!is_valid_stream_name(""));
        assert!(!is_valid_stream_name(".."));
        assert!(!is_valid_stream_name("top view"));
        assert!(!is_valid_stream_name("../etc"));
        assert!(!is_valid_stream_name(&"x".repeat(MAX_STREAM_NAME_LEN + 1)));
    }

    #[test]
    fn test_validate() {
        assert_eq!(validate("top", 3, 10), Ok((3, 10)));
        assert!(matches!(
            validate("top", -1, 0),
            Err(IngestError::NegativeCount { raw_count: -1, .. })
        ));
        assert!(matches!(
            validate("top", i64::from(u32::MAX) + 1, 0),
            Err(IngestError::CountOutOfRange { .. })
        ));
        assert!(matches!(
            validate("top", 1, -5),
            Err(IngestError::NegativeFrameIndex { frame_index: -5, .. })
        ));
        assert!(matches!(
            validate("", 1, 0),
            Err(IngestError::InvalidStreamName(_))
        ));
    }

    #[test]
    fn test_rejection_leaves_registry_untouched() {
        let ingestor = FrameIngestor::new(registry());

        assert!(ingestor.ingest("top", -3, 0).is_err());
        assert!(ingestor.ingest("bad name", 3, 0).is_err());

        assert!(ingestor.registry().is_empty());
        assert_eq!(ingestor.rejected_frames(), 2);
        assert_eq!(ingestor.accepted_frames(), 0);
    }

    #[test]
    fn test_observers_see_returned_snapshot() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut ingestor = FrameIngestor::new(registry());
        ingestor.add_observer(Box::new(Recording { seen: Arc::clone(&seen) }));

        let first = ingestor.ingest("top", 2, 100).unwrap();
        let second = ingestor.ingest("top", 2, 104).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], ("top".to_string(), 100, first));
        assert_eq!(seen[1], ("top".to_string(), 104, second));
        assert_eq!(second.frame_count, 2);
    }

    #[test]
    fn test_failing_observer_does_not_stop_others() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let ingestor = FrameIngestor::new(registry()).with_observers(vec![
            Box::new(Failing) as Box<dyn FrameObserver>,
            Box::new(Recording { seen: Arc::clone(&seen) }) as Box<dyn FrameObserver>,
        ]);

        let snapshot = ingestor.ingest("side", 4, 0).unwrap();

        assert_eq!(snapshot.stabilized, 4);
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(ingestor.observer_names(), vec!["failing", "recording"]);
    }
}
