//! Thread-safe owner of every stream statistic
//!
//! The stream map sits behind an `RwLock` that is only write-locked to insert
//! a stream seen for the first time. Each statistic has its own `Mutex`, so
//! updates on different streams never wait on each other's estimation.

use super::{Snapshot, StreamStatistic};
use crate::config::StabilizationConfig;
use crate::error::{CountError, CountResult};
use crate::estimator::{build_estimator, Estimator, EstimatorKind};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::debug;

type SharedStatistic = Arc<Mutex<StreamStatistic>>;

/// Registry of per-stream statistics, shared between producer callbacks and
/// render stages through an `Arc`.
pub struct StatsRegistry {
    streams: RwLock<HashMap<String, SharedStatistic>>,
    estimator: Arc<dyn Estimator>,
    capacity: NonZeroUsize,
}

impl StatsRegistry {
    /// Create an empty registry whose windows hold `capacity` counts
    pub fn new(capacity: usize, estimator: Arc<dyn Estimator>) -> CountResult<Self> {
        let capacity = NonZeroUsize::new(capacity).ok_or(CountError::ZeroCapacity)?;
        Ok(Self {
            streams: RwLock::new(HashMap::new()),
            estimator,
            capacity,
        })
    }

    /// Create a registry from the stabilization settings
    pub fn from_config(config: &StabilizationConfig) -> CountResult<Self> {
        let estimator = build_estimator(config)?;
        Self::new(config.capacity(), estimator)
    }

    /// Append `raw_count` to `stream`, recompute its stabilized value and
    /// return the resulting snapshot. Creates the stream on first use.
    pub fn update(&self, stream: &str, raw_count: u32) -> Snapshot {
        let statistic = self.statistic(stream);
        let mut guard = lock(&statistic);
        guard.update(raw_count, self.estimator.as_ref())
    }

    /// Latest values for `stream`, or the zero state if it has no data yet
    pub fn snapshot(&self, stream: &str) -> Snapshot {
        self.try_snapshot(stream).unwrap_or(Snapshot::ZERO)
    }

    /// Latest values for `stream`, `None` if it has never been updated
    pub fn try_snapshot(&self, stream: &str) -> Option<Snapshot> {
        let statistic = self.existing(stream)?;
        let guard = lock(&statistic);
        Some(guard.snapshot())
    }

    /// Snapshots of every known stream, ordered by name.
    ///
    /// Each snapshot is consistent on its own; streams are read one after
    /// another, not atomically as a group.
    pub fn snapshot_all(&self) -> Vec<(String, Snapshot)> {
        let entries: Vec<(String, SharedStatistic)> = {
            let streams = self.streams.read().unwrap_or_else(PoisonError::into_inner);
            streams
                .iter()
                .map(|(name, stat)| (name.clone(), Arc::clone(stat)))
                .collect()
        };

        let mut snapshots: Vec<(String, Snapshot)> = entries
            .into_iter()
            .map(|(name, stat)| {
                let snapshot = lock(&stat).snapshot();
                (name, snapshot)
            })
            .collect();
        snapshots.sort_by(|a, b| a.0.cmp(&b.0));
        snapshots
    }

    /// Copy of the window contents of `stream`, oldest first
    pub fn window_contents(&self, stream: &str) -> Vec<u32> {
        match self.existing(stream) {
            Some(statistic) => {
                let guard = lock(&statistic);
                guard.window().to_vec()
            }
            None => Vec::new(),
        }
    }

    /// Names of every stream that has received at least one update
    pub fn streams(&self) -> Vec<String> {
        let streams = self.streams.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = streams.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.streams.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Window capacity shared by all streams
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    pub fn estimator_kind(&self) -> EstimatorKind {
        self.estimator.kind()
    }

    fn existing(&self, stream: &str) -> Option<SharedStatistic> {
        let streams = self.streams.read().unwrap_or_else(PoisonError::into_inner);
        streams.get(stream).cloned()
    }

    fn statistic(&self, stream: &str) -> SharedStatistic {
        if let Some(statistic) = self.existing(stream) {
            return statistic;
        }

        let mut streams = self.streams.write().unwrap_or_else(PoisonError::into_inner);
        // another producer may have inserted it between the two locks
        let capacity = self.capacity;
        Arc::clone(streams.entry(stream.to_string()).or_insert_with(|| {
            debug!(stream, capacity = capacity.get(), "registering new stream");
            Arc::new(Mutex::new(StreamStatistic::new(capacity)))
        }))
    }
}

impl std::fmt::Debug for StatsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsRegistry")
            .field("streams", &self.streams())
            .field("estimator", &self.estimator)
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// Lock one stream, taking over the state if a producer panicked holding it
fn lock(statistic: &Mutex<StreamStatistic>) -> MutexGuard<'_, StreamStatistic> {
    statistic.lock().unwrap_or_else(PoisonError::into_inner)
}
