//! JSON lines log of every frame

use super::{FrameEvent, FrameObserver};
use crate::error::{CountError, CountResult};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use tracing::warn;

/// Lines buffered for the writer thread before new ones are dropped
pub const JSON_QUEUE_DEPTH: usize = 4096;

/// Appends one JSON object per frame to a single file shared by all streams.
///
/// Producers only serialize and enqueue; a dedicated thread owns the file.
/// When the queue is full the line is dropped and counted, so a stalled
/// file never holds up a stream's ingestion.
pub struct JsonObserver {
    file_path: PathBuf,
    sender: Option<Sender<String>>,
    worker: Option<JoinHandle<()>>,
    dropped: AtomicU64,
}

impl JsonObserver {
    /// Open `file_path` for appending, creating it if needed
    pub fn new(file_path: impl AsRef<Path>) -> CountResult<Self> {
        let file_path = file_path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)
            .map_err(|e| CountError::OutputFileError(file_path.clone(), e))?;

        Self::with_writer(file_path, file, JSON_QUEUE_DEPTH)
    }

    /// Log into `sink` through a queue of `queue_depth` lines. `file_path` is
    /// only used for reporting.
    pub fn with_writer<W>(
        file_path: impl Into<PathBuf>,
        sink: W,
        queue_depth: usize,
    ) -> CountResult<Self>
    where
        W: Write + Send + 'static,
    {
        let file_path = file_path.into();
        let (sender, receiver) = crossbeam_channel::bounded(queue_depth.max(1));

        let worker = thread::Builder::new()
            .name("json-writer".to_string())
            .spawn(move || write_lines(receiver, sink))
            .map_err(|e| CountError::ObserverFailed {
                observer: "json".to_string(),
                message: format!("could not start writer thread: {}", e),
            })?;

        Ok(Self {
            file_path,
            sender: Some(sender),
            worker: Some(worker),
            dropped: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Lines discarded because the writer thread fell behind
    pub fn dropped_lines(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

fn write_lines<W: Write>(receiver: Receiver<String>, sink: W) {
    let mut writer = BufWriter::new(sink);

    for line in receiver.iter() {
        let mut result = writeln!(writer, "{}", line);
        // flush once the backlog is drained
        if result.is_ok() && receiver.is_empty() {
            result = writer.flush();
        }
        if let Err(e) = result {
            warn!(error = %e, "json write failed");
        }
    }

    if let Err(e) = writer.flush() {
        warn!(error = %e, "json flush failed");
    }
}

impl FrameObserver for JsonObserver {
    fn observe(&self, event: &FrameEvent<'_>) -> CountResult<()> {
        let line = serde_json::to_string(event).map_err(|e| CountError::ObserverFailed {
            observer: "json".to_string(),
            message: e.to_string(),
        })?;

        let sender = match &self.sender {
            Some(sender) => sender,
            None => return Ok(()),
        };

        match sender.try_send(line) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                if self.dropped.fetch_add(1, Ordering::Relaxed) == 0 {
                    warn!(
                        path = %self.file_path.display(),
                        "json writer is behind, dropping lines"
                    );
                }
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => Err(CountError::ObserverFailed {
                observer: "json".to_string(),
                message: "writer thread stopped".to_string(),
            }),
        }
    }

    fn name(&self) -> &str {
        "json"
    }
}

impl Drop for JsonObserver {
    /// Close the queue and wait for queued lines to reach the file
    fn drop(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
