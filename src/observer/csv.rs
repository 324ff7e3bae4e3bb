//! Append-only CSV log, one file per stream

use super::{FrameEvent, FrameObserver};
use crate::error::{CountError, CountResult};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::info;

/// Header written once at the top of every file
pub const CSV_HEADER: &str = "Frame,Current_Count,Stabilized_Count";

type SharedWriter = Arc<Mutex<BufWriter<File>>>;

/// Writes `frame_index,current,stabilized` rows to `<dir>/<stream>_counts.csv`.
///
/// Files are truncated when first opened in a run. Each stream has its own
/// writer lock, so a slow write for one stream does not hold up another.
pub struct CsvObserver {
    dir: PathBuf,
    writers: RwLock<HashMap<String, SharedWriter>>,
}

impl CsvObserver {
    pub fn new(dir: impl AsRef<Path>) -> CountResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| CountError::OutputFileError(dir.clone(), e))?;

        Ok(Self {
            dir,
            writers: RwLock::new(HashMap::new()),
        })
    }

    /// File receiving the rows of `stream`
    pub fn path_for(&self, stream: &str) -> PathBuf {
        self.dir.join(format!("{}_counts.csv", stream))
    }

    fn writer(&self, stream: &str) -> CountResult<SharedWriter> {
        if let Some(writer) = self
            .writers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(stream)
        {
            return Ok(Arc::clone(writer));
        }

        let mut writers = self.writers.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(writer) = writers.get(stream) {
            return Ok(Arc::clone(writer));
        }

        let path = self.path_for(stream);
        let file = File::create(&path).map_err(|e| CountError::OutputFileError(path.clone(), e))?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", CSV_HEADER)?;
        info!(stream, path = %path.display(), "opened csv log");

        let writer = Arc::new(Mutex::new(writer));
        writers.insert(stream.to_string(), Arc::clone(&writer));
        Ok(writer)
    }

    /// Flush every open file
    pub fn flush(&self) -> CountResult<()> {
        let writers = self.writers.read().unwrap_or_else(PoisonError::into_inner);
        for writer in writers.values() {
            writer.lock().unwrap_or_else(PoisonError::into_inner).flush()?;
        }
        Ok(())
    }
}

/// CSV row for one frame, without line terminator
pub fn format_row(event: &FrameEvent<'_>) -> String {
    format!(
        "{},{},{}",
        event.frame_index, event.snapshot.current, event.snapshot.stabilized
    )
}

impl FrameObserver for CsvObserver {
    fn observe(&self, event: &FrameEvent<'_>) -> CountResult<()> {
        let writer = self.writer(event.stream)?;
        let mut writer = writer.lock().unwrap_or_else(PoisonError::into_inner);

        writeln!(writer, "{}", format_row(event)).map_err(|e| CountError::ObserverFailed {
            observer: "csv".to_string(),
            message: e.to_string(),
        })?;
        // keep the file current for anyone tailing it
        writer.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "csv"
    }
}

impl Drop for CsvObserver {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
