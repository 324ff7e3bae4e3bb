//! Replay of recorded per-frame counts
//!
//! Stands in for the inference stage when no live pipeline is attached:
//! each input file is fed through the ingestor as if its lines were frame
//! callbacks for one stream.
//!
//! Accepted line formats:
//! - `count`, frame index taken from the line's position
//! - `frame_index,count`
//! - `frame_index,current,stabilized`, as written by the CSV observer
//!
//! Blank lines, `#` comments and the CSV header are skipped.

use crate::error::{CountError, CountResult};
use crate::ingest::FrameIngestor;
use crate::observer::csv::CSV_HEADER;
use crate::stats::Snapshot;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// One frame event read from a replay file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayRecord {
    pub frame_index: i64,
    pub raw_count: i64,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplayError {
    #[error("line {line}: expected 1 to 3 comma-separated integers, got {content:?}")]
    Malformed { line: usize, content: String },
}

/// Outcome of replaying one stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub stream: String,
    pub accepted: u64,
    pub rejected: u64,
    pub malformed: u64,
    pub last: Snapshot,
}

/// Parse one line. `position` is the frame index used when the line only
/// holds a count.
pub fn parse_line(
    line: &str,
    line_number: usize,
    position: i64,
) -> Result<Option<ReplayRecord>, ReplayError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') || line == CSV_HEADER {
        return Ok(None);
    }

    let malformed = || ReplayError::Malformed {
        line: line_number,
        content: line.to_string(),
    };

    let fields: Vec<i64> = line
        .split(',')
        .map(|field| field.trim().parse::<i64>())
        .collect::<Result<_, _>>()
        .map_err(|_| malformed())?;

    match fields.as_slice() {
        [raw_count] => Ok(Some(ReplayRecord {
            frame_index: position,
            raw_count: *raw_count,
        })),
        [frame_index, raw_count] | [frame_index, raw_count, _] => Ok(Some(ReplayRecord {
            frame_index: *frame_index,
            raw_count: *raw_count,
        })),
        _ => Err(malformed()),
    }
}

/// Feed every record of `reader` to `ingestor` as frames of `stream`
pub fn replay_reader<R: BufRead>(
    ingestor: &FrameIngestor,
    stream: &str,
    reader: R,
) -> CountResult<ReplaySummary> {
    let mut summary = ReplaySummary {
        stream: stream.to_string(),
        last: ingestor.registry().snapshot(stream),
        ..ReplaySummary::default()
    };
    let mut position: i64 = 0;

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let record = match parse_line(&line, i + 1, position) {
            Ok(Some(record)) => record,
            Ok(None) => continue,
            Err(e) => {
                warn!(stream, error = %e, "skipping malformed replay line");
                summary.malformed += 1;
                continue;
            }
        };
        position += 1;

        match ingestor.ingest(stream, record.raw_count, record.frame_index) {
            Ok(snapshot) => {
                summary.accepted += 1;
                summary.last = snapshot;
            }
            // already logged by the ingestor
            Err(_) => summary.rejected += 1,
        }
    }

    info!(
        stream,
        accepted = summary.accepted,
        rejected = summary.rejected,
        malformed = summary.malformed,
        "replay finished"
    );
    Ok(summary)
}

/// Replay the file at `path` as frames of `stream`
pub fn replay_file(
    ingestor: &FrameIngestor,
    stream: &str,
    path: &Path,
) -> CountResult<ReplaySummary> {
    let file = File::open(path).map_err(|e| CountError::InputFileError(path.to_path_buf(), e))?;
    replay_reader(ingestor, stream, BufReader::new(file))
}

/// Split a `stream=path` command line argument
pub fn parse_input_arg(arg: &str) -> CountResult<(String, PathBuf)> {
    let (stream, path) = arg.split_once('=').ok_or_else(|| CountError::InvalidConfigValue {
        field: "input".to_string(),
        value: format!("{} (expected STREAM=PATH)", arg),
    })?;

    let stream = stream.trim();
    if !crate::ingest::is_valid_stream_name(stream) || path.trim().is_empty() {
        return Err(CountError::InvalidConfigValue {
            field: "input".to_string(),
            value: arg.to_string(),
        });
    }

    Ok((stream.to_string(), PathBuf::from(path.trim())))
}
