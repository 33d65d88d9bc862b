//! Incremental tail-reading of a single log file, tracking a byte offset so
//! that successive runs only parse newly appended lines.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::record::{parse_line, RejectReason, UsageRecord};

/// Persisted `(offset, size, mtime)` triple for one tracked log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOffsetEntry {
    pub offset: u64,
    pub size: u64,
    pub mtime: u64,
}

/// Outcome of scanning one file's newly appended region.
pub struct ScanResult {
    pub records: Vec<UsageRecord>,
    pub updated_offset: FileOffsetEntry,
}

/// Read only the newly appended region of `path` given the previously
/// committed offset entry (if any), and parse it into records.
///
/// Returns `None` if the file could not be stat'd (treated as absent: the
/// caller must drop any prior offset entry for this path).
pub fn scan_file(path: &Path, prior: Option<FileOffsetEntry>) -> Option<ScanResult> {
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(err) => {
            debug!(path = %path.display(), error = %err, "log file absent or unstattable");
            return None;
        }
    };
    let current_size = metadata.len();
    let current_mtime = mtime_secs(&metadata);

    if let Some(prior) = prior {
        if current_size == prior.size && current_mtime == prior.mtime {
            return Some(ScanResult {
                records: Vec::new(),
                updated_offset: prior,
            });
        }
    }

    let start_offset = match prior {
        Some(prior) if current_size >= prior.size => prior.offset,
        // Truncation or rotation: observed size shrank, rescan from 0.
        _ => 0,
    };

    let records = match read_new_lines(path, start_offset) {
        Ok(records) => records,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "could not read log file, skipping this run");
            return Some(ScanResult {
                records: Vec::new(),
                updated_offset: prior.unwrap_or(FileOffsetEntry {
                    offset: 0,
                    size: 0,
                    mtime: 0,
                }),
            });
        }
    };

    Some(ScanResult {
        records,
        updated_offset: FileOffsetEntry {
            offset: current_size,
            size: current_size,
            mtime: current_mtime,
        },
    })
}

fn read_new_lines(path: &Path, start_offset: u64) -> std::io::Result<Vec<UsageRecord>> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(start_offset))?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            // A non-UTF8 line: `BufReader::lines` has already consumed its
            // bytes (including the trailing newline) before failing the
            // conversion, so the underlying cursor sits past it already.
            // Skip just this one line rather than abandoning the rest of
            // the newly appended region.
            Err(err) => {
                debug!(path = %path.display(), error = %err, "skipped unreadable log line");
                continue;
            }
        };
        match parse_line(&line) {
            Ok(record) => records.push(record),
            Err(reason) => log_rejection(path, reason),
        }
    }
    Ok(records)
}

fn log_rejection(path: &Path, reason: RejectReason) {
    debug!(path = %path.display(), ?reason, "rejected log line");
}

fn mtime_secs(metadata: &std::fs::Metadata) -> u64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
