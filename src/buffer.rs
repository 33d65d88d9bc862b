//! Durable queue of records that were collected but not yet delivered,
//! surviving across runs until the Delivery Scheduler drains them.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::AgentError;
use crate::record::UsageRecord;
use crate::util::atomic_write;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PendingBuffer {
    pub records: Vec<UsageRecord>,
    #[serde(rename = "lastAttempt")]
    pub last_attempt: Option<DateTime<Utc>>,
}

/// Load the buffer, tolerating absence and corruption. A corrupt buffer is
/// discarded (not an error): data loss is bounded to one run's worth of
/// unsent records, which is acceptable per the engine's error policy.
pub fn load(path: &Path) -> PendingBuffer {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return PendingBuffer::default(),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "could not read pending buffer, discarding");
            return PendingBuffer::default();
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(buffer) => buffer,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "corrupt pending buffer, discarding");
            PendingBuffer::default()
        }
    }
}

/// Replace the buffer contents atomically.
pub fn replace(path: &Path, records: Vec<UsageRecord>) -> Result<(), AgentError> {
    let buffer = PendingBuffer {
        records,
        last_attempt: Some(Utc::now()),
    };
    let json = serde_json::to_vec_pretty(&buffer).expect("PendingBuffer serialization cannot fail");
    atomic_write(path, &json).map_err(|source| AgentError::BufferCommit {
        path: path.to_path_buf(),
        source,
    })
}

/// Clear the buffer atomically (writes an empty document rather than
/// deleting the file, so a concurrent reader never sees a missing-then-
/// present flicker).
pub fn clear(path: &Path) -> Result<(), AgentError> {
    replace(path, Vec::new())
}
