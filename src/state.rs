//! Atomic, crash-safe persistence of the Scan State: per-file offsets, the
//! serialized dedup index, the schema version, and the last run timestamp.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::AgentError;
use crate::reader::FileOffsetEntry;
use crate::util::atomic_write;

/// Current schema major version. Bumped when the persisted shape changes in
/// a way that requires migration on load.
pub const SCHEMA_VERSION: u32 = 4;

/// The dedup index in its persisted form: `day_key -> [fingerprint, ...]`.
/// Insertion order need not survive a reload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecentHashes(pub HashMap<String, Vec<String>>);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanState {
    pub version: u32,
    #[serde(rename = "lastCleanup")]
    pub last_cleanup: Option<DateTime<Utc>>,
    #[serde(rename = "lastRunTimestamp")]
    pub last_run_timestamp: i64,
    #[serde(rename = "fileOffsets")]
    pub file_offsets: HashMap<PathBuf, FileOffsetEntry>,
    #[serde(rename = "recentHashes")]
    pub recent_hashes: RecentHashes,
}

impl Default for ScanState {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            last_cleanup: None,
            last_run_timestamp: 0,
            file_offsets: HashMap::new(),
            recent_hashes: RecentHashes::default(),
        }
    }
}

/// Loose version of [`ScanState`] used only to read whatever is on disk,
/// including documents from an older schema where some fields may be
/// absent. Every field is optional so a partial/older document still
/// deserializes; missing pieces are filled with defaults during migration.
#[derive(Debug, Deserialize)]
struct PersistedScanState {
    version: Option<serde_json::Value>,
    #[serde(rename = "lastCleanup")]
    last_cleanup: Option<DateTime<Utc>>,
    #[serde(rename = "lastRunTimestamp")]
    last_run_timestamp: Option<i64>,
    #[serde(rename = "fileOffsets")]
    file_offsets: Option<HashMap<PathBuf, FileOffsetEntry>>,
    #[serde(rename = "recentHashes")]
    recent_hashes: Option<RecentHashes>,
}

/// Numeric comparison on the major component, never lexicographic on a
/// version string ("10" must sort after "4").
fn migration_needed(persisted_version: &Option<serde_json::Value>) -> bool {
    let major = persisted_version.as_ref().and_then(version_major);
    major.map(|v| v < SCHEMA_VERSION).unwrap_or(true)
}

fn version_major(value: &serde_json::Value) -> Option<u32> {
    match value {
        serde_json::Value::Number(n) => n.as_u64().map(|v| v as u32),
        serde_json::Value::String(s) => s.split('.').next().and_then(|major| major.parse().ok()),
        _ => None,
    }
}

/// Load the Scan State from `path`, migrating an older or partial schema to
/// the current one. Any I/O or parse failure falls back to the default
/// state (one-time re-scan; acceptable per the dedup/re-send contract).
pub fn load(path: &Path) -> ScanState {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return ScanState::default(),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "could not read state file, resetting to defaults");
            return ScanState::default();
        }
    };

    let persisted: PersistedScanState = match serde_json::from_slice(&bytes) {
        Ok(persisted) => persisted,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "corrupt state file, resetting to defaults");
            return ScanState::default();
        }
    };

    // Any persisted version older than, equal to, or missing relative to
    // the current schema is normalized to `SCHEMA_VERSION` on load; the
    // rewrite happens naturally on the next commit. A version *newer* than
    // ours (e.g. written by a future agent) is left alone rather than
    // silently downgraded.
    let version = match &persisted.version {
        Some(raw) if !migration_needed(&Some(raw.clone())) => version_major(raw).unwrap_or(SCHEMA_VERSION),
        _ => SCHEMA_VERSION,
    };

    ScanState {
        version,
        last_cleanup: persisted.last_cleanup,
        last_run_timestamp: persisted.last_run_timestamp.unwrap_or(0),
        file_offsets: persisted.file_offsets.unwrap_or_default(),
        recent_hashes: persisted.recent_hashes.unwrap_or_default(),
    }
}

/// Serialize to a sibling temp file and rename over the canonical path. The
/// rename is the commit point: a concurrent reader either sees the old file
/// in full or the new one in full, never a partial write.
pub fn commit(path: &Path, state: &ScanState) -> Result<(), AgentError> {
    let json = serde_json::to_vec_pretty(state).expect("ScanState serialization cannot fail");
    atomic_write(path, &json).map_err(|source| AgentError::StateCommit {
        path: path.to_path_buf(),
        source,
    })
}
