//! Inter-process coordination: a 30-second throttle on top of Scan State,
//! and an exclusive lock file with staleness reclamation, guarding against
//! two triggers racing into the collection phase at once.
//!
//! Combines two of the teacher's lock primitives. The claim file itself —
//! exclusive-create, delete-on-drop — follows `crates/cli/src/lockfile.rs`'s
//! `Lockfile`. On top of that, the open file handle also takes an
//! `fs2`-advisory exclusive lock (`crates/core/src/db/lock_file.rs`'s
//! `LockFile::lock`) as a second, in-process-lifetime guard; but since the
//! staleness reclamation this engine needs must be visible to a *different*
//! process after a crash, the exclusive-create file itself (not the advisory
//! lock, which dies with the process) is the mechanism the 10-second
//! staleness check reasons about.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const THROTTLE_SECONDS: i64 = 30;
pub const STALE_LOCK_SECONDS: u64 = 10;
const ACQUIRE_BUDGET: Duration = Duration::from_secs(1);
const RETRY_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Serialize, Deserialize)]
struct LockContents {
    pid: u32,
    timestamp: u64,
}

/// `true` if the last successful run was recent enough that this trigger
/// should exit silently without doing any work.
pub fn is_throttled(last_run_timestamp_ms: i64, now_ms: i64) -> bool {
    now_ms - last_run_timestamp_ms < THROTTLE_SECONDS * 1000
}

/// A held claim on the lock file. Dropping it releases the lock by
/// deleting the file (best-effort: a delete failure is not worth surfacing,
/// since a subsequent run's staleness check is the backstop).
pub struct LockGuard {
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Try to acquire the exclusive lock at `path`, retrying briefly on
/// contention and reclaiming a stale lock along the way. Returns `None` if
/// the budget is exhausted without acquiring the lock — not an error, the
/// caller exits silently with success.
pub fn acquire(path: &Path) -> Option<LockGuard> {
    let deadline = std::time::Instant::now() + ACQUIRE_BUDGET;
    loop {
        match try_create(path) {
            Ok(()) => return Some(LockGuard { path: path.to_path_buf() }),
            Err(_) => {
                if is_stale(path) {
                    debug!(path = %path.display(), "reclaiming stale lock");
                    let _ = std::fs::remove_file(path);
                    // Immediately retry without waiting out the interval;
                    // another contender may also be racing to reclaim it.
                    continue;
                }
                if std::time::Instant::now() >= deadline {
                    return None;
                }
                sleep(RETRY_INTERVAL);
            }
        }
    }
}

fn try_create(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    // Belt-and-suspenders: the create_new above is what other processes see
    // and race on, but taking the advisory lock too means a thread in this
    // same process that bypassed the create_new check (e.g. via a raw fd)
    // still can't write concurrently.
    file.try_lock_exclusive()?;
    let contents = LockContents {
        pid: std::process::id(),
        timestamp: now_secs(),
    };
    let json = serde_json::to_vec(&contents).expect("LockContents serialization cannot fail");
    file.write_all(&json)?;
    Ok(())
}

fn is_stale(path: &Path) -> bool {
    let Ok(bytes) = std::fs::read(path) else {
        // Lock vanished between the failed create and this read; treat as
        // reclaimable so the retry loop doesn't spin uselessly.
        return true;
    };
    let Ok(contents) = serde_json::from_slice::<LockContents>(&bytes) else {
        return true;
    };
    now_secs().saturating_sub(contents.timestamp) > STALE_LOCK_SECONDS
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
