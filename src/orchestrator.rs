//! Sequences the phases of one trigger: throttle, lock, incremental scan,
//! dedup, merge with the pending buffer, budgeted delivery, and a single
//! atomic commit of everything that changed.
//!
//! Every exit path from [`run`] returns `()`; there is no error path that
//! escapes to the caller; see [`crate::error::AgentError`] for how failures
//! are logged and survived instead.

use std::path::PathBuf;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::buffer;
use crate::config::Settings;
use crate::dedup::{today_utc, DedupIndex};
use crate::delivery::{self, DeliveryOutcome};
use crate::discovery::discover_log_files;
use crate::lock::{self, LockGuard};
use crate::reader::scan_file;
use crate::record::UsageRecord;
use crate::state::{self, ScanState};

pub struct Paths {
    pub state: PathBuf,
    pub buffer: PathBuf,
    pub lock: PathBuf,
    pub log_roots: Vec<PathBuf>,
}

/// Run one full trigger: load config, throttle/lock-gate, scan, dedup,
/// merge, deliver, commit. Never panics on a recoverable condition and
/// never returns an indication that the caller should exit non-zero.
pub async fn run(paths: Paths, settings: Settings) {
    if !settings.is_active() {
        debug!("stats agent is not configured or disabled, exiting");
        return;
    }

    let mut state = state::load(&paths.state);
    let now_ms = Utc::now().timestamp_millis();
    if lock::is_throttled(state.last_run_timestamp, now_ms) {
        debug!("throttled, exiting without doing work");
        return;
    }

    let Some(guard) = lock::acquire(&paths.lock) else {
        debug!("could not acquire lock within budget, exiting");
        return;
    };

    run_locked(&paths, &mut state, &settings, guard).await;
}

async fn run_locked(paths: &Paths, state: &mut ScanState, settings: &Settings, _guard: LockGuard) {
    let mut dedup = DedupIndex::from_serialized(&state.recent_hashes);

    let discovered = discover_log_files(&paths.log_roots);
    let mut collected = Vec::new();
    let mut surviving_offsets = std::collections::HashMap::new();

    for path in &discovered {
        let prior = state.file_offsets.get(path).copied();
        let Some(result) = scan_file(path, prior) else {
            // File vanished or could not be stat'd: drop its offset entry.
            continue;
        };
        for record in result.records {
            if dedup.insert(&record) {
                collected.push(record);
            }
        }
        surviving_offsets.insert(path.clone(), result.updated_offset);
    }
    state.file_offsets = surviving_offsets;
    state.recent_hashes = dedup.into_serialized();

    let pending = buffer::load(&paths.buffer);
    if let Err(err) = buffer::clear(&paths.buffer) {
        warn!(error = %err, "failed to clear pending buffer, continuing anyway");
    }

    let mut outgoing: Vec<UsageRecord> = pending.records;
    outgoing.extend(collected);

    if outgoing.is_empty() {
        finish_run(paths, state, Vec::new());
        return;
    }

    let client = delivery::build_client();
    let DeliveryOutcome { sent_count, unsent_tail } =
        delivery::deliver(&client, &settings.server_url, &settings.username, outgoing).await;
    info!(sent_count, unsent = unsent_tail.len(), "delivery pass complete");

    finish_run(paths, state, unsent_tail);
}

fn finish_run(paths: &Paths, state: &mut ScanState, unsent_tail: Vec<UsageRecord>) {
    if !unsent_tail.is_empty() {
        if let Err(err) = buffer::replace(&paths.buffer, unsent_tail) {
            warn!(error = %err, "failed to persist unsent records to the pending buffer");
        }
    }

    state.last_run_timestamp = Utc::now().timestamp_millis();
    let mut dedup = DedupIndex::from_serialized(&state.recent_hashes);
    dedup.prune_retention(today_utc());
    state.recent_hashes = dedup.into_serialized();
    state.last_cleanup = Some(Utc::now());

    if let Err(err) = state::commit(&paths.state, state) {
        warn!(error = %err, "failed to commit scan state");
    }
}
