//! Resolution of every path the agent touches: the config file, the three
//! persisted state files, the diagnostic log, and the set of roots to scan
//! for session logs.
//!
//! Centralized here the way the teacher crate centralizes path resolution
//! in a dedicated `paths` module, rather than scattering `std::env::var`
//! calls across components.

use std::env;
use std::path::PathBuf;

const ROOTS_ENV_VAR: &str = "CLAUDE_STATS_LOG_ROOTS";
const DEBUG_ENV_VAR: &str = "CLAUDE_STATS_DEBUG";

fn home_dir() -> Option<PathBuf> {
    dirs::home_dir()
}

/// `$HOME/.claude`, the directory all persisted agent state lives under.
pub fn claude_dir() -> Option<PathBuf> {
    home_dir().map(|h| h.join(".claude"))
}

pub fn config_path() -> Option<PathBuf> {
    claude_dir().map(|d| d.join("stats-config.json"))
}

pub fn state_path() -> Option<PathBuf> {
    claude_dir().map(|d| d.join("stats-state.json"))
}

pub fn buffer_path() -> Option<PathBuf> {
    claude_dir().map(|d| d.join("stats-state.buffer.json"))
}

pub fn lock_path() -> Option<PathBuf> {
    claude_dir().map(|d| d.join("stats.lock"))
}

pub fn debug_log_path() -> Option<PathBuf> {
    claude_dir().map(|d| d.join("stats-debug.log"))
}

pub fn debug_logging_enabled() -> bool {
    env::var_os(DEBUG_ENV_VAR).is_some()
}

/// Candidate root directories to search for `.claude/projects/**/*.jsonl`
/// logs. Honors `CLAUDE_STATS_LOG_ROOTS` (comma-separated) when set; falls
/// back to `$XDG_CONFIG_HOME/claude` and `$HOME/.claude`. Only roots whose
/// `projects/` subdirectory actually exists are kept.
pub fn log_roots() -> Vec<PathBuf> {
    let candidates: Vec<PathBuf> = if let Some(value) = env::var_os(ROOTS_ENV_VAR) {
        value
            .to_string_lossy()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .collect()
    } else {
        let mut candidates = Vec::new();
        if let Some(xdg) = env::var_os("XDG_CONFIG_HOME") {
            candidates.push(PathBuf::from(xdg).join("claude"));
        }
        if let Some(home) = home_dir() {
            candidates.push(home.join(".claude"));
        }
        candidates
    };

    candidates
        .into_iter()
        .filter(|root| root.join("projects").is_dir())
        .collect()
}
