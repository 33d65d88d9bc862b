use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the engine's internal components.
///
/// Every variant here is recovered locally or logged-and-survived by
/// [`crate::orchestrator::run`]; none of them are ever allowed to turn into
/// a non-zero process exit code.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("failed to read state file {path}")]
    StateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse state file {path}")]
    StateParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to commit state file {path}")]
    StateCommit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to commit buffer file {path}")]
    BufferCommit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not stat log file {path}")]
    LogFileStat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not read log file {path}")]
    LogFileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("lock file operation failed")]
    Lock(#[from] std::io::Error),

    #[error(transparent)]
    Request(#[from] reqwest::Error),

    #[error("server returned non-success status {status}")]
    ServerStatus { status: reqwest::StatusCode },
}
