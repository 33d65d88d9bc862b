//! Layered loading of `stats-config.json`, the one user-facing
//! configuration surface. Analogous to the teacher's tolerant
//! `Config::load` (`crates/cli/src/config.rs`): a missing or unreadable
//! file is not an error, it just means the agent is disabled.

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub username: String,
    #[serde(default, rename = "serverUrl")]
    pub server_url: String,
    #[serde(default)]
    pub enabled: bool,
}

impl Settings {
    /// Whether the engine should do anything at all this run.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.server_url.trim().is_empty()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            username: String::new(),
            server_url: String::new(),
            enabled: false,
        }
    }
}

/// Load settings from `path`. Absence, unreadable content, or malformed
/// JSON all resolve to the inactive default rather than propagating an
/// error — the engine's contract is to exit quietly when unconfigured.
pub fn load(path: &Path) -> Settings {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            debug!(path = %path.display(), error = %err, "no stats config found, agent inactive");
            return Settings::default();
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(settings) => settings,
        Err(err) => {
            debug!(path = %path.display(), error = %err, "malformed stats config, agent inactive");
            Settings::default()
        }
    }
}
