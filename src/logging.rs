//! Diagnostic logging: a `tracing` subscriber writing to a size-rotating
//! file, gated by `CLAUDE_STATS_DEBUG`. Mirrors the teacher's
//! `DatabaseLogger`/`FileLogger` (`crates/core/src/database_logger.rs`),
//! which rotates a log file on its own trigger (there, the calendar date);
//! here the trigger is file size, per this agent's 10 MiB/`.old` contract.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::fmt::MakeWriter;

const MAX_SIZE_BYTES: u64 = 10 * 1024 * 1024;

struct RotatingFile {
    path: PathBuf,
    file: File,
}

impl RotatingFile {
    fn open(path: PathBuf) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }

    fn maybe_rotate(&mut self) {
        let Ok(metadata) = self.file.metadata() else { return };
        if metadata.len() < MAX_SIZE_BYTES {
            return;
        }
        let old_path = rotated_path(&self.path);
        // Best-effort: if rotation fails, keep appending to the current
        // file rather than lose the logger entirely.
        if std::fs::rename(&self.path, &old_path).is_ok() {
            if let Ok(reopened) = Self::open(self.path.clone()) {
                *self = reopened;
            }
        }
    }
}

fn rotated_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".old");
    PathBuf::from(name)
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.maybe_rotate();
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// `tracing_subscriber::fmt::MakeWriter` implementation backed by a
/// size-rotating file, shared behind a mutex since `tracing-subscriber`
/// may invoke it from multiple spans concurrently.
#[derive(Clone)]
pub struct RotatingFileWriter {
    inner: std::sync::Arc<Mutex<RotatingFile>>,
}

impl RotatingFileWriter {
    pub fn open(path: PathBuf) -> io::Result<Self> {
        Ok(Self {
            inner: std::sync::Arc::new(Mutex::new(RotatingFile::open(path)?)),
        })
    }
}

pub struct RotatingFileWriterGuard(std::sync::Arc<Mutex<RotatingFile>>);

impl Write for RotatingFileWriterGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.lock().unwrap().flush()
    }
}

impl<'a> MakeWriter<'a> for RotatingFileWriter {
    type Writer = RotatingFileWriterGuard;

    fn make_writer(&'a self) -> Self::Writer {
        RotatingFileWriterGuard(self.inner.clone())
    }
}

/// Install the diagnostic logger if `CLAUDE_STATS_DEBUG` is set and a log
/// path is resolvable. Returns `false` (and installs nothing) otherwise, in
/// which case `tracing` macros throughout the crate are free no-ops.
pub fn init() -> bool {
    if !crate::paths::debug_logging_enabled() {
        return false;
    }
    let Some(path) = crate::paths::debug_log_path() else {
        return false;
    };
    let Ok(writer) = RotatingFileWriter::open(path) else {
        return false;
    };

    let subscriber = tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).is_ok()
}
