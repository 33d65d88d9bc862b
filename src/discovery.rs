//! Recursive discovery of `.jsonl` session log files under the configured
//! root directories' `projects/` subdirectory.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Walk `root/projects` recursively, returning every file ending in
/// `.jsonl`. Roots are expected to have already been filtered to those
/// whose `projects/` subdirectory exists (see [`crate::paths::log_roots`]).
pub fn discover_log_files(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for root in roots {
        let projects = root.join("projects");
        files.extend(walk_jsonl(&projects));
    }
    files.sort();
    files
}

fn walk_jsonl(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("jsonl"))
        .collect()
}
