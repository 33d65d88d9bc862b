//! Small shared filesystem helpers.

use std::io::Write;
use std::path::Path;

/// Write `contents` to a sibling temp file in `path`'s directory, then
/// rename it over `path`. The rename is atomic on the same filesystem, so a
/// concurrent reader of `path` always observes either the previous contents
/// in full or the new ones in full, never a half-written file.
pub fn atomic_write(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
