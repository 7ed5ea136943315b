//! Atomic file writing via tempfile + rename.
//!
//! Uses [`tempfile::NamedTempFile`] to write to a temporary file in the same
//! directory as the target, then atomically renames it. A failed write never
//! leaves a half-written do-file behind.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{StataError, StataResult};

/// Atomically write `content` to `path`.
///
/// The parent directory must already exist. If `path` exists its permission
/// bits are carried over to the replacement.
pub fn atomic_write(path: &Path, content: &str) -> StataResult<()> {
    let io_err = |e| StataError::io(path, e);

    let parent = path.parent().ok_or_else(|| StataError::ParentMissing {
        path: path.to_path_buf(),
    })?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(io_err)?;
    tmp.write_all(content.as_bytes()).map_err(io_err)?;
    tmp.flush().map_err(io_err)?;

    if let Ok(meta) = std::fs::metadata(path) {
        tmp.as_file()
            .set_permissions(meta.permissions())
            .map_err(io_err)?;
    }

    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

/// [`atomic_write`] on the blocking pool, for use from async tools.
pub async fn atomic_write_async(path: PathBuf, content: String) -> StataResult<()> {
    let target = path.clone();
    tokio::task::spawn_blocking(move || atomic_write(&path, &content))
        .await
        .map_err(|e| StataError::io(target, std::io::Error::other(e)))?
}
