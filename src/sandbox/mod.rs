//! Path sandbox — allowed roots and path containment checks.
//!
//! Every path a tool receives goes through [`validate_path`] before any
//! filesystem access. Containment is checked component-wise against the
//! roots held in the [`RootRegistry`], both on the lexically normalized
//! path and on its symlink-resolved real path.

pub mod roots;
pub mod validate;

use std::path::{Component, Path, PathBuf};

pub use roots::{RootRegistry, check_directories, resolve_root};
pub use validate::validate_path;

/// File-name suffix that content operations are restricted to.
pub const STATA_EXTENSION: &str = ".do";

/// Whether `path`'s file name carries the Stata do-file suffix.
pub fn has_stata_extension(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(STATA_EXTENSION))
}

/// Expand a leading `~` or `~/` to the user's home directory.
///
/// Paths like `~user/...` are left untouched, as is everything when no
/// home directory can be determined.
pub fn expand_home(raw: &str) -> PathBuf {
    let rest = if raw == "~" {
        Some("")
    } else {
        raw.strip_prefix("~/")
    };

    match (rest, dirs::home_dir()) {
        (Some(rest), Some(home)) if rest.is_empty() => home,
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(raw),
    }
}

/// Make `path` absolute against the current working directory.
pub fn absolutize(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Resolve `.` and `..` components without touching the filesystem.
///
/// `..` at the root stays at the root, matching POSIX path resolution.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Whether `candidate` equals or is nested under one of `roots`.
///
/// Uses [`Path::starts_with`], which compares whole components, so
/// `/allowed-eviltwin` is never inside `/allowed`.
pub fn is_within_roots(candidate: &Path, roots: &[PathBuf]) -> bool {
    roots.iter().any(|root| candidate.starts_with(root))
}
