//! Resolve a requested path and prove it stays inside the allowed roots.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{absolutize, expand_home, is_within_roots, normalize_lexically};
use crate::error::{StataError, StataResult};

/// Validate `requested` against `roots` and return the path to operate on.
///
/// The lexically normalized path must lie inside a root. If it exists, its
/// real (symlink-resolved) path must too, and that real path is returned.
/// If it does not exist, the real path of its parent must exist and lie
/// inside a root; the normalized path is then returned so the caller can
/// create it.
///
/// # Errors
///
/// - [`StataError::InvalidArguments`] for paths containing NUL bytes
/// - [`StataError::AccessDenied`] when any of the checks above escape
/// - [`StataError::ParentMissing`] when neither target nor parent exist
/// - [`StataError::Io`] for any other filesystem failure
pub async fn validate_path(requested: &str, roots: &[PathBuf]) -> StataResult<PathBuf> {
    // NUL bytes truncate paths in C APIs.
    if requested.contains('\0') {
        return Err(StataError::InvalidArguments(
            "path contains null byte".to_owned(),
        ));
    }

    let expanded = expand_home(requested);
    let absolute = absolutize(&expanded).map_err(|e| StataError::io(&expanded, e))?;
    let candidate = normalize_lexically(&absolute);

    if !is_within_roots(&candidate, roots) {
        return Err(StataError::AccessDenied {
            path: candidate,
            reason: "path outside allowed directories",
        });
    }

    match tokio::fs::canonicalize(&candidate).await {
        Ok(real) => {
            if !is_within_roots(&real, roots) {
                return Err(StataError::AccessDenied {
                    path: real,
                    reason: "symlink target outside allowed directories",
                });
            }
            debug!(requested, resolved = %real.display(), "path validated");
            Ok(real)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => validate_new_file(candidate, roots).await,
        Err(e) => Err(StataError::io(candidate, e)),
    }
}

/// The target does not exist yet: vouch for it through its parent.
async fn validate_new_file(candidate: PathBuf, roots: &[PathBuf]) -> StataResult<PathBuf> {
    let parent = candidate
        .parent()
        .map_or_else(|| candidate.clone(), Path::to_path_buf);

    let real_parent = match tokio::fs::canonicalize(&parent).await {
        Ok(p) => p,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(StataError::ParentMissing { path: parent });
        }
        Err(e) => return Err(StataError::io(parent, e)),
    };

    if !is_within_roots(&real_parent, roots) {
        return Err(StataError::AccessDenied {
            path: real_parent,
            reason: "parent directory outside allowed directories",
        });
    }

    debug!(path = %candidate.display(), "validated path for new file");
    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_of(dir: &tempfile::TempDir) -> Vec<PathBuf> {
        vec![dir.path().canonicalize().expect("canonicalize tempdir")]
    }

    #[tokio::test]
    async fn test_existing_file_inside_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let roots = root_of(&dir);
        let file = roots[0].join("a.do");
        std::fs::write(&file, "x").expect("write");

        let validated = validate_path(file.to_str().expect("utf8"), &roots)
            .await
            .expect("should validate");
        assert_eq!(validated, file);
    }

    #[tokio::test]
    async fn test_root_itself_is_allowed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let roots = root_of(&dir);
        let validated = validate_path(roots[0].to_str().expect("utf8"), &roots)
            .await
            .expect("root should validate");
        assert_eq!(validated, roots[0]);
    }

    #[tokio::test]
    async fn test_dotdot_escape_denied() {
        let dir = tempfile::tempdir().expect("tempdir");
        let roots = root_of(&dir);
        let escape = format!("{}/../etc/passwd", roots[0].display());

        let err = validate_path(&escape, &roots).await.expect_err("should fail");
        assert!(matches!(err, StataError::AccessDenied { .. }), "{err}");
    }

    #[tokio::test]
    async fn test_sibling_with_shared_prefix_denied() {
        let parent = tempfile::tempdir().expect("tempdir");
        let base = parent.path().canonicalize().expect("canonicalize");
        let allowed = base.join("allowed");
        let twin = base.join("allowed-eviltwin");
        std::fs::create_dir(&allowed).expect("mkdir");
        std::fs::create_dir(&twin).expect("mkdir");
        std::fs::write(twin.join("x.do"), "x").expect("write");

        let err = validate_path(twin.join("x.do").to_str().expect("utf8"), &[allowed])
            .await
            .expect_err("should fail");
        assert!(matches!(err, StataError::AccessDenied { .. }));
    }

    #[tokio::test]
    async fn test_new_file_with_existing_parent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let roots = root_of(&dir);
        let target = roots[0].join("new.do");

        let validated = validate_path(target.to_str().expect("utf8"), &roots)
            .await
            .expect("new file should validate");
        assert_eq!(validated, target);
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_new_file_with_missing_parent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let roots = root_of(&dir);
        let target = roots[0].join("missing/new.do");

        let err = validate_path(target.to_str().expect("utf8"), &roots)
            .await
            .expect_err("should fail");
        assert!(matches!(err, StataError::ParentMissing { .. }), "{err}");
    }

    #[tokio::test]
    async fn test_nul_byte_rejected() {
        let err = validate_path("/tmp/a\0.do", &[PathBuf::from("/tmp")])
            .await
            .expect_err("should fail");
        assert!(matches!(err, StataError::InvalidArguments(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_escape_denied() {
        let allowed = tempfile::tempdir().expect("tempdir");
        let outside = tempfile::tempdir().expect("tempdir");
        let roots = root_of(&allowed);
        let secret = outside.path().join("secret.do");
        std::fs::write(&secret, "secret").expect("write");
        let link = roots[0].join("link.do");
        std::os::unix::fs::symlink(&secret, &link).expect("symlink");

        let err = validate_path(link.to_str().expect("utf8"), &roots)
            .await
            .expect_err("should fail");
        assert!(matches!(err, StataError::AccessDenied { .. }), "{err}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_new_file_under_symlinked_dir_escape_denied() {
        let allowed = tempfile::tempdir().expect("tempdir");
        let outside = tempfile::tempdir().expect("tempdir");
        let roots = root_of(&allowed);
        let link_dir = roots[0].join("out");
        std::os::unix::fs::symlink(outside.path(), &link_dir).expect("symlink");

        let err = validate_path(link_dir.join("new.do").to_str().expect("utf8"), &roots)
            .await
            .expect_err("should fail");
        assert!(matches!(err, StataError::AccessDenied { .. }), "{err}");
        assert!(!outside.path().join("new.do").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_inside_root_allowed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let roots = root_of(&dir);
        let real = roots[0].join("real.do");
        std::fs::write(&real, "x").expect("write");
        let link = roots[0].join("alias.do");
        std::os::unix::fs::symlink(&real, &link).expect("symlink");

        let validated = validate_path(link.to_str().expect("utf8"), &roots)
            .await
            .expect("in-root symlink should validate");
        assert_eq!(validated, real);
    }
}
