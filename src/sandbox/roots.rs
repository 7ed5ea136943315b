//! Allowed root directories, replaceable at runtime.

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::{Context, Result, bail};
use tokio::task::JoinSet;
use tracing::{info, warn};

use super::{absolutize, expand_home, normalize_lexically};

/// The set of directories every tool path must stay inside.
///
/// Readers take a [`snapshot`](Self::snapshot) and validate against that;
/// [`replace`](Self::replace) swaps in a whole new list, so a reader sees
/// either the old roots or the new ones, never a mix.
#[derive(Debug, Default)]
pub struct RootRegistry {
    current: RwLock<Arc<[PathBuf]>>,
}

impl RootRegistry {
    /// Create a registry from already-resolved roots.
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            current: RwLock::new(roots.into()),
        }
    }

    /// Resolve `raw` paths concurrently and build a registry from them.
    pub async fn from_raw<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(resolve_all(raw).await)
    }

    /// The roots in effect right now.
    pub fn snapshot(&self) -> Arc<[PathBuf]> {
        // A poisoned lock still holds a complete list; the swap below is a
        // single assignment.
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Swap in a new set of already-resolved roots.
    pub fn replace(&self, roots: Vec<PathBuf>) {
        let roots: Arc<[PathBuf]> = roots.into();
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = roots;
    }

    /// Resolve `raw` paths or `file://` URIs and swap them in.
    pub async fn replace_from_raw<I, S>(&self, raw: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let resolved = resolve_all(raw).await;
        info!(
            roots = ?resolved.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
            "updated allowed directories"
        );
        self.replace(resolved);
    }
}

/// Check that every startup directory exists and is a directory.
///
/// # Errors
///
/// Returns the first failing directory's error.
pub async fn check_directories(dirs: &[String]) -> Result<()> {
    let mut checks = JoinSet::new();
    for dir in dirs {
        let dir = dir.clone();
        checks.spawn(async move {
            let meta = tokio::fs::metadata(expand_home(&dir))
                .await
                .with_context(|| format!("error accessing directory {dir}"))?;
            if !meta.is_dir() {
                bail!("{dir} is not a directory");
            }
            Ok::<(), anyhow::Error>(())
        });
    }

    while let Some(joined) = checks.join_next().await {
        joined.context("directory check task failed")??;
    }
    Ok(())
}

/// Resolve every entry concurrently. Output order is not significant.
async fn resolve_all<I, S>(raw: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut tasks = JoinSet::new();
    for entry in raw {
        let entry = entry.into();
        tasks.spawn(async move { resolve_root(&entry).await });
    }

    let mut resolved = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Some(path)) => resolved.push(path),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "root resolution task failed"),
        }
    }
    resolved
}

/// Resolve one root the way startup and roots updates both do.
///
/// Accepts a plain path or a `file://` URI. Symlinks are resolved when the
/// directory exists; otherwise the normalized absolute path is kept so a
/// root may be created later. Returns `None` only for URIs that do not name
/// a local file path.
pub async fn resolve_root(raw: &str) -> Option<PathBuf> {
    let path = if raw.starts_with("file://") {
        match url::Url::parse(raw).ok().and_then(|u| u.to_file_path().ok()) {
            Some(p) => p,
            None => {
                warn!(uri = raw, "ignoring root that is not a local file URI");
                return None;
            }
        }
    } else {
        expand_home(raw)
    };

    let absolute = match absolutize(&path) {
        Ok(p) => normalize_lexically(&p),
        Err(e) => {
            warn!(root = raw, error = %e, "cannot determine current directory");
            return None;
        }
    };

    match tokio::fs::canonicalize(&absolute).await {
        Ok(real) => Some(real),
        Err(_) => Some(absolute),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_existing_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolved = resolve_root(dir.path().to_str().expect("utf8"))
            .await
            .expect("resolved");
        assert_eq!(resolved, dir.path().canonicalize().expect("canonicalize"));
    }

    #[tokio::test]
    async fn test_resolve_missing_dir_falls_back_to_normalized() {
        let dir = tempfile::tempdir().expect("tempdir");
        let base = dir.path().canonicalize().expect("canonicalize");
        let raw = format!("{}/later/./x/..", base.display());
        let resolved = resolve_root(&raw).await.expect("resolved");
        assert_eq!(resolved, base.join("later"));
    }

    #[tokio::test]
    async fn test_resolve_file_uri() {
        let dir = tempfile::tempdir().expect("tempdir");
        let base = dir.path().canonicalize().expect("canonicalize");
        let uri = url::Url::from_directory_path(&base).expect("uri");
        let resolved = resolve_root(uri.as_str()).await.expect("resolved");
        assert_eq!(resolved, base);
    }

    #[tokio::test]
    async fn test_non_local_uri_ignored() {
        assert!(resolve_root("file://remote-host/share").await.is_none());
    }

    #[tokio::test]
    async fn test_replace_swaps_whole_list() {
        let registry = RootRegistry::new(vec![PathBuf::from("/old-a"), PathBuf::from("/old-b")]);
        let before = registry.snapshot();

        registry.replace(vec![PathBuf::from("/new")]);

        assert_eq!(&*before, &[PathBuf::from("/old-a"), PathBuf::from("/old-b")]);
        assert_eq!(&*registry.snapshot(), &[PathBuf::from("/new")]);
    }

    #[tokio::test]
    async fn test_from_raw_resolves_all() {
        let a = tempfile::tempdir().expect("tempdir");
        let b = tempfile::tempdir().expect("tempdir");
        let registry = RootRegistry::from_raw([
            a.path().display().to_string(),
            b.path().display().to_string(),
        ])
        .await;

        let mut roots = registry.snapshot().to_vec();
        roots.sort();
        let mut expected = vec![
            a.path().canonicalize().expect("canonicalize"),
            b.path().canonicalize().expect("canonicalize"),
        ];
        expected.sort();
        assert_eq!(roots, expected);
    }

    #[tokio::test]
    async fn test_check_directories_missing_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("absent").display().to_string();
        let err = check_directories(&[missing])
            .await
            .expect_err("missing dir should fail");
        assert!(err.to_string().contains("error accessing directory"));
    }

    #[tokio::test]
    async fn test_check_directories_file_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("a.do");
        std::fs::write(&file, "x").expect("write");
        let err = check_directories(&[file.display().to_string()])
            .await
            .expect_err("file should fail");
        assert!(err.to_string().contains("is not a directory"));
    }

    #[tokio::test]
    async fn test_check_directories_accepts_dirs() {
        let dir = tempfile::tempdir().expect("tempdir");
        check_directories(&[dir.path().display().to_string()])
            .await
            .expect("valid dir");
        check_directories(&[]).await.expect("no dirs");
    }
}
