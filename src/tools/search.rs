//! Search tool — recursive do-file discovery via globset patterns.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use tracing::warn;

use crate::error::{StataError, StataResult};
use crate::sandbox::{STATA_EXTENSION, validate_path};
use crate::server::ToolDefinition;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SearchParams {
    /// Directory to search in.
    pub path: String,
    /// Glob matched against each file's full path and bare name.
    pub pattern: String,
    /// Globs for entries (and whole directories) to skip.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

pub fn tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: "search_stata_files".to_owned(),
        description: "Search a directory tree for Stata .do files whose path or name matches \
            a glob pattern. Supports * (within a path segment), ** (across segments), \
            ? and {a,b}. Entries matching an exclude pattern are skipped, \
            including everything below excluded directories."
            .to_owned(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory path to search in"
                },
                "pattern": {
                    "type": "string",
                    "description": "Search pattern (supports glob patterns)"
                },
                "excludePatterns": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Patterns to exclude",
                    "default": []
                }
            },
            "required": ["path", "pattern"],
            "additionalProperties": false
        }),
    }
}

/// Compile a glob with shell-like separator rules: `*` stays inside one
/// path segment, `**` crosses them.
pub fn compile_glob(pattern: &str) -> StataResult<Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| StataError::InvalidArguments(format!("invalid glob pattern {pattern:?}: {e}")))
}

fn compile_matcher(pattern: &str) -> StataResult<GlobMatcher> {
    Ok(compile_glob(pattern)?.compile_matcher())
}

fn compile_set(patterns: &[String]) -> StataResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(compile_glob(pattern)?);
    }
    builder
        .build()
        .map_err(|e| StataError::InvalidArguments(format!("invalid exclude patterns: {e}")))
}

/// Walk `root` and collect every `.do` file accepted by `keep`.
///
/// `skip` is consulted for every entry first; a skipped directory is not
/// descended into. Both predicates receive the entry's full path and bare
/// name. Subdirectories are only visited when `recursive` is set. Symlinks
/// are never followed. Directories that cannot be read are logged and
/// passed over. The order of the result is unspecified.
pub async fn find_stata_files<K, S>(root: &Path, recursive: bool, keep: K, skip: S) -> Vec<PathBuf>
where
    K: Fn(&Path, &str) -> bool,
    S: Fn(&Path, &str) -> bool,
{
    let mut matches = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "cannot access directory, skipping");
                continue;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "failed to read directory entry");
                    break;
                }
            };

            let path = entry.path();
            let file_name = entry.file_name();
            let name = file_name.to_string_lossy();

            if skip(path.as_path(), &*name) {
                continue;
            }

            // `DirEntry::file_type` does not follow symlinks.
            let Ok(file_type) = entry.file_type().await else {
                continue;
            };

            if file_type.is_dir() {
                if recursive {
                    pending.push(path);
                }
            } else if file_type.is_file()
                && name.ends_with(STATA_EXTENSION)
                && keep(path.as_path(), &*name)
            {
                matches.push(path);
            }
        }
    }

    matches
}

/// `path` relative to `base`, for display.
pub fn relative_display(base: &Path, path: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Relative paths (sorted) of do-files under `path` matching `pattern`.
pub async fn search_files(
    roots: &[PathBuf],
    path: &str,
    pattern: &str,
    exclude_patterns: &[String],
) -> StataResult<Vec<String>> {
    let include = compile_matcher(pattern)?;
    let exclude = compile_set(exclude_patterns)?;

    let dir = validate_path(path, roots).await?;
    super::ensure_directory(&dir).await?;

    let found = find_stata_files(
        &dir,
        true,
        |full, name| include.is_match(full) || include.is_match(name),
        |full, name| exclude.is_match(full) || exclude.is_match(name),
    )
    .await;

    let mut relative: Vec<String> = found.iter().map(|p| relative_display(&dir, p)).collect();
    relative.sort();
    Ok(relative)
}

pub async fn execute(roots: &[PathBuf], arguments: serde_json::Value) -> StataResult<String> {
    let params: SearchParams = super::parse_args(arguments)?;
    let files = search_files(roots, &params.path, &params.pattern, &params.exclude_patterns).await?;

    Ok(format!(
        "Found {} matching Stata .do files:\n{}",
        files.len(),
        files.join("\n")
    ))
}
