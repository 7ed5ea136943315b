//! List tool — do-files in a directory with human-readable sizes.

use std::path::PathBuf;

use serde::Deserialize;

use super::search::{find_stata_files, relative_display};
use crate::error::{StataError, StataResult};
use crate::sandbox::validate_path;
use crate::server::ToolDefinition;
use crate::util::text::format_size;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListParams {
    /// Directory to list.
    pub path: String,
    /// Include subdirectories.
    #[serde(default)]
    pub recursive: bool,
}

pub fn tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: "list_stata_files".to_owned(),
        description: "List all Stata .do files in a directory with their sizes.".to_owned(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory path to search for Stata .do files"
                },
                "recursive": {
                    "type": "boolean",
                    "description": "Search recursively in subdirectories",
                    "default": false
                }
            },
            "required": ["path"],
            "additionalProperties": false
        }),
    }
}

/// One listed do-file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedFile {
    /// Path relative to the listed directory.
    pub relative_path: String,
    pub size: u64,
}

impl std::fmt::Display for ListedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.relative_path, format_size(self.size))
    }
}

/// Do-files directly under `path`, or anywhere below it when `recursive`.
pub async fn list_files(
    roots: &[PathBuf],
    path: &str,
    recursive: bool,
) -> StataResult<Vec<ListedFile>> {
    let dir = validate_path(path, roots).await?;
    super::ensure_directory(&dir).await?;

    let found = find_stata_files(&dir, recursive, |_, _| true, |_, _| false).await;

    let mut listed = Vec::with_capacity(found.len());
    for file in found {
        let meta = tokio::fs::metadata(&file)
            .await
            .map_err(|e| StataError::io(&file, e))?;
        listed.push(ListedFile {
            relative_path: relative_display(&dir, &file),
            size: meta.len(),
        });
    }
    listed.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(listed)
}

pub async fn execute(roots: &[PathBuf], arguments: serde_json::Value) -> StataResult<String> {
    let params: ListParams = super::parse_args(arguments)?;
    let files = list_files(roots, &params.path, params.recursive).await?;

    let lines: Vec<String> = files.iter().map(ToString::to_string).collect();
    Ok(format!(
        "Found {} Stata .do files:\n{}",
        files.len(),
        lines.join("\n")
    ))
}
