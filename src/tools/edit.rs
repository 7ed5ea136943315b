//! Edit tool — ordered exact-text replacements with optional dry run.
//!
//! The whole edit sequence is applied in memory first. The file on disk is
//! only replaced once every edit has matched, so a failing edit leaves it
//! exactly as it was.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::debug;

use crate::edit::{EditOperation, apply_edits, diff::unified_diff};
use crate::error::{StataError, StataResult};
use crate::sandbox::validate_path;
use crate::server::ToolDefinition;
use crate::util::atomic::atomic_write_async;

/// Parameters for the edit tool.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EditParams {
    /// Path to the do-file.
    pub path: String,
    /// Replacements, applied in order.
    pub edits: Vec<EditOperation>,
    /// Preview as a unified diff without writing.
    #[serde(default)]
    pub dry_run: bool,
}

/// Return the MCP tool definition for `edit_stata_file`.
pub fn tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: "edit_stata_file".to_owned(),
        description: "Edit a Stata .do file by applying text replacements in order. \
            Each oldText must match exactly; only its first occurrence is replaced. \
            If any edit fails nothing is written. Use dryRun to preview a git-style diff."
            .to_owned(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the Stata .do file"
                },
                "edits": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "oldText": {
                                "type": "string",
                                "description": "Text to search for - must match exactly"
                            },
                            "newText": {
                                "type": "string",
                                "description": "Text to replace with"
                            }
                        },
                        "required": ["oldText", "newText"],
                        "additionalProperties": false
                    }
                },
                "dryRun": {
                    "type": "boolean",
                    "description": "Preview changes using git-style diff format",
                    "default": false
                }
            },
            "required": ["path", "edits"],
            "additionalProperties": false
        }),
    }
}

/// Apply `edits` to the do-file at `path`.
///
/// Returns the diff for a dry run, otherwise a success message with the
/// number of edits applied.
pub async fn edit_file(
    roots: &[PathBuf],
    path: &str,
    edits: &[EditOperation],
    dry_run: bool,
) -> StataResult<String> {
    let file_path = validate_path(path, roots).await?;
    super::ensure_stata_file(&file_path)?;

    let original = tokio::fs::read_to_string(&file_path)
        .await
        .map_err(|e| StataError::io(&file_path, e))?;

    let updated = apply_edits(&original, edits)?;
    let shown = file_path.display().to_string();

    if dry_run {
        debug!(path = %shown, edits = edits.len(), "dry-run edit");
        return Ok(unified_diff(&shown, &original, &updated));
    }

    atomic_write_async(file_path, updated).await?;
    Ok(format!(
        "Successfully applied {} edit(s) to {shown}",
        edits.len()
    ))
}

/// Execute the edit tool.
pub async fn execute(roots: &[PathBuf], arguments: serde_json::Value) -> StataResult<String> {
    let params: EditParams = super::parse_args(arguments)?;
    edit_file(roots, &params.path, &params.edits, params.dry_run).await
}
