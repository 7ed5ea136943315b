//! Read tool — whole-file, head or tail reads of a do-file.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{StataError, StataResult};
use crate::sandbox::validate_path;
use crate::server::ToolDefinition;
use crate::util::text;

/// Parameters for the read tool.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReadParams {
    /// Path to the do-file.
    pub path: String,
    /// Return only the last N lines.
    #[serde(default)]
    pub tail: Option<usize>,
    /// Return only the first N lines.
    #[serde(default)]
    pub head: Option<usize>,
}

pub fn tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: "read_stata_file".to_owned(),
        description: "Read a Stata .do file and return its contents. \
            Use tail or head to return only the last or first N lines."
            .to_owned(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the Stata .do file"
                },
                "tail": {
                    "type": "integer",
                    "description": "If provided, returns only the last N lines of the file",
                    "minimum": 0
                },
                "head": {
                    "type": "integer",
                    "description": "If provided, returns only the first N lines of the file",
                    "minimum": 0
                }
            },
            "required": ["path"],
            "additionalProperties": false
        }),
    }
}

/// Read a do-file inside `roots`.
///
/// `tail` wins over `head` when both are given; a count of zero means
/// "not given". Counts above the line total return the whole file.
pub async fn read_file(
    roots: &[PathBuf],
    path: &str,
    tail: Option<usize>,
    head: Option<usize>,
) -> StataResult<String> {
    let file_path = validate_path(path, roots).await?;
    super::ensure_stata_file(&file_path)?;

    let content = tokio::fs::read_to_string(&file_path)
        .await
        .map_err(|e| StataError::io(&file_path, e))?;

    let out = match (tail.filter(|&n| n > 0), head.filter(|&n| n > 0)) {
        (Some(n), _) => text::tail(&content, n),
        (None, Some(n)) => text::head(&content, n),
        (None, None) => content,
    };
    Ok(out)
}

/// Execute the read tool.
pub async fn execute(roots: &[PathBuf], arguments: serde_json::Value) -> StataResult<String> {
    let params: ReadParams = super::parse_args(arguments)?;
    read_file(roots, &params.path, params.tail, params.head).await
}
