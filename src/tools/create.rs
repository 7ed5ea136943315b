//! Create tool — new do-file, empty unless content is given.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::StataResult;
use crate::server::ToolDefinition;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateParams {
    pub path: String,
    #[serde(default)]
    pub content: Option<String>,
}

pub fn tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: "create_stata_file".to_owned(),
        description: "Create a new Stata .do file, optionally with initial content.".to_owned(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path for the new Stata .do file"
                },
                "content": {
                    "type": "string",
                    "description": "Initial content for the file"
                }
            },
            "required": ["path"],
            "additionalProperties": false
        }),
    }
}

pub async fn create_file(
    roots: &[PathBuf],
    path: &str,
    content: Option<&str>,
) -> StataResult<String> {
    let file_path = super::write::store_file(roots, path, content.unwrap_or_default()).await?;
    Ok(format!("Successfully created {}", file_path.display()))
}

pub async fn execute(roots: &[PathBuf], arguments: serde_json::Value) -> StataResult<String> {
    let params: CreateParams = super::parse_args(arguments)?;
    create_file(roots, &params.path, params.content.as_deref()).await
}
