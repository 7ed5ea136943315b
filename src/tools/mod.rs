//! Tool router — registers and dispatches MCP tool calls.
//!
//! Each tool module exposes its operation as a plain async function over
//! the current root snapshot, plus `tool_definition()` and `execute()` glue
//! for the MCP server. The router owns the shared [`RootRegistry`] and
//! turns every [`StataError`] into an error result instead of a protocol
//! failure.

pub mod create;
pub mod edit;
pub mod info;
pub mod list;
pub mod read;
pub mod search;
pub mod write;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{StataError, StataResult};
use crate::sandbox::{RootRegistry, has_stata_extension};
use crate::server::{ContentItem, ToolCallResult, ToolDefinition};

/// Deserialize tool arguments, rejecting missing or unexpected fields.
pub fn parse_args<T: DeserializeOwned>(arguments: serde_json::Value) -> StataResult<T> {
    let arguments = if arguments.is_null() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| StataError::InvalidArguments(e.to_string()))
}

/// Reject paths that are not Stata do-files.
pub fn ensure_stata_file(path: &Path) -> StataResult<()> {
    if has_stata_extension(path) {
        Ok(())
    } else {
        Err(StataError::InvalidFileType {
            path: path.to_path_buf(),
        })
    }
}

/// Require `path` to be an existing directory.
pub async fn ensure_directory(path: &Path) -> StataResult<()> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| StataError::io(path, e))?;
    if meta.is_dir() {
        Ok(())
    } else {
        Err(StataError::NotADirectory {
            path: path.to_path_buf(),
        })
    }
}

/// Successful single-text result.
pub fn text_result(text: impl Into<String>) -> ToolCallResult {
    ToolCallResult {
        content: vec![ContentItem {
            content_type: "text".to_owned(),
            text: text.into(),
        }],
        is_error: false,
    }
}

/// Failed single-text result.
pub fn error_result(text: impl Into<String>) -> ToolCallResult {
    ToolCallResult {
        content: vec![ContentItem {
            content_type: "text".to_owned(),
            text: text.into(),
        }],
        is_error: true,
    }
}

/// Tool router that dispatches MCP tool calls to implementations.
#[derive(Debug, Clone)]
pub struct ToolRouter {
    roots: Arc<RootRegistry>,
}

impl ToolRouter {
    /// Create a new tool router over `roots`.
    pub const fn new(roots: Arc<RootRegistry>) -> Self {
        Self { roots }
    }

    /// Convenience constructor from already-resolved roots.
    pub fn with_roots(roots: Vec<PathBuf>) -> Self {
        Self::new(Arc::new(RootRegistry::new(roots)))
    }

    /// The registry this router validates against.
    pub fn roots(&self) -> &Arc<RootRegistry> {
        &self.roots
    }

    /// List all available tools with their JSON Schema definitions.
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        vec![
            read::tool_definition(),
            write::tool_definition(),
            edit::tool_definition(),
            list::tool_definition(),
            create::tool_definition(),
            search::tool_definition(),
            info::tool_definition(),
        ]
    }

    /// Call a tool by name with the given JSON arguments.
    ///
    /// Operation failures come back as results with `is_error` set; this
    /// never fails at the protocol level.
    pub async fn call_tool(&self, name: &str, arguments: serde_json::Value) -> ToolCallResult {
        debug!(tool = name, "dispatching tool call");

        // Every call sees one consistent root list even if a roots update
        // lands mid-operation.
        let roots = self.roots.snapshot();

        let outcome = match name {
            "read_stata_file" => read::execute(&roots, arguments).await,
            "write_stata_file" => write::execute(&roots, arguments).await,
            "edit_stata_file" => edit::execute(&roots, arguments).await,
            "list_stata_files" => list::execute(&roots, arguments).await,
            "create_stata_file" => create::execute(&roots, arguments).await,
            "search_stata_files" => search::execute(&roots, arguments).await,
            "get_stata_file_info" => info::execute(&roots, arguments).await,
            _ => return error_result(format!("Unknown tool: {name}")),
        };

        match outcome {
            Ok(text) => text_result(text),
            Err(e) => {
                warn!(tool = name, error = %e, "tool call failed");
                error_result(format!("Error: {e}"))
            }
        }
    }
}
