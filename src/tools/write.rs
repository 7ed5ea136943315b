//! Write tool — overwrite or create a do-file with normalized line endings.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::StataResult;
use crate::sandbox::validate_path;
use crate::server::ToolDefinition;
use crate::util::atomic::atomic_write_async;
use crate::util::text::normalize_line_endings;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WriteParams {
    /// Path to the do-file.
    pub path: String,
    /// Content to write.
    pub content: String,
}

pub fn tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: "write_stata_file".to_owned(),
        description: "Write content to a Stata .do file, replacing any existing content. \
            The parent directory must already exist."
            .to_owned(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the Stata .do file"
                },
                "content": {
                    "type": "string",
                    "description": "Content to write to the file"
                }
            },
            "required": ["path", "content"],
            "additionalProperties": false
        }),
    }
}

/// Validate `path` and replace its content, returning the written path.
///
/// Shared by the write and create tools.
pub async fn store_file(roots: &[PathBuf], path: &str, content: &str) -> StataResult<PathBuf> {
    let file_path = validate_path(path, roots).await?;
    super::ensure_stata_file(&file_path)?;

    atomic_write_async(file_path.clone(), normalize_line_endings(content)).await?;
    Ok(file_path)
}

pub async fn write_file(roots: &[PathBuf], path: &str, content: &str) -> StataResult<String> {
    let file_path = store_file(roots, path, content).await?;
    Ok(format!("Successfully wrote to {}", file_path.display()))
}

pub async fn execute(roots: &[PathBuf], arguments: serde_json::Value) -> StataResult<String> {
    let params: WriteParams = super::parse_args(arguments)?;
    write_file(roots, &params.path, &params.content).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StataError;

    #[tokio::test]
    async fn test_write_normalizes_line_endings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().canonicalize().expect("canonicalize");
        let file = root.join("a.do");

        let msg = write_file(&[root.clone()], file.to_str().expect("utf8"), "a\r\nb\rc")
            .await
            .expect("write");
        assert!(msg.starts_with("Successfully wrote to"));
        assert_eq!(std::fs::read_to_string(&file).expect("read"), "a\nb\nc");
    }

    #[tokio::test]
    async fn test_write_outside_roots_does_not_touch_disk() {
        let allowed = tempfile::tempdir().expect("tempdir");
        let outside = tempfile::tempdir().expect("tempdir");
        let root = allowed.path().canonicalize().expect("canonicalize");
        let target = outside.path().join("evil.do");

        let err = write_file(&[root], target.to_str().expect("utf8"), "x")
            .await
            .expect_err("should fail");
        assert!(matches!(err, StataError::AccessDenied { .. }));
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_write_wrong_extension_does_not_touch_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().canonicalize().expect("canonicalize");
        let target = root.join("notes.txt");

        let err = write_file(&[root], target.to_str().expect("utf8"), "x")
            .await
            .expect_err("should fail");
        assert!(matches!(err, StataError::InvalidFileType { .. }));
        assert!(!target.exists());
    }
}
