//! Info tool — metadata and content heuristics for a do-file.

use std::fmt;
use std::path::PathBuf;
use std::time::SystemTime;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;

use crate::error::{StataError, StataResult};
use crate::sandbox::validate_path;
use crate::server::ToolDefinition;
use crate::util::text::format_size;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InfoParams {
    pub path: String,
}

pub fn tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: "get_stata_file_info".to_owned(),
        description: "Get detailed information about a Stata .do file: size, timestamps, \
            permissions, line count and whether it contains comments or commands."
            .to_owned(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the Stata .do file"
                }
            },
            "required": ["path"],
            "additionalProperties": false
        }),
    }
}

/// Snapshot of a do-file's metadata.
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub path: PathBuf,
    pub size: u64,
    /// Not every filesystem records a birth time.
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub accessed: Option<DateTime<Utc>>,
    pub is_file: bool,
    pub is_directory: bool,
    pub permissions: String,
    pub line_count: usize,
    pub has_comments: bool,
    pub has_commands: bool,
}

/// Line heuristics over do-file content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentStats {
    pub line_count: usize,
    pub has_comments: bool,
    pub has_commands: bool,
}

/// A trimmed line starting with `*` or `//` is a comment; any other
/// non-blank line is a command.
pub fn content_stats(content: &str) -> ContentStats {
    let mut stats = ContentStats::default();
    for line in content.lines() {
        stats.line_count += 1;
        let trimmed = line.trim();
        if trimmed.starts_with('*') || trimmed.starts_with("//") {
            stats.has_comments = true;
        } else if !trimmed.is_empty() {
            stats.has_commands = true;
        }
    }
    stats
}

fn timestamp(time: std::io::Result<SystemTime>) -> Option<DateTime<Utc>> {
    time.ok().map(DateTime::<Utc>::from)
}

#[cfg(unix)]
fn permission_bits(meta: &std::fs::Metadata) -> String {
    use std::os::unix::fs::MetadataExt;
    format!("{:o}", meta.mode())
}

#[cfg(not(unix))]
fn permission_bits(meta: &std::fs::Metadata) -> String {
    if meta.permissions().readonly() {
        "readonly".to_owned()
    } else {
        "read-write".to_owned()
    }
}

/// Collect [`FileInfo`] for the do-file at `path`.
pub async fn file_info(roots: &[PathBuf], path: &str) -> StataResult<FileInfo> {
    let file_path = validate_path(path, roots).await?;
    super::ensure_stata_file(&file_path)?;

    let meta = tokio::fs::metadata(&file_path)
        .await
        .map_err(|e| StataError::io(&file_path, e))?;

    let stats = if meta.is_file() {
        let content = tokio::fs::read_to_string(&file_path)
            .await
            .map_err(|e| StataError::io(&file_path, e))?;
        content_stats(&content)
    } else {
        ContentStats::default()
    };

    Ok(FileInfo {
        size: meta.len(),
        created: timestamp(meta.created()),
        modified: timestamp(meta.modified()),
        accessed: timestamp(meta.accessed()),
        is_file: meta.is_file(),
        is_directory: meta.is_dir(),
        permissions: permission_bits(&meta),
        line_count: stats.line_count,
        has_comments: stats.has_comments,
        has_commands: stats.has_commands,
        path: file_path,
    })
}

struct Stamp(Option<DateTime<Utc>>);

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(t) => f.write_str(&t.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => f.write_str("unavailable"),
        }
    }
}

impl fmt::Display for FileInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .path
            .file_name()
            .map_or_else(|| self.path.display().to_string(), |n| n.to_string_lossy().into_owned());
        let kind = if self.is_directory { "directory" } else { "file" };

        writeln!(f, "File: {name}")?;
        writeln!(f, "Size: {}", format_size(self.size))?;
        writeln!(f, "Created: {}", Stamp(self.created))?;
        writeln!(f, "Modified: {}", Stamp(self.modified))?;
        writeln!(f, "Accessed: {}", Stamp(self.accessed))?;
        writeln!(f, "Type: {kind}")?;
        writeln!(f, "Permissions: {}", self.permissions)?;
        writeln!(f, "Line Count: {}", self.line_count)?;
        writeln!(f, "Has Comments: {}", self.has_comments)?;
        write!(f, "Has Commands: {}", self.has_commands)
    }
}

pub async fn execute(roots: &[PathBuf], arguments: serde_json::Value) -> StataResult<String> {
    let params: InfoParams = super::parse_args(arguments)?;
    Ok(file_info(roots, &params.path).await?.to_string())
}
