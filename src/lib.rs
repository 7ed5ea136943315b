//! `stata-mcp-server` — MCP server for Stata do-files.
//!
//! Exposes read/write/edit/list/create/search/info tools for `.do` files
//! over the Model Context Protocol (stdio, JSON-RPC 2.0, newline-delimited).
//! Every path is confined to a set of allowed root directories, checked
//! both lexically and after symlink resolution.
//!
//! # Tools
//!
//! - `read_stata_file` — whole file, or its first/last N lines
//! - `write_stata_file` — overwrite/create with LF line endings
//! - `edit_stata_file` — ordered exact-text replacements, all-or-nothing
//! - `list_stata_files` — do-files in a directory with sizes
//! - `create_stata_file` — new do-file, optionally with content
//! - `search_stata_files` — glob search with exclude patterns
//! - `get_stata_file_info` — metadata and comment/command heuristics
//!
//! # Architecture
//!
//! ```text
//! stdin (JSON-RPC) → server → ToolRouter → tools::* → sandbox::validate_path
//!                       ↓                                   ↑
//!            roots/list_changed ──────→ RootRegistry ───────┘
//! stdout (JSON-RPC) ←───┘
//! ```

pub mod edit;
pub mod error;
pub mod sandbox;
pub mod server;
pub mod tools;
pub mod util;

pub use error::{StataError, StataResult};
pub use server::run_mcp_server;
