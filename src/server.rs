//! MCP Server — stdio transport, JSON-RPC 2.0, newline-delimited.
//!
//! Implements the Model Context Protocol (spec 2025-06-18) server over
//! stdin/stdout. Reads JSON-RPC requests from stdin (one per line),
//! dispatches to the tool router, and writes responses to stdout.
//!
//! Protocol flow:
//! 1. Client sends `initialize` → server responds with capabilities
//! 2. Client sends `notifications/initialized`
//! 3. Client sends `tools/list` → server returns tool definitions
//! 4. Client sends `tools/call` → server executes tool and returns result
//! 5. Client may send `notifications/roots/list_changed` with a new root
//!    list at any point → allowed directories are replaced
//! 6. Client closes stdin → server exits

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::sandbox::RootRegistry;
use crate::tools::ToolRouter;

/// Maximum size of a single JSON-RPC line (10 MiB).
const MAX_LINE_BYTES: usize = 10 * 1024 * 1024;

const PROTOCOL_VERSION: &str = "2025-06-18";
const SERVER_NAME: &str = "stata-mcp-server";

// ---------------------------------------------------------------------------
// JSON-RPC 2.0 types
// ---------------------------------------------------------------------------

/// JSON-RPC 2.0 request.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Option<serde_json::Value>,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// MCP protocol types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ServerInfo {
    name: String,
    version: String,
}

#[derive(Debug, Serialize)]
struct ServerCapabilities {
    tools: ToolsCapability,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolsCapability {
    list_changed: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InitializeResult {
    protocol_version: String,
    capabilities: ServerCapabilities,
    server_info: ServerInfo,
}

/// MCP tool definition for tools/list.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct ToolsListResult {
    tools: Vec<ToolDefinition>,
}

#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

/// One entry of a client root list.
#[derive(Debug, Deserialize)]
pub struct RootDescriptor {
    /// `file://` URI or plain path.
    pub uri: String,
}

#[derive(Debug, Deserialize)]
struct RootsChangedParams {
    #[serde(default)]
    roots: Option<Vec<RootDescriptor>>,
}

/// MCP content item in tools/call response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

/// MCP tools/call result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    pub content: Vec<ContentItem>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

// ---------------------------------------------------------------------------
// MCP Server configuration
// ---------------------------------------------------------------------------

/// Configuration for the MCP server.
#[derive(Debug, Clone, Default)]
pub struct McpServerConfig {
    /// Allowed directories as given on the command line.
    pub roots: Vec<String>,
}

// ---------------------------------------------------------------------------
// Server main loop
// ---------------------------------------------------------------------------

/// Run the MCP server on stdin/stdout.
///
/// Roots are resolved before the first request is read. Exits when stdin
/// is closed.
///
/// # Errors
///
/// Returns an error if stdin/stdout I/O fails fatally.
pub async fn run_mcp_server(config: McpServerConfig) -> Result<()> {
    let registry = Arc::new(RootRegistry::from_raw(config.roots).await);
    info!(
        roots = ?registry.snapshot().iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
        "stata MCP server starting"
    );

    let router = ToolRouter::new(registry);
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    serve(&router, stdin, stdout).await?;

    info!("stata MCP server stopped");
    Ok(())
}

/// Serve JSON-RPC requests from `reader`, writing responses to `writer`,
/// until `reader` reaches EOF.
///
/// # Errors
///
/// Returns an error if reading or writing fails.
pub async fn serve<R, W>(router: &ToolRouter, mut reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line_buf = String::new();

    loop {
        line_buf.clear();
        let bytes_read = match read_line_limited(&mut reader, &mut line_buf, MAX_LINE_BYTES).await {
            Ok(n) => n,
            Err(LineError::TooLong) => {
                warn!(max = MAX_LINE_BYTES, "request line too long, discarded");
                let resp = error_response(
                    None,
                    -32600,
                    &format!("invalid request: line exceeds {MAX_LINE_BYTES} bytes"),
                );
                write_response(&mut writer, &resp).await?;
                continue;
            }
            Err(LineError::InvalidUtf8) => {
                warn!("request line is not valid UTF-8, discarded");
                let resp = error_response(None, -32700, "parse error: invalid UTF-8");
                write_response(&mut writer, &resp).await?;
                continue;
            }
            Err(LineError::Io(e)) => return Err(e).context("failed to read from stdin"),
        };

        // EOF — client closed stdin, clean exit.
        if bytes_read == 0 {
            info!("stdin closed, shutting down");
            break;
        }

        let trimmed = line_buf.trim();
        if trimmed.is_empty() {
            continue;
        }

        debug!(raw = trimmed, "received request");

        let request: JsonRpcRequest = match serde_json::from_str(trimmed) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "invalid JSON-RPC request");
                let resp = error_response(None, -32700, &format!("parse error: {e}"));
                write_response(&mut writer, &resp).await?;
                continue;
            }
        };

        // JSON-RPC 2.0 spec: "jsonrpc" MUST be exactly "2.0".
        if request.jsonrpc != "2.0" {
            warn!(
                version = request.jsonrpc,
                "invalid JSON-RPC version (expected \"2.0\")"
            );
            let resp = error_response(
                request.id.clone(),
                -32600,
                &format!(
                    "invalid request: jsonrpc version must be \"2.0\", got \"{}\"",
                    request.jsonrpc
                ),
            );
            write_response(&mut writer, &resp).await?;
            continue;
        }

        let is_notification = request.id.is_none();
        let response = dispatch(router, &request).await;

        // Notifications MUST NOT receive a response.
        if is_notification {
            debug!(method = request.method, "notification handled (no response)");
            continue;
        }

        if let Some(resp) = response {
            write_response(&mut writer, &resp).await?;
        }
    }

    Ok(())
}

/// Dispatch a JSON-RPC request to the appropriate handler.
async fn dispatch(router: &ToolRouter, req: &JsonRpcRequest) -> Option<JsonRpcResponse> {
    match req.method.as_str() {
        "initialize" => Some(handle_initialize(req)),
        "notifications/initialized" => {
            info!("client initialized");
            None
        }
        "notifications/roots/list_changed" => {
            handle_roots_changed(router, req).await;
            None
        }
        "tools/list" => Some(handle_tools_list(router, req)),
        "tools/call" => Some(handle_tools_call(router, req).await),
        "ping" => Some(handle_ping(req)),
        _ => {
            warn!(method = req.method, "unknown method");
            Some(error_response(
                req.id.clone(),
                -32601,
                &format!("method not found: {}", req.method),
            ))
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn handle_initialize(req: &JsonRpcRequest) -> JsonRpcResponse {
    let result = InitializeResult {
        protocol_version: PROTOCOL_VERSION.to_owned(),
        capabilities: ServerCapabilities {
            tools: ToolsCapability {
                list_changed: false,
            },
        },
        server_info: ServerInfo {
            name: SERVER_NAME.to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
        },
    };

    success_response(req.id.clone(), &result)
}

fn handle_tools_list(router: &ToolRouter, req: &JsonRpcRequest) -> JsonRpcResponse {
    let tools = router.list_tools();
    let result = ToolsListResult { tools };
    success_response(req.id.clone(), &result)
}

async fn handle_tools_call(router: &ToolRouter, req: &JsonRpcRequest) -> JsonRpcResponse {
    let params: ToolCallParams = match serde_json::from_value(req.params.clone()) {
        Ok(p) => p,
        Err(e) => {
            return error_response(
                req.id.clone(),
                -32602,
                &format!("invalid tools/call params: {e}"),
            );
        }
    };

    let result = router.call_tool(&params.name, params.arguments).await;
    success_response(req.id.clone(), &result)
}

async fn handle_roots_changed(router: &ToolRouter, req: &JsonRpcRequest) {
    let params: RootsChangedParams = match serde_json::from_value(req.params.clone()) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "malformed roots notification, ignoring");
            return;
        }
    };

    let Some(roots) = params.roots else {
        debug!("roots notification without a root list, ignoring");
        return;
    };

    router
        .roots()
        .replace_from_raw(roots.into_iter().map(|r| r.uri))
        .await;
}

fn handle_ping(req: &JsonRpcRequest) -> JsonRpcResponse {
    success_response(req.id.clone(), &serde_json::json!({}))
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

fn success_response(id: Option<serde_json::Value>, result: &impl Serialize) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(v) => JsonRpcResponse {
            jsonrpc: "2.0".to_owned(),
            id,
            result: Some(v),
            error: None,
        },
        Err(e) => {
            warn!(error = %e, "failed to serialize success response");
            error_response(
                id,
                -32603,
                &format!("internal error: failed to serialize result: {e}"),
            )
        }
    }
}

fn error_response(id: Option<serde_json::Value>, code: i64, message: &str) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0".to_owned(),
        id,
        result: None,
        error: Some(JsonRpcError {
            code,
            message: message.to_owned(),
            data: None,
        }),
    }
}

/// Write a JSON-RPC response as a single line.
async fn write_response(out: &mut (impl AsyncWrite + Unpin), resp: &JsonRpcResponse) -> Result<()> {
    let json = serde_json::to_string(resp).context("failed to serialize response")?;
    debug!(response = json, "sending response");
    out.write_all(json.as_bytes())
        .await
        .context("failed to write to stdout")?;
    out.write_all(b"\n")
        .await
        .context("failed to write newline to stdout")?;
    out.flush().await.context("failed to flush stdout")?;
    Ok(())
}

#[derive(Debug)]
enum LineError {
    TooLong,
    InvalidUtf8,
    Io(std::io::Error),
}

impl From<std::io::Error> for LineError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Read a line from `reader` into `buf`, stopping at newline or `max_bytes`.
///
/// Returns the number of bytes read (0 = EOF). An over-long line is
/// consumed up to its newline and reported as [`LineError::TooLong`].
async fn read_line_limited<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    buf: &mut String,
    max_bytes: usize,
) -> Result<usize, LineError> {
    let mut raw = Vec::new();
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            break;
        }
        let (consumed, found_newline) = match available.iter().position(|&b| b == b'\n') {
            Some(pos) => (pos + 1, true),
            None => (available.len(), false),
        };
        if raw.len() + consumed > max_bytes {
            reader.consume(consumed);
            if !found_newline {
                discard_until_newline(reader).await?;
            }
            return Err(LineError::TooLong);
        }
        raw.extend_from_slice(&available[..consumed]);
        reader.consume(consumed);
        if found_newline {
            break;
        }
    }

    let total = raw.len();
    buf.push_str(&String::from_utf8(raw).map_err(|_| LineError::InvalidUtf8)?);
    Ok(total)
}

async fn discard_until_newline<R: AsyncBufRead + Unpin>(reader: &mut R) -> std::io::Result<()> {
    loop {
        let rest = reader.fill_buf().await?;
        if rest.is_empty() {
            return Ok(());
        }
        if let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            reader.consume(pos + 1);
            return Ok(());
        }
        let len = rest.len();
        reader.consume(len);
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn current_roots(router: &ToolRouter) -> Vec<PathBuf> {
        router.roots().snapshot().to_vec()
    }

    async fn roundtrip(router: &ToolRouter, input: &str) -> Vec<serde_json::Value> {
        let mut out = Vec::new();
        serve(router, input.as_bytes(), &mut out).await.expect("serve");
        String::from_utf8(out)
            .expect("utf8")
            .lines()
            .map(|l| serde_json::from_str(l).expect("json line"))
            .collect()
    }

    #[tokio::test]
    async fn test_initialize_and_ping() {
        let router = ToolRouter::with_roots(vec![]);
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
            "\n",
        );
        let responses = roundtrip(&router, input).await;
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["result"]["serverInfo"]["name"], SERVER_NAME);
        assert_eq!(responses[0]["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(responses[1]["id"], 2);
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let router = ToolRouter::with_roots(vec![]);
        let input = concat!(
            "not json\n",
            r#"{"jsonrpc":"1.0","id":1,"method":"ping"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"bogus"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"arguments":{}}}"#,
            "\n",
        );
        let codes: Vec<i64> = roundtrip(&router, input)
            .await
            .iter()
            .map(|r| r["error"]["code"].as_i64().expect("code"))
            .collect();
        assert_eq!(codes, vec![-32700, -32600, -32601, -32602]);
    }

    #[tokio::test]
    async fn test_roots_notification_replaces_roots() {
        let dir = tempfile::tempdir().expect("tempdir");
        let uri = url::Url::from_directory_path(dir.path()).expect("uri");
        let router = ToolRouter::with_roots(vec![PathBuf::from("/nowhere")]);
        let input = format!(
            "{}\n",
            serde_json::json!({
                "jsonrpc": "2.0",
                "method": "notifications/roots/list_changed",
                "params": { "roots": [{ "uri": uri.as_str(), "name": "project" }] }
            })
        );

        let responses = roundtrip(&router, &input).await;
        assert!(responses.is_empty());
        assert_eq!(
            current_roots(&router),
            vec![dir.path().canonicalize().expect("canonicalize")]
        );
    }

    #[tokio::test]
    async fn test_roots_notification_without_list_is_ignored() {
        let router = ToolRouter::with_roots(vec![PathBuf::from("/kept")]);
        let input = "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/roots/list_changed\"}\n";
        roundtrip(&router, input).await;
        assert_eq!(current_roots(&router), vec![PathBuf::from("/kept")]);
    }

    #[tokio::test]
    async fn test_oversized_line_rejected_and_loop_continues() {
        let router = ToolRouter::with_roots(vec![]);
        let mut reader = "x".repeat(64);
        reader.push('\n');
        reader.push_str("{\"jsonrpc\":\"2.0\",\"id\":9,\"method\":\"ping\"}\n");

        let mut buf = String::new();
        let mut input = reader.as_bytes();
        let err = read_line_limited(&mut input, &mut buf, 16).await;
        assert!(matches!(err, Err(LineError::TooLong)));
        let n = read_line_limited(&mut input, &mut buf, 1024)
            .await
            .expect("next line");
        assert!(n > 0);
        assert!(buf.contains("\"id\":9"));

        let responses = roundtrip(&router, &reader).await;
        assert_eq!(responses.last().expect("response")["id"], 9);
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_rejected_and_loop_continues() {
        let router = ToolRouter::with_roots(vec![]);
        let mut input = vec![0xff, 0xfe, b'\n'];
        input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":7,\"method\":\"ping\"}\n");
        let mut out = Vec::new();

        serve(&router, input.as_slice(), &mut out)
            .await
            .expect("serve should survive invalid UTF-8");

        let responses: Vec<serde_json::Value> = String::from_utf8(out)
            .expect("utf8 output")
            .lines()
            .map(|l| serde_json::from_str(l).expect("json line"))
            .collect();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["error"]["code"], -32700);
        assert_eq!(responses[1]["id"], 7);
    }
}
