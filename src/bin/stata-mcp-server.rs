//! stata-mcp-server -- MCP server for Stata do-files.
//!
//! Usage: stata-mcp-server [DIRECTORY]...

use anyhow::Result;
use clap::Parser;
use tracing::warn;

use stata_mcp::sandbox::check_directories;
use stata_mcp::server::{McpServerConfig, run_mcp_server};

/// Serve Stata .do files from the given directories over MCP (stdio).
#[derive(Debug, Parser)]
#[command(name = "stata-mcp-server", version, about)]
struct Cli {
    /// Directories the server may access. More can be supplied later by
    /// the client through the MCP roots protocol.
    directories: Vec<String>,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, env = "STATA_MCP_LOG", default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Log to stderr so it does not interfere with MCP stdio.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if cli.directories.is_empty() {
        warn!(
            "no directories given; the server will deny every path until the client \
             supplies roots through the MCP roots protocol"
        );
    }

    check_directories(&cli.directories).await?;

    run_mcp_server(McpServerConfig {
        roots: cli.directories,
    })
    .await
}
