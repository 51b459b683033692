//! UCP MCP Server: exposes the UCP shopping service to MCP clients.
//!
//! Serves the shopping tools, resources, and prompt over stdio, the
//! default transport for MCP hosts such as Claude Desktop. Log output
//! goes to stderr so the protocol stream on stdout stays clean.

#![allow(
    clippy::multiple_crate_versions,
    reason = "transitive dependencies from rmcp"
)]

use anyhow::Result;
use rmcp::{ServiceExt, transport::stdio};
use tracing::info;
use ucp_mcp_server::observability::{LogFormat, init_observability};
use ucp_mcp_store::ShoppingService;

#[tokio::main]
async fn main() -> Result<()> {
    init_observability(LogFormat::from_env());

    info!("starting UCP shopping MCP server on stdio");

    let service = ShoppingService::new().serve(stdio()).await?;
    service.waiting().await?;

    info!("UCP shopping MCP server stopped");
    Ok(())
}
