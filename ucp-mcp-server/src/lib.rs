//! UCP MCP Server: host process for the UCP shopping service.
//!
//! The binary wires the transport-agnostic [`ucp_mcp_store`] handler to
//! a stdio transport and owns process-level concerns (logging setup,
//! shutdown). Everything agent-visible lives in `ucp-mcp-store`.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![allow(
    clippy::multiple_crate_versions,
    reason = "transitive dependencies from rmcp"
)]

pub mod observability;
