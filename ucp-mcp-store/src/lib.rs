//! UCP Shopping Service: agent-facing checkout over MCP.
//!
//! A Rust implementation of a UCP (Universal Commerce Protocol) shopping
//! service that exposes catalog browsing and a full checkout workflow to
//! AI agents through Anthropic's Model Context Protocol (MCP). Agents
//! discover the available operations, call them with structured
//! arguments, and read structured state back through addressable
//! resources.
//!
//! # What This Crate Provides
//!
//! - **A checkout state machine** with real invariants: quantities,
//!   recomputed totals, address/payment readiness ordering, and
//!   idempotent completion that stays correct under concurrent tool
//!   calls racing on one checkout identifier.
//! - **An in-process store backend**: immutable product catalog,
//!   session registry with per-checkout locking, and an append-only
//!   order ledger.
//! - **An MCP surface**: eight tools, four `ucp://` resources, and a
//!   shopping-assistance prompt, ready to attach to any transport.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   AI Agent      │  Claude or other MCP-compatible agent
//! └────────┬────────┘
//!          │ MCP Protocol (JSON-RPC 2.0)
//!          │
//! ┌────────▼────────────────────────────────────────┐
//! │        UCP Shopping Service (this crate)        │
//! │  ┌───────────────┐      ┌──────────────────┐   │
//! │  │ ShoppingService│─────│ CheckoutController│  │
//! │  │  (MCP tools,  │      │     (facade)     │   │
//! │  │   resources)  │      └───────┬──────────┘   │
//! │  └───────────────┘              │              │
//! │          ┌──────────────────────┼───────────┐  │
//! │  ┌───────▼──────┐  ┌────────────▼───┐  ┌────▼─────┐
//! │  │ CatalogIndex │  │CheckoutRegistry│  │OrderLedger│
//! │  │  (read-only) │  │ (per-id locks) │  │(append-  │
//! │  └──────────────┘  └────────────────┘  │  only)   │
//! │                                        └──────────┘
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! A tool call arrives at the controller, which resolves (or creates) a
//! checkout session via the registry, applies one state transition under
//! the session's mutation lock — consulting the catalog for pricing —
//! and returns the session's projection. `complete_checkout`
//! additionally records an order in the ledger and moves the session to
//! its terminal state.
//!
//! # Quick Start
//!
//! ```
//! use ucp_mcp_store::mcp::{AddToCheckoutParams, CheckoutController};
//!
//! # async fn example() -> ucp_mcp_store::error::Result<()> {
//! let controller = CheckoutController::with_default_catalog();
//!
//! // Omitting checkout_id opens a fresh checkout.
//! let view = controller
//!     .add_to_checkout(AddToCheckoutParams {
//!         product_id: "BISC-001".to_string(),
//!         quantity: 2,
//!         checkout_id: None,
//!     })
//!     .await?;
//!
//! assert_eq!(view.line_items.len(), 1);
//! println!("checkout {} total {}", view.checkout_id, view.total);
//! # Ok(())
//! # }
//! ```
//!
//! To serve the same controller over MCP, wrap it in
//! [`mcp::ShoppingService`] and attach it to a transport in the host
//! process (see the `ucp-mcp-server` binary for the stdio wiring).
//!
//! # Concurrency Model
//!
//! Calls against different checkout identifiers run concurrently without
//! coordination. Calls naming the same identifier are serialized by a
//! per-session async mutex held for the duration of one state
//! transition and released on every exit path. Catalog reads never
//! lock: the catalog is immutable after load, and each line item
//! snapshots its unit price at add time, so later catalog changes never
//! disturb an existing checkout's total.
//!
//! # Retry Safety
//!
//! Agents retry after ambiguous transport failures, so the retry-prone
//! operations are success paths rather than errors: removing an item
//! that is already gone, re-starting a started payment, and
//! re-completing a completed checkout (which replays the same order
//! identifier without creating a second order).
//!
//! # Module Organization
//!
//! - [`store`]: catalog, checkout state machine, session registry,
//!   order ledger
//! - [`mcp`]: controller facade, MCP handler, discovery profile
//! - [`error`]: error taxonomy with stable machine-readable kinds
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, StoreError>`](error::Result).
//! Tool failures are surfaced to agents as structured payloads carrying
//! the error kind and message; no failure crashes the process or
//! disturbs other sessions.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![allow(
    clippy::multiple_crate_versions,
    reason = "transitive dependencies from rmcp"
)]

pub mod error;
pub mod mcp;
pub mod store;

pub use error::{Result, StoreError};
pub use mcp::{CheckoutController, ShoppingService};
