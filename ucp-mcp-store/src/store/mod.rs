//! In-process retail store backend.
//!
//! The store owns the four domain components:
//!
//! - [`catalog::CatalogIndex`]: read-only product catalog (search and
//!   lookup; immutable after load).
//! - [`checkout::CheckoutSession`]: the per-cart state machine.
//! - [`registry::CheckoutRegistry`]: the process-wide set of active
//!   sessions with per-identifier mutation locking.
//! - [`ledger::OrderLedger`]: append-only store of finalized orders.
//!
//! The agent-facing surface in [`crate::mcp`] orchestrates these; the
//! store modules themselves know nothing about MCP.

pub mod catalog;
pub mod checkout;
pub mod ledger;
pub mod registry;

pub use catalog::{CatalogIndex, Product, ProductResults};
pub use checkout::{
    CheckoutId, CheckoutSession, CheckoutStatus, CustomerDetails, LineItem, PaymentState,
    PostalAddress,
};
pub use ledger::{Order, OrderId, OrderLedger, OrderStatus};
pub use registry::{CheckoutRegistry, SharedSession};
