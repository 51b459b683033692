//! Model Context Protocol (MCP) integration.
//!
//! This module exposes the store to AI agents: the
//! [`controller::CheckoutController`] facade translates external
//! argument shapes into domain calls, and [`service::ShoppingService`]
//! wires the facade into an MCP server handler.
//!
//! # Available Tools
//!
//! - `search_shopping_catalog`: browse the product catalog
//! - `add_to_checkout`: add an item (creates the checkout on demand)
//! - `remove_from_checkout`: remove an item (idempotent)
//! - `update_checkout`: set an item's exact quantity
//! - `get_checkout`: read the checkout projection
//! - `start_payment`: begin payment (idempotent)
//! - `update_customer_details`: replace the shipping details
//! - `complete_checkout`: place the order (idempotent)
//!
//! # Resources
//!
//! - `ucp://catalog/products`: full product catalog
//! - `ucp://discovery/profile`: static capability profile
//! - `ucp://checkout/{checkout_id}`: checkout projection
//! - `ucp://orders/{order_id}`: order confirmation document

pub mod controller;
pub mod profile;
pub mod service;

pub use controller::{
    AddToCheckoutParams, CheckoutController, CheckoutLineView, CheckoutView,
    CompleteCheckoutParams, GetCheckoutParams, OrderConfirmation, OrderDocument,
    RemoveFromCheckoutParams, SearchCatalogParams, StartPaymentParams, UpdateCheckoutParams,
    UpdateCustomerDetailsParams,
};
pub use profile::DiscoveryProfile;
pub use service::ShoppingService;
