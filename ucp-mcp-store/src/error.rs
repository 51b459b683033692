//! Error types for the UCP shopping store.
//!
//! All fallible operations in this crate return [`Result<T>`], and every
//! failure is surfaced to the caller as a structured error carrying a
//! stable machine-readable kind plus a human-readable message. A single
//! bad call never panics the process and never disturbs other checkout
//! sessions.
//!
//! # Error Categories
//!
//! - **Lookup failures** ([`StoreError::ProductNotFound`],
//!   [`StoreError::CheckoutNotFound`], [`StoreError::OrderNotFound`]):
//!   the referenced entity does not exist.
//! - **Validation failures** ([`StoreError::InvalidQuantity`],
//!   [`StoreError::InvalidCustomerDetails`]): the arguments were rejected
//!   at the boundary before touching session state.
//! - **State-machine violations** ([`StoreError::ItemNotFound`],
//!   [`StoreError::PaymentPreconditionFailed`],
//!   [`StoreError::SessionFinalized`]): the call was well formed but the
//!   session is not in a state that permits it.
//!
//! # Examples
//!
//! ```
//! use ucp_mcp_store::error::{Result, StoreError};
//!
//! fn require_positive(quantity: i64) -> Result<u32> {
//!     u32::try_from(quantity)
//!         .ok()
//!         .filter(|q| *q >= 1)
//!         .ok_or(StoreError::InvalidQuantity(quantity))
//! }
//!
//! assert!(require_positive(0).is_err());
//! assert_eq!(require_positive(3).unwrap(), 3);
//! ```

use thiserror::Error;

/// Result type alias for store operations.
///
/// All fallible functions in this crate return this type.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in the UCP shopping store.
///
/// Variants carry enough context to render an actionable message to the
/// calling agent. Idempotent retries of `remove`, `start_payment`, and
/// `complete` are success paths by design and do not appear here.
#[must_use = "errors should be handled, propagated, or explicitly panicked"]
#[derive(Debug, Error)]
pub enum StoreError {
    /// The catalog has no product with the given identifier.
    ///
    /// # Recovery
    ///
    /// Search the catalog again; product identifiers are exact and
    /// case-sensitive.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// No active checkout session exists under the given identifier.
    ///
    /// A supplied-but-unknown identifier is an error rather than an
    /// implicit create: the caller must never silently receive a
    /// different session under a requested identifier.
    ///
    /// # Recovery
    ///
    /// Call `add_to_checkout` without a checkout identifier to open a
    /// fresh session.
    #[error("Checkout not found: {0}")]
    CheckoutNotFound(String),

    /// No finalized order exists under the given identifier.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// The quantity was rejected; adding to a checkout requires a
    /// quantity of at least 1.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// The checkout has no line item for the given product.
    ///
    /// Updating a quantity does not implicitly create a line item; add
    /// the product first.
    #[error("Item not found in checkout: {0}")]
    ItemNotFound(String),

    /// The supplied customer details failed validation.
    ///
    /// The address must include at minimum street, city, postal code,
    /// and country, and the email must contain an `@`.
    #[error("Invalid customer details: {0}")]
    InvalidCustomerDetails(String),

    /// Payment cannot start or complete in the session's current state.
    ///
    /// Starting payment requires customer details and at least one line
    /// item; completing requires payment to have been started first.
    #[error("Payment precondition failed: {0}")]
    PaymentPreconditionFailed(String),

    /// The checkout session has been completed and accepts no further
    /// mutation.
    #[error("Checkout session is finalized: {0}")]
    SessionFinalized(String),
}

impl StoreError {
    /// Returns the stable machine-readable kind for this error.
    ///
    /// Used as the `kind` field of the structured error payload returned
    /// to agents, so callers can branch without parsing messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ProductNotFound(_) => "product_not_found",
            Self::CheckoutNotFound(_) => "checkout_not_found",
            Self::OrderNotFound(_) => "order_not_found",
            Self::InvalidQuantity(_) => "invalid_quantity",
            Self::ItemNotFound(_) => "item_not_found",
            Self::InvalidCustomerDetails(_) => "invalid_customer_details",
            Self::PaymentPreconditionFailed(_) => "payment_precondition_failed",
            Self::SessionFinalized(_) => "session_finalized",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = StoreError::ProductNotFound("BISC-999".into());
        assert_eq!(error.to_string(), "Product not found: BISC-999");
    }

    #[test]
    fn test_invalid_quantity_display() {
        let error = StoreError::InvalidQuantity(-2);
        assert_eq!(error.to_string(), "Invalid quantity: -2");
    }

    #[test]
    fn test_session_finalized_display() {
        let error = StoreError::SessionFinalized("chk-123".into());
        assert!(error.to_string().contains("finalized"));
    }

    #[test]
    fn test_error_kinds_are_stable() {
        let cases = [
            (StoreError::ProductNotFound(String::new()), "product_not_found"),
            (StoreError::CheckoutNotFound(String::new()), "checkout_not_found"),
            (StoreError::OrderNotFound(String::new()), "order_not_found"),
            (StoreError::InvalidQuantity(0), "invalid_quantity"),
            (StoreError::ItemNotFound(String::new()), "item_not_found"),
            (
                StoreError::InvalidCustomerDetails(String::new()),
                "invalid_customer_details",
            ),
            (
                StoreError::PaymentPreconditionFailed(String::new()),
                "payment_precondition_failed",
            ),
            (StoreError::SessionFinalized(String::new()), "session_finalized"),
        ];

        for (error, kind) in cases {
            assert_eq!(error.kind(), kind);
        }
    }
}
