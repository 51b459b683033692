//! Append-only ledger of finalized orders.
//!
//! An [`Order`] is a frozen snapshot of a checkout session at the moment
//! it completed. Orders are immutable after creation and live for the
//! process lifetime. Exactly-once recording is enforced by the session's
//! idempotent completion, not by the ledger itself.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use crate::error::{Result, StoreError};
use crate::store::checkout::{CheckoutId, CheckoutSession, CustomerDetails, LineItem};

/// Opaque identifier for a finalized order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(String);

impl OrderId {
    /// Wraps a caller-supplied identifier.
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// Generates a fresh unique identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("ord-{}", uuid::Uuid::new_v4()))
    }

    /// Returns the inner string reference.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status of a finalized order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order has been placed with the store backend.
    Placed,
}

/// Frozen copy of a completed checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Order identifier.
    pub id: OrderId,
    /// Identifier of the checkout this order originated from.
    pub checkout_id: CheckoutId,
    /// Line items at completion time.
    pub line_items: Vec<LineItem>,
    /// Total at completion time.
    pub total: Decimal,
    /// Currency code (ISO 4217).
    pub currency: String,
    /// Customer details at completion time.
    pub customer: CustomerDetails,
    /// Order status.
    pub status: OrderStatus,
    /// When the order was placed.
    pub created_at: DateTime<Utc>,
}

/// Append-only store of finalized orders, keyed by order identifier.
#[derive(Debug, Default)]
pub struct OrderLedger {
    orders: RwLock<HashMap<OrderId, Arc<Order>>>,
}

impl OrderLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the order produced by a completing checkout session.
    ///
    /// The order is a deterministic snapshot of the session's line
    /// items, total, and customer details under a freshly generated
    /// order identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::PaymentPreconditionFailed`] if the session
    /// carries no customer details; the session state machine makes
    /// that unreachable once payment has started.
    pub async fn record(&self, session: &CheckoutSession) -> Result<Arc<Order>> {
        let customer = session.customer().cloned().ok_or_else(|| {
            StoreError::PaymentPreconditionFailed(
                "cannot place an order without customer details".to_owned(),
            )
        })?;

        let order = Arc::new(Order {
            id: OrderId::generate(),
            checkout_id: session.id().clone(),
            line_items: session.line_items().values().cloned().collect(),
            total: session.total(),
            currency: session.currency().to_owned(),
            customer,
            status: OrderStatus::Placed,
            created_at: Utc::now(),
        });

        self.orders
            .write()
            .await
            .insert(order.id.clone(), Arc::clone(&order));
        info!(order_id = %order.id, checkout_id = %order.checkout_id, "order placed");
        Ok(order)
    }

    /// Looks up a finalized order by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::OrderNotFound`] if the identifier is
    /// absent.
    pub async fn lookup(&self, order_id: &OrderId) -> Result<Arc<Order>> {
        self.orders
            .read()
            .await
            .get(order_id)
            .cloned()
            .ok_or_else(|| StoreError::OrderNotFound(order_id.to_string()))
    }

    /// Returns the number of recorded orders.
    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Returns `true` if no orders have been recorded.
    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }
}
