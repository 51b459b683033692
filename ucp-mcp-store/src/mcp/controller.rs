//! Checkout controller: the facade behind every tool and resource.
//!
//! The controller maps each external operation onto registry and session
//! calls, converts loosely-typed arguments into the domain types at this
//! boundary (never propagating untyped maps inward), and renders the
//! checkout projection returned by `get_checkout` and embedded in every
//! mutating operation's response.
//!
//! Catalog lookups happen before the per-session lock is taken; the lock
//! is held only for the read-modify-write on the session itself and is
//! released on every exit path when the guard drops.

use chrono::{DateTime, Utc};
use rmcp::schemars;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::Result;
use crate::mcp::profile::DiscoveryProfile;
use crate::store::{
    CatalogIndex, CheckoutId, CheckoutRegistry, CheckoutSession, CheckoutStatus, CustomerDetails,
    Order, OrderId, OrderLedger, OrderStatus, PaymentState, PostalAddress, ProductResults,
};

// ============================================================================
// Tool Parameters
// ============================================================================

/// Parameters for searching the catalog.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchCatalogParams {
    /// Search keywords or categories. An empty query returns the full
    /// catalog.
    #[serde(default)]
    pub query: String,
}

/// Parameters for adding a product to a checkout.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddToCheckoutParams {
    /// Product identifier to add.
    pub product_id: String,
    /// Quantity to add (must be at least 1).
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    /// Existing checkout identifier. Omit to create a new checkout.
    #[serde(default)]
    pub checkout_id: Option<String>,
}

fn default_quantity() -> i64 {
    1
}

/// Parameters for removing a product from a checkout.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RemoveFromCheckoutParams {
    /// Checkout identifier.
    pub checkout_id: String,
    /// Product identifier to remove.
    pub product_id: String,
}

/// Parameters for setting a product's quantity in a checkout.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateCheckoutParams {
    /// Checkout identifier.
    pub checkout_id: String,
    /// Product identifier to update.
    pub product_id: String,
    /// New exact quantity; zero or negative removes the line item.
    pub quantity: i64,
}

/// Parameters for reading a checkout.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetCheckoutParams {
    /// Checkout identifier.
    pub checkout_id: String,
}

/// Parameters for starting payment on a checkout.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct StartPaymentParams {
    /// Checkout identifier.
    pub checkout_id: String,
}

/// Parameters for replacing the customer details on a checkout.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateCustomerDetailsParams {
    /// Checkout identifier.
    pub checkout_id: String,
    /// Full shipping address; replaces any previous address wholesale.
    pub address: PostalAddress,
    /// Buyer email address.
    pub email: String,
}

/// Parameters for completing a checkout.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CompleteCheckoutParams {
    /// Checkout identifier.
    pub checkout_id: String,
}

// ============================================================================
// Projections
// ============================================================================

/// One line of the checkout projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutLineView {
    /// Product identifier.
    pub product_id: String,
    /// Product name at add time.
    pub name: String,
    /// Quantity.
    pub quantity: u32,
    /// Unit price snapshot.
    pub unit_price: Decimal,
    /// `quantity × unit_price`.
    pub line_total: Decimal,
}

/// The checkout projection returned by `get_checkout` and embedded in
/// every mutating operation's response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutView {
    /// Checkout identifier.
    pub checkout_id: CheckoutId,
    /// Lifecycle state.
    pub status: CheckoutStatus,
    /// Payment state.
    pub payment_state: PaymentState,
    /// Current line items, in deterministic product-id order.
    pub line_items: Vec<CheckoutLineView>,
    /// Computed total over all line items.
    pub total: Decimal,
    /// Currency code (ISO 4217).
    pub currency: String,
    /// Customer details, if set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<CustomerDetails>,
    /// Identifier of the order created on completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    /// When the checkout was created.
    pub created_at: DateTime<Utc>,
    /// When the checkout was last mutated.
    pub updated_at: DateTime<Utc>,
}

impl CheckoutView {
    /// Renders the projection of a session's current state.
    #[must_use]
    pub fn from_session(session: &CheckoutSession) -> Self {
        Self {
            checkout_id: session.id().clone(),
            status: session.status(),
            payment_state: session.payment_state(),
            line_items: session
                .line_items()
                .values()
                .map(|line| CheckoutLineView {
                    product_id: line.product_id.clone(),
                    name: line.name.clone(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    line_total: line.line_total(),
                })
                .collect(),
            total: session.total(),
            currency: session.currency().to_owned(),
            customer: session.customer().cloned(),
            order_id: session.order_id().cloned(),
            created_at: session.created_at(),
            updated_at: session.updated_at(),
        }
    }
}

/// Confirmation returned by `complete_checkout`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderConfirmation {
    /// Identifier of the placed order.
    pub order_id: OrderId,
    /// Order status.
    pub status: OrderStatus,
    /// Final checkout projection (terminal state).
    pub checkout: CheckoutView,
}

/// Document served for the `ucp://orders/{order_id}` resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDocument {
    /// The finalized order.
    pub order: Order,
}

// ============================================================================
// Controller
// ============================================================================

/// Facade exposing the eight operations and four resource reads.
#[derive(Debug)]
pub struct CheckoutController {
    catalog: CatalogIndex,
    registry: CheckoutRegistry,
    ledger: OrderLedger,
    profile: DiscoveryProfile,
}

impl CheckoutController {
    /// Creates a controller over the given catalog with empty session
    /// and order stores.
    #[must_use]
    pub fn new(catalog: CatalogIndex) -> Self {
        Self {
            catalog,
            registry: CheckoutRegistry::new(),
            ledger: OrderLedger::new(),
            profile: DiscoveryProfile::current(),
        }
    }

    /// Creates a controller over the default demo catalog.
    #[must_use]
    pub fn with_default_catalog() -> Self {
        Self::new(CatalogIndex::with_default_catalog())
    }

    /// Searches the product catalog.
    #[instrument(skip(self))]
    #[must_use]
    pub fn search_shopping_catalog(&self, query: &str) -> ProductResults {
        self.catalog.search(query)
    }

    /// Adds a product to a checkout, creating the checkout if no
    /// identifier was supplied.
    ///
    /// # Errors
    ///
    /// Fails with `ProductNotFound`, `CheckoutNotFound`,
    /// `InvalidQuantity`, or `SessionFinalized`.
    #[instrument(skip(self, params), fields(product_id = %params.product_id, quantity = params.quantity))]
    pub async fn add_to_checkout(&self, params: AddToCheckoutParams) -> Result<CheckoutView> {
        info!("adding item to checkout");
        let product = self.catalog.lookup(&params.product_id)?.clone();
        let checkout_id = params.checkout_id.map(CheckoutId::new);
        let session = self.registry.get_or_create(checkout_id.as_ref()).await?;
        let mut session = session.lock().await;
        session.add_item(&product, params.quantity)?;
        Ok(CheckoutView::from_session(&session))
    }

    /// Removes a product from a checkout. Removing an absent product is
    /// an idempotent success.
    ///
    /// # Errors
    ///
    /// Fails with `CheckoutNotFound` or `SessionFinalized`.
    #[instrument(skip(self, params), fields(checkout_id = %params.checkout_id, product_id = %params.product_id))]
    pub async fn remove_from_checkout(
        &self,
        params: RemoveFromCheckoutParams,
    ) -> Result<CheckoutView> {
        info!("removing item from checkout");
        let session = self.registry.get(&CheckoutId::new(params.checkout_id)).await?;
        let mut session = session.lock().await;
        session.remove_item(&params.product_id)?;
        Ok(CheckoutView::from_session(&session))
    }

    /// Sets a product's quantity in a checkout; zero or negative removes
    /// the line item.
    ///
    /// # Errors
    ///
    /// Fails with `CheckoutNotFound`, `ItemNotFound`, `InvalidQuantity`,
    /// or `SessionFinalized`.
    #[instrument(skip(self, params), fields(checkout_id = %params.checkout_id, product_id = %params.product_id, quantity = params.quantity))]
    pub async fn update_checkout(&self, params: UpdateCheckoutParams) -> Result<CheckoutView> {
        info!("updating checkout item");
        let session = self.registry.get(&CheckoutId::new(params.checkout_id)).await?;
        let mut session = session.lock().await;
        session.update_item(&params.product_id, params.quantity)?;
        Ok(CheckoutView::from_session(&session))
    }

    /// Returns the current projection of a checkout.
    ///
    /// # Errors
    ///
    /// Fails with `CheckoutNotFound`.
    #[instrument(skip(self, params), fields(checkout_id = %params.checkout_id))]
    pub async fn get_checkout(&self, params: GetCheckoutParams) -> Result<CheckoutView> {
        let session = self.registry.get(&CheckoutId::new(params.checkout_id)).await?;
        let session = session.lock().await;
        Ok(CheckoutView::from_session(&session))
    }

    /// Starts payment on a checkout. Idempotent while payment is already
    /// started.
    ///
    /// # Errors
    ///
    /// Fails with `CheckoutNotFound`, `PaymentPreconditionFailed`, or
    /// `SessionFinalized`.
    #[instrument(skip(self, params), fields(checkout_id = %params.checkout_id))]
    pub async fn start_payment(&self, params: StartPaymentParams) -> Result<CheckoutView> {
        info!("starting payment");
        let session = self.registry.get(&CheckoutId::new(params.checkout_id)).await?;
        let mut session = session.lock().await;
        session.start_payment()?;
        Ok(CheckoutView::from_session(&session))
    }

    /// Replaces the customer details on a checkout.
    ///
    /// The loosely-typed address is validated and converted into
    /// [`CustomerDetails`] here, before it reaches the state machine.
    ///
    /// # Errors
    ///
    /// Fails with `CheckoutNotFound`, `InvalidCustomerDetails`, or
    /// `SessionFinalized`.
    #[instrument(skip(self, params), fields(checkout_id = %params.checkout_id))]
    pub async fn update_customer_details(
        &self,
        params: UpdateCustomerDetailsParams,
    ) -> Result<CheckoutView> {
        info!("updating customer details");
        let details = CustomerDetails::new(params.address, params.email)?;
        let session = self.registry.get(&CheckoutId::new(params.checkout_id)).await?;
        let mut session = session.lock().await;
        session.set_customer_details(details)?;
        Ok(CheckoutView::from_session(&session))
    }

    /// Finalizes a checkout, placing an order.
    ///
    /// Completing an already-completed checkout is an idempotent success
    /// that replays the previously created order identifier, so an agent
    /// can safely retry after a transport timeout.
    ///
    /// # Errors
    ///
    /// Fails with `CheckoutNotFound` or `PaymentPreconditionFailed`.
    #[instrument(skip(self, params), fields(checkout_id = %params.checkout_id))]
    pub async fn complete_checkout(
        &self,
        params: CompleteCheckoutParams,
    ) -> Result<OrderConfirmation> {
        info!("completing checkout");
        let session = self.registry.get(&CheckoutId::new(params.checkout_id)).await?;
        let mut session = session.lock().await;

        if let Some(order_id) = session.order_id().cloned() {
            info!(order_id = %order_id, "checkout already completed, replaying confirmation");
            return Ok(OrderConfirmation {
                order_id,
                status: OrderStatus::Placed,
                checkout: CheckoutView::from_session(&session),
            });
        }

        session.ensure_ready_to_complete()?;
        let order = self.ledger.record(&session).await?;
        session.finalize(order.id.clone())?;
        info!(order_id = %order.id, "checkout completed");

        Ok(OrderConfirmation {
            order_id: order.id.clone(),
            status: order.status,
            checkout: CheckoutView::from_session(&session),
        })
    }

    // ------------------------------------------------------------------
    // Resource projections (read-only, no side effects)
    // ------------------------------------------------------------------

    /// Returns the full product catalog (`ucp://catalog/products`).
    #[must_use]
    pub fn catalog_products(&self) -> ProductResults {
        self.catalog.search("")
    }

    /// Returns the capability profile (`ucp://discovery/profile`).
    #[must_use]
    pub fn discovery_profile(&self) -> &DiscoveryProfile {
        &self.profile
    }

    /// Returns the projection of a checkout
    /// (`ucp://checkout/{checkout_id}`).
    ///
    /// # Errors
    ///
    /// Fails with `CheckoutNotFound`.
    pub async fn checkout_resource(&self, checkout_id: &str) -> Result<CheckoutView> {
        let session = self.registry.get(&CheckoutId::new(checkout_id)).await?;
        let session = session.lock().await;
        Ok(CheckoutView::from_session(&session))
    }

    /// Returns the document for a finalized order
    /// (`ucp://orders/{order_id}`).
    ///
    /// # Errors
    ///
    /// Fails with `OrderNotFound`.
    pub async fn order_resource(&self, order_id: &str) -> Result<OrderDocument> {
        let order = self.ledger.lookup(&OrderId::new(order_id)).await?;
        Ok(OrderDocument { order: (*order).clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    fn address() -> PostalAddress {
        PostalAddress {
            name: Some("John Doe".to_owned()),
            street: "123 Main St".to_owned(),
            city: "San Francisco".to_owned(),
            region: Some("CA".to_owned()),
            postal_code: "94105".to_owned(),
            country: "US".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_add_without_id_creates_checkout() {
        let controller = CheckoutController::with_default_catalog();
        let view = controller
            .add_to_checkout(AddToCheckoutParams {
                product_id: "BISC-001".to_owned(),
                quantity: 2,
                checkout_id: None,
            })
            .await
            .unwrap();

        assert_eq!(view.status, CheckoutStatus::Open);
        assert_eq!(view.line_items.len(), 1);
        assert_eq!(view.line_items[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_add_with_unknown_id_fails() {
        let controller = CheckoutController::with_default_catalog();
        let result = controller
            .add_to_checkout(AddToCheckoutParams {
                product_id: "BISC-001".to_owned(),
                quantity: 1,
                checkout_id: Some("chk-unknown".to_owned()),
            })
            .await;

        assert!(matches!(result, Err(StoreError::CheckoutNotFound(_))));
    }

    #[tokio::test]
    async fn test_add_unknown_product_fails_without_creating_session() {
        let controller = CheckoutController::with_default_catalog();
        let result = controller
            .add_to_checkout(AddToCheckoutParams {
                product_id: "BISC-999".to_owned(),
                quantity: 1,
                checkout_id: None,
            })
            .await;

        assert!(matches!(result, Err(StoreError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_projection_total_matches_lines() {
        let controller = CheckoutController::with_default_catalog();
        let view = controller
            .add_to_checkout(AddToCheckoutParams {
                product_id: "BISC-001".to_owned(),
                quantity: 2,
                checkout_id: None,
            })
            .await
            .unwrap();
        let view = controller
            .add_to_checkout(AddToCheckoutParams {
                product_id: "BISC-003".to_owned(),
                quantity: 1,
                checkout_id: Some(view.checkout_id.to_string()),
            })
            .await
            .unwrap();

        let computed: Decimal = view.line_items.iter().map(|l| l.line_total).sum();
        assert_eq!(view.total, computed);
    }

    #[tokio::test]
    async fn test_update_customer_details_validates_at_boundary() {
        let controller = CheckoutController::with_default_catalog();
        let view = controller
            .add_to_checkout(AddToCheckoutParams {
                product_id: "BISC-001".to_owned(),
                quantity: 1,
                checkout_id: None,
            })
            .await
            .unwrap();

        let result = controller
            .update_customer_details(UpdateCustomerDetailsParams {
                checkout_id: view.checkout_id.to_string(),
                address: address(),
                email: "no-at-sign".to_owned(),
            })
            .await;
        assert!(matches!(result, Err(StoreError::InvalidCustomerDetails(_))));

        let view = controller
            .update_customer_details(UpdateCustomerDetailsParams {
                checkout_id: view.checkout_id.to_string(),
                address: address(),
                email: "a@b.com".to_owned(),
            })
            .await
            .unwrap();
        assert!(view.customer.is_some());
    }

    #[tokio::test]
    async fn test_resources_for_unknown_ids_fail() {
        let controller = CheckoutController::with_default_catalog();
        assert!(matches!(
            controller.checkout_resource("chk-unknown").await,
            Err(StoreError::CheckoutNotFound(_))
        ));
        assert!(matches!(
            controller.order_resource("ord-unknown").await,
            Err(StoreError::OrderNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_catalog_resource_lists_all_products() {
        let controller = CheckoutController::with_default_catalog();
        let products = controller.catalog_products();
        assert!(products.results.iter().any(|p| p.id == "BISC-001"));
    }
}
