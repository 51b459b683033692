//! Checkout session state machine.
//!
//! A [`CheckoutSession`] is the cart/order-in-progress for one checkout
//! identifier. Its lifecycle only moves forward:
//!
//! ```text
//! Open ──► PaymentStarted ──► Completed
//! ```
//!
//! `Completed` is terminal: once reached, no further mutation of line
//! items, customer details, or payment state is permitted. Retry-prone
//! operations are explicit success paths rather than errors — removing
//! an absent item, re-starting an already started payment, and
//! re-completing a completed checkout all succeed so that an agent can
//! safely retry after an ambiguous transport failure.
//!
//! The session performs no I/O and takes no locks; callers (the
//! registry/controller) serialize access per checkout identifier.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rmcp::schemars;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::store::catalog::Product;
use crate::store::ledger::OrderId;

/// Opaque identifier for a checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckoutId(String);

impl CheckoutId {
    /// Wraps a caller-supplied identifier.
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// Generates a fresh unique identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("chk-{}", uuid::Uuid::new_v4()))
    }

    /// Returns the inner string reference.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CheckoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Structured shipping address supplied by the buyer.
///
/// Crosses the tool boundary as-is; validation happens when the address
/// is combined with an email into [`CustomerDetails`].
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PostalAddress {
    /// Recipient name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Street address line.
    pub street: String,
    /// City.
    pub city: String,
    /// State, province, or region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Postal code.
    pub postal_code: String,
    /// Country code (ISO 3166-1 alpha-2).
    pub country: String,
}

/// Validated buyer details: shipping address plus contact email.
///
/// Mutable by replacement only — each `update_customer_details` call
/// supplies the full address again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerDetails {
    /// Shipping address.
    pub address: PostalAddress,
    /// Buyer email address.
    pub email: String,
}

impl CustomerDetails {
    /// Validates and combines an address and email into customer details.
    ///
    /// The address must carry a non-empty street, city, postal code, and
    /// country; the email must contain an `@`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidCustomerDetails`] describing the
    /// first missing field.
    pub fn new(address: PostalAddress, email: String) -> Result<Self> {
        let required = [
            ("street", &address.street),
            ("city", &address.city),
            ("postal_code", &address.postal_code),
            ("country", &address.country),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(StoreError::InvalidCustomerDetails(format!(
                    "address field '{field}' must not be empty"
                )));
            }
        }
        if !email.contains('@') {
            return Err(StoreError::InvalidCustomerDetails(format!(
                "email '{email}' is not a valid address"
            )));
        }
        Ok(Self { address, email })
    }
}

/// Payment progress for a checkout session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    /// Payment has not been initiated.
    NotStarted,
    /// Payment has been started and awaits completion.
    InProgress,
    /// Payment was authorized when the checkout completed.
    Authorized,
}

/// Lifecycle state of a checkout session.
///
/// Only ever advances forward; `Completed` has no outgoing transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStatus {
    /// Accepting item and customer-detail mutations.
    Open,
    /// Payment started; completion is permitted.
    PaymentStarted,
    /// Finalized into an order. Terminal.
    Completed,
}

/// Single cart line: one product with quantity and price snapshot.
///
/// The unit price and name are captured from the catalog when the line
/// is created, insulating the checkout total from later catalog changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    /// Product identifier.
    pub product_id: String,
    /// Product name at add time.
    pub name: String,
    /// Unit price at add time.
    pub unit_price: Decimal,
    /// Quantity, always ≥ 1.
    pub quantity: u32,
}

impl LineItem {
    /// Returns `quantity × unit_price` for this line.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// The state machine for one cart.
///
/// All mutating operations require the session to not be `Completed` and
/// fail with [`StoreError::SessionFinalized`] otherwise. See the module
/// docs for the retry-tolerant success paths.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    id: CheckoutId,
    line_items: BTreeMap<String, LineItem>,
    customer: Option<CustomerDetails>,
    payment_state: PaymentState,
    status: CheckoutStatus,
    order_id: Option<OrderId>,
    currency: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CheckoutSession {
    /// Creates an empty open session under the given identifier.
    #[must_use]
    pub fn new(id: CheckoutId) -> Self {
        let now = Utc::now();
        Self {
            id,
            line_items: BTreeMap::new(),
            customer: None,
            payment_state: PaymentState::NotStarted,
            status: CheckoutStatus::Open,
            order_id: None,
            currency: "USD".to_owned(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the checkout identifier.
    #[must_use]
    pub fn id(&self) -> &CheckoutId {
        &self.id
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn status(&self) -> CheckoutStatus {
        self.status
    }

    /// Returns the payment state.
    #[must_use]
    pub fn payment_state(&self) -> PaymentState {
        self.payment_state
    }

    /// Returns the current line items, keyed by product identifier.
    #[must_use]
    pub fn line_items(&self) -> &BTreeMap<String, LineItem> {
        &self.line_items
    }

    /// Returns the customer details, if set.
    #[must_use]
    pub fn customer(&self) -> Option<&CustomerDetails> {
        self.customer.as_ref()
    }

    /// Returns the order created when this session completed, if any.
    #[must_use]
    pub fn order_id(&self) -> Option<&OrderId> {
        self.order_id.as_ref()
    }

    /// Returns the currency all line prices are denominated in.
    #[must_use]
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Returns when the session was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the session was last mutated.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Computes the total as `Σ quantity × snapshot unit price`.
    ///
    /// The total is always recomputed from line items and never stored
    /// independently of them.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.line_items.values().map(LineItem::line_total).sum()
    }

    /// Adds a product to the cart, incrementing the quantity if a line
    /// for it already exists.
    ///
    /// A new line snapshots the product's current name and price; an
    /// existing line keeps its original snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SessionFinalized`] on a completed session,
    /// or [`StoreError::InvalidQuantity`] if `quantity < 1` or the line
    /// quantity would overflow.
    pub fn add_item(&mut self, product: &Product, quantity: i64) -> Result<()> {
        self.ensure_active()?;
        let added = positive_quantity(quantity)?;
        if let Some(line) = self.line_items.get_mut(&product.id) {
            line.quantity = line
                .quantity
                .checked_add(added)
                .ok_or(StoreError::InvalidQuantity(quantity))?;
        } else {
            self.line_items.insert(product.id.clone(), LineItem {
                product_id: product.id.clone(),
                name: product.name.clone(),
                unit_price: product.price,
                quantity: added,
            });
        }
        self.touch();
        Ok(())
    }

    /// Removes the line item for a product.
    ///
    /// Removing an absent product is a no-op success: the desired state
    /// is already achieved, so retries stay safe.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SessionFinalized`] on a completed session.
    pub fn remove_item(&mut self, product_id: &str) -> Result<()> {
        self.ensure_active()?;
        if self.line_items.remove(product_id).is_some() {
            self.touch();
        }
        Ok(())
    }

    /// Sets the line item for a product to an exact quantity.
    ///
    /// A quantity ≤ 0 is equivalent to [`Self::remove_item`]. Unlike
    /// adding, updating never creates a line.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SessionFinalized`] on a completed session,
    /// [`StoreError::ItemNotFound`] if the product has no existing line,
    /// or [`StoreError::InvalidQuantity`] if the quantity does not fit.
    pub fn update_item(&mut self, product_id: &str, quantity: i64) -> Result<()> {
        self.ensure_active()?;
        if quantity <= 0 {
            return self.remove_item(product_id);
        }
        let target = positive_quantity(quantity)?;
        let line = self
            .line_items
            .get_mut(product_id)
            .ok_or_else(|| StoreError::ItemNotFound(product_id.to_owned()))?;
        line.quantity = target;
        self.touch();
        Ok(())
    }

    /// Replaces the customer details wholesale.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SessionFinalized`] on a completed session.
    pub fn set_customer_details(&mut self, details: CustomerDetails) -> Result<()> {
        self.ensure_active()?;
        self.customer = Some(details);
        self.touch();
        Ok(())
    }

    /// Starts payment, transitioning the lifecycle to `PaymentStarted`.
    ///
    /// Calling this while payment is already started is an idempotent
    /// success returning the current state unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SessionFinalized`] on a completed session,
    /// or [`StoreError::PaymentPreconditionFailed`] if customer details
    /// are missing or the cart is empty.
    pub fn start_payment(&mut self) -> Result<()> {
        self.ensure_active()?;
        if self.status == CheckoutStatus::PaymentStarted {
            return Ok(());
        }
        if self.customer.is_none() {
            return Err(StoreError::PaymentPreconditionFailed(
                "customer details must be set before starting payment".to_owned(),
            ));
        }
        if self.line_items.is_empty() {
            return Err(StoreError::PaymentPreconditionFailed(
                "checkout has no line items".to_owned(),
            ));
        }
        self.status = CheckoutStatus::PaymentStarted;
        self.payment_state = PaymentState::InProgress;
        self.touch();
        Ok(())
    }

    /// Verifies that the session can transition to `Completed`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::PaymentPreconditionFailed`] if payment has
    /// not been started or the cart is empty.
    pub fn ensure_ready_to_complete(&self) -> Result<()> {
        if self.status != CheckoutStatus::PaymentStarted {
            return Err(StoreError::PaymentPreconditionFailed(
                "payment must be started before completing the checkout".to_owned(),
            ));
        }
        if self.line_items.is_empty() {
            return Err(StoreError::PaymentPreconditionFailed(
                "checkout has no line items".to_owned(),
            ));
        }
        Ok(())
    }

    /// Finalizes the session into the terminal `Completed` state,
    /// recording the order it produced.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::PaymentPreconditionFailed`] if the session
    /// is not ready to complete (see [`Self::ensure_ready_to_complete`]).
    pub fn finalize(&mut self, order_id: OrderId) -> Result<()> {
        self.ensure_ready_to_complete()?;
        self.status = CheckoutStatus::Completed;
        self.payment_state = PaymentState::Authorized;
        self.order_id = Some(order_id);
        self.touch();
        Ok(())
    }

    fn ensure_active(&self) -> Result<()> {
        if self.status == CheckoutStatus::Completed {
            return Err(StoreError::SessionFinalized(self.id.to_string()));
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Converts a caller-supplied quantity into the internal representation,
/// rejecting anything below 1.
fn positive_quantity(quantity: i64) -> Result<u32> {
    u32::try_from(quantity)
        .ok()
        .filter(|q| *q >= 1)
        .ok_or(StoreError::InvalidQuantity(quantity))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn biscuit(id: &str, cents: i64) -> Product {
        Product {
            id: id.to_owned(),
            name: format!("Biscuit {id}"),
            description: "test biscuit".to_owned(),
            price: Decimal::new(cents, 2),
            currency: "USD".to_owned(),
            metadata: serde_json::Value::Null,
        }
    }

    fn details() -> CustomerDetails {
        CustomerDetails::new(
            PostalAddress {
                name: Some("John Doe".to_owned()),
                street: "123 Main St".to_owned(),
                city: "San Francisco".to_owned(),
                region: Some("CA".to_owned()),
                postal_code: "94105".to_owned(),
                country: "US".to_owned(),
            },
            "john@example.com".to_owned(),
        )
        .unwrap()
    }

    #[test]
    fn test_add_item_snapshots_price_and_name() {
        let mut session = CheckoutSession::new(CheckoutId::generate());
        session.add_item(&biscuit("BISC-001", 549), 2).unwrap();

        let line = &session.line_items()["BISC-001"];
        assert_eq!(line.quantity, 2);
        assert_eq!(line.unit_price, Decimal::new(549, 2));
        assert_eq!(session.total(), Decimal::new(1098, 2));
    }

    #[test]
    fn test_add_same_product_increments_single_line() {
        let mut session = CheckoutSession::new(CheckoutId::generate());
        let product = biscuit("BISC-001", 549);
        session.add_item(&product, 2).unwrap();
        session.add_item(&product, 3).unwrap();

        assert_eq!(session.line_items().len(), 1);
        assert_eq!(session.line_items()["BISC-001"].quantity, 5);
    }

    #[test]
    fn test_existing_line_keeps_snapshot_after_price_change() {
        let mut session = CheckoutSession::new(CheckoutId::generate());
        session.add_item(&biscuit("BISC-001", 549), 1).unwrap();

        // Same product at a new catalog price: quantity accumulates on
        // the original snapshot.
        session.add_item(&biscuit("BISC-001", 999), 2).unwrap();

        let line = &session.line_items()["BISC-001"];
        assert_eq!(line.quantity, 3);
        assert_eq!(line.unit_price, Decimal::new(549, 2));
        assert_eq!(session.total(), Decimal::new(1647, 2));
    }

    #[test]
    fn test_add_item_rejects_non_positive_quantity() {
        let mut session = CheckoutSession::new(CheckoutId::generate());
        let product = biscuit("BISC-001", 549);

        assert!(matches!(
            session.add_item(&product, 0),
            Err(StoreError::InvalidQuantity(0))
        ));
        assert!(matches!(
            session.add_item(&product, -4),
            Err(StoreError::InvalidQuantity(-4))
        ));
        assert!(session.line_items().is_empty());
    }

    #[test]
    fn test_add_item_rejects_quantity_overflow() {
        let mut session = CheckoutSession::new(CheckoutId::generate());
        let product = biscuit("BISC-001", 549);
        session.add_item(&product, i64::from(u32::MAX)).unwrap();

        assert!(matches!(
            session.add_item(&product, 1),
            Err(StoreError::InvalidQuantity(1))
        ));
    }

    #[test]
    fn test_remove_absent_item_is_idempotent() {
        let mut session = CheckoutSession::new(CheckoutId::generate());
        assert!(session.remove_item("BISC-404").is_ok());
    }

    #[test]
    fn test_update_zero_equals_remove() {
        let product = biscuit("BISC-001", 549);

        let mut updated = CheckoutSession::new(CheckoutId::generate());
        updated.add_item(&product, 2).unwrap();
        updated.update_item("BISC-001", 0).unwrap();

        let mut removed = CheckoutSession::new(CheckoutId::generate());
        removed.add_item(&product, 2).unwrap();
        removed.remove_item("BISC-001").unwrap();

        assert_eq!(updated.line_items().len(), removed.line_items().len());
        assert_eq!(updated.total(), removed.total());
    }

    #[test]
    fn test_update_negative_removes_line() {
        let mut session = CheckoutSession::new(CheckoutId::generate());
        session.add_item(&biscuit("BISC-001", 549), 2).unwrap();
        session.update_item("BISC-001", -1).unwrap();
        assert!(session.line_items().is_empty());
    }

    #[test]
    fn test_update_sets_exact_quantity() {
        let mut session = CheckoutSession::new(CheckoutId::generate());
        session.add_item(&biscuit("BISC-001", 549), 2).unwrap();
        session.update_item("BISC-001", 7).unwrap();
        assert_eq!(session.line_items()["BISC-001"].quantity, 7);
    }

    #[test]
    fn test_update_does_not_create_lines() {
        let mut session = CheckoutSession::new(CheckoutId::generate());
        assert!(matches!(
            session.update_item("BISC-001", 3),
            Err(StoreError::ItemNotFound(_))
        ));
    }

    #[test]
    fn test_start_payment_requires_customer_details() {
        let mut session = CheckoutSession::new(CheckoutId::generate());
        session.add_item(&biscuit("BISC-001", 549), 1).unwrap();

        assert!(matches!(
            session.start_payment(),
            Err(StoreError::PaymentPreconditionFailed(_))
        ));

        session.set_customer_details(details()).unwrap();
        session.start_payment().unwrap();
        assert_eq!(session.status(), CheckoutStatus::PaymentStarted);
        assert_eq!(session.payment_state(), PaymentState::InProgress);
    }

    #[test]
    fn test_start_payment_requires_line_items() {
        let mut session = CheckoutSession::new(CheckoutId::generate());
        session.set_customer_details(details()).unwrap();

        assert!(matches!(
            session.start_payment(),
            Err(StoreError::PaymentPreconditionFailed(_))
        ));
    }

    #[test]
    fn test_start_payment_is_idempotent() {
        let mut session = CheckoutSession::new(CheckoutId::generate());
        session.add_item(&biscuit("BISC-001", 549), 1).unwrap();
        session.set_customer_details(details()).unwrap();

        session.start_payment().unwrap();
        session.start_payment().unwrap();
        assert_eq!(session.status(), CheckoutStatus::PaymentStarted);
    }

    #[test]
    fn test_complete_requires_payment_started() {
        let mut session = CheckoutSession::new(CheckoutId::generate());
        session.add_item(&biscuit("BISC-001", 549), 1).unwrap();
        session.set_customer_details(details()).unwrap();

        assert!(matches!(
            session.ensure_ready_to_complete(),
            Err(StoreError::PaymentPreconditionFailed(_))
        ));
    }

    #[test]
    fn test_finalize_reaches_terminal_state() {
        let mut session = CheckoutSession::new(CheckoutId::generate());
        let product = biscuit("BISC-001", 549);
        session.add_item(&product, 1).unwrap();
        session.set_customer_details(details()).unwrap();
        session.start_payment().unwrap();
        session.finalize(OrderId::generate()).unwrap();

        assert_eq!(session.status(), CheckoutStatus::Completed);
        assert_eq!(session.payment_state(), PaymentState::Authorized);
        assert!(session.order_id().is_some());

        // Every mutation on the finalized session is rejected.
        assert!(matches!(
            session.add_item(&product, 1),
            Err(StoreError::SessionFinalized(_))
        ));
        assert!(matches!(
            session.remove_item("BISC-001"),
            Err(StoreError::SessionFinalized(_))
        ));
        assert!(matches!(
            session.update_item("BISC-001", 2),
            Err(StoreError::SessionFinalized(_))
        ));
        assert!(matches!(
            session.set_customer_details(details()),
            Err(StoreError::SessionFinalized(_))
        ));
        assert!(matches!(
            session.start_payment(),
            Err(StoreError::SessionFinalized(_))
        ));
    }

    #[test]
    fn test_customer_details_validation() {
        let valid = PostalAddress {
            name: None,
            street: "1 High St".to_owned(),
            city: "London".to_owned(),
            region: None,
            postal_code: "SW1A 1AA".to_owned(),
            country: "GB".to_owned(),
        };

        assert!(CustomerDetails::new(valid.clone(), "a@b.com".to_owned()).is_ok());
        assert!(matches!(
            CustomerDetails::new(valid.clone(), "not-an-email".to_owned()),
            Err(StoreError::InvalidCustomerDetails(_))
        ));

        let mut missing_city = valid;
        missing_city.city = "  ".to_owned();
        assert!(matches!(
            CustomerDetails::new(missing_city, "a@b.com".to_owned()),
            Err(StoreError::InvalidCustomerDetails(_))
        ));
    }

    #[test]
    fn test_total_over_multiple_lines() {
        let mut session = CheckoutSession::new(CheckoutId::generate());
        session.add_item(&biscuit("BISC-001", 549), 2).unwrap();
        session.add_item(&biscuit("BISC-003", 375), 1).unwrap();

        assert_eq!(session.total(), Decimal::new(549 * 2 + 375, 2));
    }

    #[test]
    fn test_status_serialization_is_snake_case() {
        let json = serde_json::to_string(&CheckoutStatus::PaymentStarted).unwrap();
        assert_eq!(json, "\"payment_started\"");
        let json = serde_json::to_string(&PaymentState::NotStarted).unwrap();
        assert_eq!(json, "\"not_started\"");
    }

    proptest! {
        /// For any sequence of adds of the same product, the resulting
        /// quantity is exactly the sum of the added quantities, on a
        /// single line.
        #[test]
        fn prop_add_quantities_accumulate(
            quantities in proptest::collection::vec(1u32..500, 1..12)
        ) {
            let product = biscuit("BISC-001", 549);
            let mut session = CheckoutSession::new(CheckoutId::generate());
            let mut expected: u64 = 0;
            for quantity in &quantities {
                session.add_item(&product, i64::from(*quantity)).unwrap();
                expected += u64::from(*quantity);
            }
            prop_assert_eq!(session.line_items().len(), 1);
            prop_assert_eq!(
                u64::from(session.line_items()["BISC-001"].quantity),
                expected
            );
        }
    }
}
