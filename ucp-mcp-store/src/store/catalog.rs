//! Product catalog: read-only view over the store's products.
//!
//! The catalog is loaded once and never mutated afterwards, so it is safe
//! for unlimited concurrent readers without locking. Line items snapshot
//! the catalog price at add time, which keeps historical checkout totals
//! stable even if a redeployed catalog carries different prices.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Product in the store catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique product identifier.
    pub id: String,
    /// Product name.
    pub name: String,
    /// Product description.
    pub description: String,
    /// Unit price.
    pub price: Decimal,
    /// Currency code (ISO 4217).
    pub currency: String,
    /// Merchant-specific metadata.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Result set returned by catalog searches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductResults {
    /// Matching products, in catalog order.
    pub results: Vec<Product>,
}

/// Read-only index over the product catalog.
///
/// Answers search-by-text and lookup-by-identifier queries. Insertion
/// order is preserved, so an empty search returns the full catalog in a
/// stable, deterministic order.
#[derive(Debug)]
pub struct CatalogIndex {
    products: Vec<Product>,
    by_id: HashMap<String, usize>,
}

impl CatalogIndex {
    /// Builds an index over the given products.
    ///
    /// Later entries with a duplicate identifier shadow earlier ones in
    /// lookups but are dropped from the listing.
    #[must_use]
    pub fn new(products: Vec<Product>) -> Self {
        let mut deduped: Vec<Product> = Vec::with_capacity(products.len());
        let mut by_id = HashMap::with_capacity(products.len());
        for product in products {
            if let Some(&position) = by_id.get(&product.id) {
                deduped[position] = product;
            } else {
                by_id.insert(product.id.clone(), deduped.len());
                deduped.push(product);
            }
        }
        Self { products: deduped, by_id }
    }

    /// Builds the default demo catalog shipped with the service.
    #[must_use]
    pub fn with_default_catalog() -> Self {
        Self::new(default_catalog())
    }

    /// Searches products by case-insensitive substring match over name
    /// and description.
    ///
    /// An empty query returns the full catalog.
    #[must_use]
    pub fn search(&self, query: &str) -> ProductResults {
        let query = query.trim().to_lowercase();
        let results = if query.is_empty() {
            self.products.clone()
        } else {
            self.products
                .iter()
                .filter(|p| {
                    p.name.to_lowercase().contains(&query)
                        || p.description.to_lowercase().contains(&query)
                })
                .cloned()
                .collect()
        };
        ProductResults { results }
    }

    /// Looks up a product by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ProductNotFound`] if the identifier is
    /// absent from the catalog.
    pub fn lookup(&self, product_id: &str) -> Result<&Product> {
        self.by_id
            .get(product_id)
            .map(|&position| &self.products[position])
            .ok_or_else(|| StoreError::ProductNotFound(product_id.to_owned()))
    }

    /// Returns the number of products in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Returns `true` if the catalog holds no products.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

/// Seed products for the default demo catalog.
fn default_catalog() -> Vec<Product> {
    fn product(id: &str, name: &str, description: &str, cents: i64) -> Product {
        Product {
            id: id.to_owned(),
            name: name.to_owned(),
            description: description.to_owned(),
            price: Decimal::new(cents, 2),
            currency: "USD".to_owned(),
            metadata: serde_json::Value::Null,
        }
    }

    vec![
        product(
            "BISC-001",
            "Chocolate Chip Cookies",
            "Classic cookies baked with dark chocolate chunks, box of 12.",
            549,
        ),
        product(
            "BISC-002",
            "Oatmeal Raisin Cookies",
            "Chewy oatmeal cookies with sun-dried raisins, box of 12.",
            499,
        ),
        product(
            "BISC-003",
            "Ginger Snaps",
            "Thin and crisp spiced biscuits, tin of 24.",
            375,
        ),
        product(
            "BISC-004",
            "Shortbread Fingers",
            "All-butter shortbread fingers, tin of 10.",
            625,
        ),
        product(
            "BISC-005",
            "Double Chocolate Biscotti",
            "Twice-baked Italian biscuits with cocoa and chocolate drizzle.",
            710,
        ),
        product(
            "BISC-006",
            "Lemon Wafers",
            "Light wafer biscuits with a tangy lemon cream filling.",
            425,
        ),
    ]
}
