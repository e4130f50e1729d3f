//! Product catalog: read-only repository plus ingredient matching.

pub mod csv_source;
pub mod matcher;

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

pub use csv_source::CsvCatalog;
pub use matcher::{
    CatalogMatcher, FindOptions, ProductScore, filter_suitable, remove_allergens,
    score_by_suitability,
};

/// A catalog product. Ingredient names are lowercased at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: String,
    pub product_name: String,
    pub ingredients: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_usd: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_category: Option<String>,
}

impl Product {
    pub fn new(id: impl Into<String>, name: impl Into<String>, ingredients: &[&str]) -> Self {
        Self {
            product_id: id.into(),
            product_name: name.into(),
            ingredients: ingredients.iter().map(|i| i.to_lowercase()).collect(),
            price_usd: None,
            brand_name: None,
            primary_category: None,
            secondary_category: None,
        }
    }

    /// Substring match against every ingredient.
    pub fn contains_ingredient(&self, needle: &str) -> bool {
        self.ingredients.iter().any(|ing| ing.contains(needle))
    }
}

/// Read-only product source. Implementations load at most once per process.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn all(&self) -> Result<Arc<[Product]>, CatalogError>;
}

/// Fixed product list, used by tests and when no catalog file is present.
pub struct InMemoryCatalog {
    products: Arc<[Product]>,
}

impl InMemoryCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self {
            products: products.into(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl ProductRepository for InMemoryCatalog {
    async fn all(&self) -> Result<Arc<[Product]>, CatalogError> {
        Ok(Arc::clone(&self.products))
    }
}
