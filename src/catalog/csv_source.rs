//! CSV-backed catalog, loaded lazily on first use and cached for the
//! lifetime of the process.

use std::io::Read;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::info;

use super::{Product, ProductRepository};
use crate::error::CatalogError;

pub struct CsvCatalog {
    path: PathBuf,
    products: OnceCell<Arc<[Product]>>,
}

#[derive(Debug, Deserialize)]
struct ProductRow {
    #[serde(default)]
    product_id: String,
    #[serde(default)]
    product_name: String,
    #[serde(default)]
    brand_name: Option<String>,
    #[serde(default)]
    ingredients: String,
    #[serde(default)]
    price_usd: Option<String>,
    #[serde(default)]
    primary_category: Option<String>,
    #[serde(default)]
    secondary_category: Option<String>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            product_id: row.product_id,
            product_name: row.product_name,
            ingredients: parse_ingredients_cell(&row.ingredients),
            price_usd: row
                .price_usd
                .as_deref()
                .and_then(|p| Decimal::from_str(p.trim()).ok())
                .filter(|p| !p.is_zero()),
            brand_name: row.brand_name.filter(|s| !s.is_empty()),
            primary_category: row.primary_category.filter(|s| !s.is_empty()),
            secondary_category: row.secondary_category.filter(|s| !s.is_empty()),
        }
    }
}

/// The ingredients cell is a bracketed list, optionally quoted:
/// `['Water', 'Niacinamide']` or `[Water, Niacinamide]`.
pub fn parse_ingredients_cell(cell: &str) -> Vec<String> {
    let inner = cell
        .trim()
        .trim_matches('"')
        .trim_matches('\'')
        .trim_start_matches('[')
        .trim_end_matches(']');
    inner
        .split(',')
        .map(|part| part.trim().trim_matches('\'').trim_matches('"').trim())
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect()
}

pub(crate) fn parse_products<R: Read>(reader: R) -> Result<Vec<Product>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let mut products = Vec::new();

    for record in csv_reader.deserialize::<ProductRow>() {
        let row = record?;
        products.push(Product::from(row));
    }

    Ok(products)
}

impl CsvCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            products: OnceCell::new(),
        }
    }

    async fn load(&self) -> Result<Arc<[Product]>, CatalogError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| CatalogError::LoadFailed {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })?;
        let products = parse_products(bytes.as_slice())?;
        info!(
            path = %self.path.display(),
            count = products.len(),
            "Product catalog loaded"
        );
        Ok(products.into())
    }
}

#[async_trait]
impl ProductRepository for CsvCatalog {
    async fn all(&self) -> Result<Arc<[Product]>, CatalogError> {
        let products = self.products.get_or_try_init(|| self.load()).await?;
        Ok(Arc::clone(products))
    }
}
