use crate::error::ShopError;
use crate::product::{Product, ProductId};

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::warn;

/// The set of sellable products, keyed and iterated by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    products: BTreeMap<ProductId, Product>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog keeping the first product seen for each id.
    pub fn from_products(products: impl IntoIterator<Item = Product>) -> Self {
        let mut catalog = Self::new();
        for product in products {
            if !catalog.insert(product.clone()) {
                warn!("Skipping duplicate product id {}", product.id);
            }
        }
        catalog
    }

    /// Default stock used when a fresh data directory is seeded.
    pub fn sample() -> Self {
        Self::from_products([
            Product::new("1", "Hoodie", Decimal::from(1500), 10),
            Product::new("2", "Jeans", Decimal::from(2000), 5),
            Product::new("3", "Sneakers", Decimal::from(3000), 8),
            Product::new("4", "T-Shirt", Decimal::from(800), 15),
        ])
    }

    /// Returns false and leaves the catalog untouched if the id is taken.
    pub fn insert(&mut self, product: Product) -> bool {
        if self.products.contains_key(&product.id) {
            return false;
        }
        self.products.insert(product.id.clone(), product);
        true
    }

    pub fn find(&self, id: &ProductId) -> Result<&Product, ShopError> {
        self.products
            .get(id)
            .ok_or_else(|| ShopError::ProductNotFound(id.clone()))
    }

    pub fn get(&self, id: &ProductId) -> Option<&Product> {
        self.products.get(id)
    }

    /// Applies `delta` to the stock of `id` and returns the new stock level.
    pub fn adjust_stock(&mut self, id: &ProductId, delta: i64) -> Result<u32, ShopError> {
        let product = self
            .products
            .get_mut(id)
            .ok_or_else(|| ShopError::ProductNotFound(id.clone()))?;

        let next = i64::from(product.stock)
            .checked_add(delta)
            .ok_or(ShopError::InvalidQuantity(delta))?;
        if next < 0 {
            return Err(ShopError::InsufficientStock {
                product: id.clone(),
                requested: delta.checked_neg().ok_or(ShopError::InvalidQuantity(delta))?,
                available: product.stock,
            });
        }

        product.stock = u32::try_from(next).map_err(|_| ShopError::InvalidQuantity(delta))?;
        Ok(product.stock)
    }

    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}
