//! Catalog items and cart line items.

use gomarket_core::{DomainError, DomainResult, ProductId};
use serde::{Deserialize, Serialize};

/// A catalog entry as the marketplace offers it: the product descriptor
/// without a quantity.
///
/// Every field except `id` is opaque to the cart. Title and image URL are
/// display payload, and `price` is only ever summed for display totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ProductId,
    pub title: String,
    pub image_url: String,
    /// Unit price in smallest currency unit (e.g., cents).
    pub price: u64,
}

impl CatalogItem {
    /// Build a catalog item from a raw identifier, validating it.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        image_url: impl Into<String>,
        price: u64,
    ) -> DomainResult<Self> {
        Ok(Self {
            id: ProductId::new(id)?,
            title: title.into(),
            image_url: image_url.into(),
            price,
        })
    }
}

/// A catalog entry plus the quantity currently held in the cart.
///
/// The serialized shape is the persisted wire format: a flat object with
/// `id`, `title`, `image_url`, `price` and `quantity` fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: ProductId,
    pub title: String,
    pub image_url: String,
    /// Unit price in smallest currency unit (e.g., cents).
    pub price: u64,
    /// Always >= 1 while the item is present in the cart.
    pub quantity: u32,
}

impl LineItem {
    /// First occurrence of a catalog item in the cart: quantity starts at 1.
    pub fn from_catalog(item: CatalogItem) -> Self {
        Self {
            id: item.id,
            title: item.title,
            image_url: item.image_url,
            price: item.price,
            quantity: 1,
        }
    }

    /// Build a line item with an explicit quantity (must be >= 1).
    pub fn with_quantity(item: CatalogItem, quantity: u32) -> DomainResult<Self> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be at least 1"));
        }
        let mut line = Self::from_catalog(item);
        line.quantity = quantity;
        Ok(line)
    }

    /// Line total for display: `price * quantity`, saturating.
    pub fn line_total(&self) -> u64 {
        self.price.saturating_mul(u64::from(self.quantity))
    }
}
