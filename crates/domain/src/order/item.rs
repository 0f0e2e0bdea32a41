//! Order line items.

use common::{OrderItemId, ProductId};
use serde::{Deserialize, Serialize};

use crate::catalog::{Product, Sku, UnitOfMeasure};
use crate::money::Money;

use super::OrderStatus;

/// A line embedded in an order.
///
/// Product attributes are copied at order time so later catalog edits do
/// not rewrite order history. `status` mirrors the order status and is
/// only written by the order's `apply`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub sku: Sku,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub unit_of_measure: UnitOfMeasure,
    pub brand: Option<String>,
    pub format: Option<String>,
    pub status: OrderStatus,
    pub notes: Option<String>,
}

impl OrderItem {
    /// Builds a line from an incoming request line, filling gaps from the product.
    pub fn from_line(line: &OrderLine, product: &Product) -> Self {
        Self {
            id: OrderItemId::new(),
            product_id: product.id,
            sku: product.sku.clone(),
            product_name: product.name.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price.unwrap_or(product.price),
            unit_of_measure: line.unit_of_measure.unwrap_or(product.unit_of_measure),
            brand: line.brand.clone().or_else(|| product.brand.clone()),
            format: line.format.clone().or_else(|| product.format.clone()),
            status: OrderStatus::default(),
            notes: line.notes.clone(),
        }
    }

    /// Returns `quantity × unit_price`.
    pub fn subtotal(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// A line in a create-order request.
///
/// Only product and quantity are required; the rest defaults to the
/// product's current catalog values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(default)]
    pub unit_price: Option<Money>,
    #[serde(default)]
    pub unit_of_measure: Option<UnitOfMeasure>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl OrderLine {
    /// A line with only product and quantity set.
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
            unit_price: None,
            unit_of_measure: None,
            brand: None,
            format: None,
            notes: None,
        }
    }
}
