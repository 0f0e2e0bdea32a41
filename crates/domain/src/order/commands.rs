//! Order command inputs.

use chrono::NaiveDate;
use common::{CustomerId, OrderItemId, ProductId};
use serde::Deserialize;
use validator::Validate;

use crate::catalog::{Sku, UnitOfMeasure};
use crate::error::{DomainError, validation_details};
use crate::money::{MAX_PRICE_CENTS, Money};

use super::{DeliveryOverride, MAX_ITEMS, MAX_LINE_QUANTITY, OrderItem, OrderLine, OrderStatus};

/// Request to create an order.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOrder {
    pub customer_id: CustomerId,
    pub items: Vec<OrderLine>,
    #[serde(default)]
    pub delivery_due: Option<NaiveDate>,
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub notes: Option<String>,
    #[validate(length(max = 200))]
    #[serde(default)]
    pub location: Option<String>,
    /// Initial status; pending when absent.
    #[serde(default)]
    pub status: Option<OrderStatus>,
}

impl CreateOrder {
    /// A request with only customer and lines.
    pub fn new(customer_id: CustomerId, items: Vec<OrderLine>) -> Self {
        Self {
            customer_id,
            items,
            delivery_due: None,
            notes: None,
            location: None,
            status: None,
        }
    }

    /// Sets the delivery due date.
    pub fn due(mut self, date: NaiveDate) -> Self {
        self.delivery_due = Some(date);
        self
    }

    /// Checks shape rules before anything is read or written.
    pub fn check(&self) -> Result<(), DomainError> {
        let mut details = match self.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => validation_details(&errors),
        };

        if self.items.is_empty() || self.items.len() > MAX_ITEMS {
            details.push(format!(
                "items: must contain between 1 and {MAX_ITEMS} lines, got {}",
                self.items.len()
            ));
        }
        for (index, line) in self.items.iter().enumerate() {
            check_line(index, line.quantity, line.unit_price, &mut details);
        }
        if self.status == Some(OrderStatus::Nullified) {
            details.push("status: an order cannot be created nullified".to_string());
        }

        if details.is_empty() {
            Ok(())
        } else {
            Err(DomainError::validation("Invalid order", details))
        }
    }

    /// Returns the initial status.
    pub fn initial_status(&self) -> OrderStatus {
        self.status.unwrap_or_default()
    }
}

/// A full line used when replacing an order's items.
///
/// No catalog lookup is done for these; the caller provides every value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReplacementItem {
    pub product_id: ProductId,
    pub sku: Sku,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
    #[serde(default)]
    pub unit_of_measure: UnitOfMeasure,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ReplacementItem {
    pub(crate) fn into_item(self, status: OrderStatus) -> OrderItem {
        OrderItem {
            id: OrderItemId::new(),
            product_id: self.product_id,
            sku: self.sku,
            product_name: self.product_name,
            quantity: self.quantity,
            unit_price: self.unit_price,
            unit_of_measure: self.unit_of_measure,
            brand: self.brand,
            format: self.format,
            status,
            notes: self.notes,
        }
    }
}

/// Partial update of an order. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub delivery_due: Option<NaiveDate>,
    pub customer_id: Option<CustomerId>,
    pub items: Option<Vec<ReplacementItem>>,
    /// Direct edit of the delivery timestamp; admin only.
    pub delivered_at: Option<DeliveryOverride>,
}

impl OrderUpdate {
    /// True when any header field is present.
    pub fn touches_details(&self) -> bool {
        self.customer_id.is_some()
            || self.delivery_due.is_some()
            || self.notes.is_some()
            || self.location.is_some()
            || self.delivered_at.is_some()
    }

    /// Checks field rules that do not depend on the current order.
    pub fn check(&self) -> Result<(), DomainError> {
        let mut details = match self.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => validation_details(&errors),
        };
        if let Some(items) = &self.items {
            for (index, item) in items.iter().enumerate() {
                check_line(index, item.quantity, Some(item.unit_price), &mut details);
            }
        }

        if details.is_empty() {
            Ok(())
        } else {
            Err(DomainError::validation("Invalid order update", details))
        }
    }
}

/// Bounds one line so its subtotal, and the order total, fit in `i64` cents.
fn check_line(
    index: usize,
    quantity: u32,
    unit_price: Option<Money>,
    details: &mut Vec<String>,
) {
    if quantity == 0 {
        details.push(format!("items[{index}].quantity: must be greater than 0"));
    } else if quantity > MAX_LINE_QUANTITY {
        details.push(format!("items[{index}].quantity: must be at most {MAX_LINE_QUANTITY}"));
    }
    if let Some(price) = unit_price {
        if price.is_negative() {
            details.push(format!("items[{index}].unit_price: must not be negative"));
        } else if price.cents() > MAX_PRICE_CENTS {
            details.push(format!(
                "items[{index}].unit_price: must be at most {MAX_PRICE_CENTS} cents"
            ));
        }
    }
}
