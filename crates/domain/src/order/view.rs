//! Read shape of an order with its derived properties.

use chrono::NaiveDate;
use serde::Serialize;

use crate::money::Money;

use super::Order;

/// An order plus the values computed from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub total: Money,
    pub item_count: usize,
    pub is_overdue: bool,
    pub is_pending_delivery: bool,
    pub is_delivered: bool,
}

impl OrderView {
    /// Computes the derived properties as of `today`.
    pub fn new(order: Order, today: NaiveDate) -> Self {
        Self {
            total: order.total(),
            item_count: order.item_count(),
            is_overdue: order.is_overdue(today),
            is_pending_delivery: order.is_pending_delivery(),
            is_delivered: order.is_delivered(),
            order,
        }
    }
}
