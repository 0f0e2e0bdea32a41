//! Order lifecycle status.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::OrderError;

/// The lifecycle stage of an order.
///
/// ```text
/// Pending ◄──► Purchasing ◄──► Invoiced ──► (delivered_at set)
///    │              │
///    └──────────────┴──► Nullified   (after 7 days)
/// ```
///
/// `ChangeStatus` may move freely between any two statuses; the guarded
/// paths are `MarkDelivered` (invoiced only) and `Nullify` (pending or
/// purchasing, and old enough).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OrderStatus {
    #[default]
    #[serde(rename = "pendiente", alias = "pending")]
    Pending,

    #[serde(rename = "compra", alias = "purchasing")]
    Purchasing,

    #[serde(rename = "facturado", alias = "invoiced")]
    Invoiced,

    #[serde(rename = "nulo", alias = "nullified")]
    Nullified,
}

impl OrderStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Purchasing,
        OrderStatus::Invoiced,
        OrderStatus::Nullified,
    ];

    /// Statuses that still accept merges and nullification.
    pub const OPEN: [OrderStatus; 2] = [OrderStatus::Pending, OrderStatus::Purchasing];

    /// Returns true for pending and purchasing.
    pub fn is_open(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Purchasing)
    }

    /// Returns the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pendiente",
            OrderStatus::Purchasing => "compra",
            OrderStatus::Invoiced => "facturado",
            OrderStatus::Nullified => "nulo",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pendiente" | "pending" => Ok(OrderStatus::Pending),
            "compra" | "purchasing" => Ok(OrderStatus::Purchasing),
            "facturado" | "invoiced" => Ok(OrderStatus::Invoiced),
            "nulo" | "nullified" => Ok(OrderStatus::Nullified),
            _ => Err(OrderError::InvalidStatus(s.to_string())),
        }
    }
}
