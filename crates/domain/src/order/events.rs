//! Order domain events.

use chrono::{DateTime, NaiveDate, Utc};
use common::{CustomerId, OrderId, OrderItemId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::{OrderItem, OrderNumber, OrderStatus};

/// Events that can occur on an order aggregate.
///
/// Every event carries the acting user and the instant it was decided,
/// which `apply` records as `updated_by` / `updated_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// A new order was placed.
    OrderPlaced(OrderPlacedData),

    /// An incoming line was folded into an existing line.
    LineQuantityMerged(LineQuantityMergedData),

    /// The order moved to another status.
    StatusChanged(StatusChangedData),

    /// The order was marked as delivered.
    DeliveryMarked(DeliveryMarkedData),

    /// The order was nullified.
    OrderNullified(OrderNullifiedData),

    /// Header fields were edited.
    DetailsUpdated(DetailsUpdatedData),

    /// The item list was replaced wholesale.
    ItemsReplaced(ItemsReplacedData),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "OrderPlaced",
            OrderEvent::LineQuantityMerged(_) => "LineQuantityMerged",
            OrderEvent::StatusChanged(_) => "StatusChanged",
            OrderEvent::DeliveryMarked(_) => "DeliveryMarked",
            OrderEvent::OrderNullified(_) => "OrderNullified",
            OrderEvent::DetailsUpdated(_) => "DetailsUpdated",
            OrderEvent::ItemsReplaced(_) => "ItemsReplaced",
        }
    }
}

impl OrderEvent {
    /// Returns the acting user.
    pub fn actor(&self) -> UserId {
        match self {
            OrderEvent::OrderPlaced(d) => d.by,
            OrderEvent::LineQuantityMerged(d) => d.by,
            OrderEvent::StatusChanged(d) => d.by,
            OrderEvent::DeliveryMarked(d) => d.by,
            OrderEvent::OrderNullified(d) => d.by,
            OrderEvent::DetailsUpdated(d) => d.by,
            OrderEvent::ItemsReplaced(d) => d.by,
        }
    }

    /// Returns when the event was decided.
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderPlaced(d) => d.at,
            OrderEvent::LineQuantityMerged(d) => d.at,
            OrderEvent::StatusChanged(d) => d.at,
            OrderEvent::DeliveryMarked(d) => d.at,
            OrderEvent::OrderNullified(d) => d.at,
            OrderEvent::DetailsUpdated(d) => d.at,
            OrderEvent::ItemsReplaced(d) => d.at,
        }
    }
}

/// Data for OrderPlaced event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPlacedData {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub customer_id: CustomerId,
    pub items: Vec<OrderItem>,
    pub status: OrderStatus,
    pub delivery_due: Option<NaiveDate>,
    pub notes: Option<String>,
    pub location: Option<String>,
    pub by: UserId,
    pub at: DateTime<Utc>,
}

/// Data for LineQuantityMerged event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineQuantityMergedData {
    pub item_id: OrderItemId,
    pub product_id: ProductId,
    pub previous_quantity: u32,
    pub added_quantity: u32,
    pub new_quantity: u32,
    pub by: UserId,
    pub at: DateTime<Utc>,
}

/// Data for StatusChanged event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChangedData {
    pub from: OrderStatus,
    pub to: OrderStatus,
    /// True when the change cleared an existing `delivered_at`.
    pub delivery_retracted: bool,
    pub by: UserId,
    pub at: DateTime<Utc>,
}

/// Data for DeliveryMarked event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryMarkedData {
    pub delivered_at: DateTime<Utc>,
    /// Previous timestamp when the order was marked again.
    pub previously_delivered_at: Option<DateTime<Utc>>,
    pub by: UserId,
    pub at: DateTime<Utc>,
}

/// Data for OrderNullified event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderNullifiedData {
    pub previous_status: OrderStatus,
    pub days_elapsed: i64,
    pub by: UserId,
    pub at: DateTime<Utc>,
}

/// Direct edit of the delivery timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "value", rename_all = "snake_case")]
pub enum DeliveryOverride {
    Set(DateTime<Utc>),
    Clear,
}

/// Data for DetailsUpdated event. Absent fields were not touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailsUpdatedData {
    pub customer_id: Option<CustomerId>,
    pub delivery_due: Option<NaiveDate>,
    pub notes: Option<String>,
    pub location: Option<String>,
    pub delivered_at: Option<DeliveryOverride>,
    pub by: UserId,
    pub at: DateTime<Utc>,
}

/// Data for ItemsReplaced event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemsReplacedData {
    pub items: Vec<OrderItem>,
    pub by: UserId,
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let event = OrderEvent::StatusChanged(StatusChangedData {
            from: OrderStatus::Pending,
            to: OrderStatus::Invoiced,
            delivery_retracted: false,
            by: UserId::new(),
            at: Utc::now(),
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "StatusChanged");
        assert_eq!(json["data"]["to"], "facturado");
        assert_eq!(event.event_type(), "StatusChanged");
    }

    #[test]
    fn delivery_override_shape() {
        let json = serde_json::to_value(DeliveryOverride::Clear).unwrap();
        assert_eq!(json["action"], "clear");
    }
}
