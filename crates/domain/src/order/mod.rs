//! Order aggregate, consolidation and lifecycle service.

mod aggregate;
mod commands;
mod consolidation;
mod events;
mod item;
mod service;
mod status;
mod value_objects;
mod view;

pub use aggregate::{MAX_ITEMS, MAX_LINE_QUANTITY, NULLIFY_MIN_AGE_DAYS, Order};
pub use commands::{CreateOrder, OrderUpdate, ReplacementItem};
pub use consolidation::{
    ConsolidationPlan, DuplicateCandidate, LOOKBACK_HOURS, MergeSummary, MergedLine, UnmergedLine,
    find_duplicates,
};
pub use events::{
    DeliveryMarkedData, DeliveryOverride, DetailsUpdatedData, ItemsReplacedData,
    LineQuantityMergedData, OrderEvent, OrderNullifiedData, OrderPlacedData, StatusChangedData,
};
pub use item::{OrderItem, OrderLine};
pub use service::{CreateOrderOutcome, OrderService};
pub use status::OrderStatus;
pub use value_objects::{InvalidOrderNumber, OrderNumber};
pub use view::OrderView;

use common::{OrderItemId, ProductId};
use thiserror::Error;

/// Lifecycle rule violations on an order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// The status name is not one of the four lifecycle statuses.
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    /// The operation is not allowed from the current status.
    #[error("Cannot {action} order in status {current}: {reason}")]
    InvalidTransition {
        current: OrderStatus,
        action: &'static str,
        reason: &'static str,
    },

    /// The nullify age gate has not elapsed yet.
    #[error("Order can be nullified after {required} days; only {days_elapsed} elapsed")]
    TooEarly { days_elapsed: i64, required: i64 },

    /// The order has no items.
    #[error("Order has no items")]
    NoItems,

    /// The order exceeds the item limit.
    #[error("Order has {count} items; at most {max} are allowed")]
    TooManyItems { count: usize, max: usize },

    /// A line quantity is zero.
    #[error("Invalid quantity {quantity} for product {product_id} (must be greater than 0)")]
    InvalidQuantity { product_id: ProductId, quantity: u32 },

    /// A line quantity, after any merge, exceeds the line limit.
    #[error("Quantity {quantity} for product {product_id} exceeds the line limit of {max}")]
    QuantityTooLarge {
        product_id: ProductId,
        quantity: u64,
        max: u32,
    },

    /// The item is not part of the order.
    #[error("Item not found: {item_id}")]
    ItemNotFound { item_id: OrderItemId },

    /// The order was already placed.
    #[error("Order already placed")]
    AlreadyPlaced,
}
