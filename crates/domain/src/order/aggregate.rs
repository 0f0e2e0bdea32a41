//! Order aggregate implementation.

use chrono::{DateTime, NaiveDate, Utc};
use common::{CustomerId, OrderId, OrderItemId, UserId, Version};
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::money::Money;

use super::events::{
    DeliveryMarkedData, DeliveryOverride, DetailsUpdatedData, ItemsReplacedData,
    LineQuantityMergedData, OrderNullifiedData, OrderPlacedData, StatusChangedData,
};
use super::{OrderError, OrderEvent, OrderItem, OrderNumber, OrderStatus, OrderUpdate};

/// Maximum number of lines on one order.
pub const MAX_ITEMS: usize = 20;

/// Largest quantity a single line may carry, merges included.
pub const MAX_LINE_QUANTITY: u32 = 1_000_000;

/// Minimum age, in whole days, before an order may be nullified.
pub const NULLIFY_MIN_AGE_DAYS: i64 = 7;

/// Order aggregate root.
///
/// The order and its embedded items are read and written as one unit.
/// State only changes through [`Aggregate::apply`], which also keeps every
/// item's status equal to the order status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,

    /// Current version for optimistic concurrency.
    #[serde(default)]
    version: Version,

    order_number: Option<OrderNumber>,
    customer_id: CustomerId,
    items: Vec<OrderItem>,
    status: OrderStatus,
    delivery_due: Option<NaiveDate>,
    delivered_at: Option<DateTime<Utc>>,
    notes: Option<String>,
    location: Option<String>,
    created_by: UserId,
    updated_by: UserId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Aggregate for Order {
    type Event = OrderEvent;

    fn aggregate_type() -> &'static str {
        "Order"
    }

    fn version(&self) -> Version {
        self.version
    }

    fn apply(&mut self, event: Self::Event) {
        let by = event.actor();
        let at = event.occurred_at();

        match event {
            OrderEvent::OrderPlaced(data) => self.apply_placed(data),
            OrderEvent::LineQuantityMerged(data) => self.apply_merged(data),
            OrderEvent::StatusChanged(data) => self.transition(data.to),
            OrderEvent::DeliveryMarked(data) => self.delivered_at = Some(data.delivered_at),
            OrderEvent::OrderNullified(_) => self.transition(OrderStatus::Nullified),
            OrderEvent::DetailsUpdated(data) => self.apply_details(data),
            OrderEvent::ItemsReplaced(data) => {
                self.items = data.items;
                self.transition(self.status);
            }
        }

        self.updated_by = by;
        self.updated_at = at;
        self.version = self.version.next();
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    /// Returns the order number, `None` until the order is placed.
    pub fn order_number(&self) -> Option<OrderNumber> {
        self.order_number
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    /// Returns an item by id.
    pub fn item(&self, item_id: OrderItemId) -> Option<&OrderItem> {
        self.items.iter().find(|item| item.id == item_id)
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn delivery_due(&self) -> Option<NaiveDate> {
        self.delivery_due
    }

    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn created_by(&self) -> UserId {
        self.created_by
    }

    pub fn updated_by(&self) -> UserId {
        self.updated_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns true once `OrderPlaced` has been applied.
    pub fn is_placed(&self) -> bool {
        self.order_number.is_some()
    }

    /// Sum of all line subtotals.
    pub fn total(&self) -> Money {
        self.items.iter().map(OrderItem::subtotal).sum()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Invoiced, not delivered, and due strictly before `today`.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.is_pending_delivery() && self.delivery_due.is_some_and(|due| due < today)
    }

    /// Invoiced but not yet delivered.
    pub fn is_pending_delivery(&self) -> bool {
        self.status == OrderStatus::Invoiced && self.delivered_at.is_none()
    }

    pub fn is_delivered(&self) -> bool {
        self.delivered_at.is_some()
    }

    /// Whole days elapsed since creation, rounded down.
    pub fn days_since_creation(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days()
    }
}

// Command methods (return events)
impl Order {
    /// Places a new order.
    pub fn place(&self, data: OrderPlacedData) -> Result<Vec<OrderEvent>, OrderError> {
        if self.is_placed() {
            return Err(OrderError::AlreadyPlaced);
        }
        validate_items(&data.items)?;

        Ok(vec![OrderEvent::OrderPlaced(data)])
    }

    /// Adds `added` units onto an existing open line.
    pub fn merge_quantity(
        &self,
        item_id: OrderItemId,
        added: u32,
        by: UserId,
        at: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if !self.status.is_open() {
            return Err(OrderError::InvalidTransition {
                current: self.status,
                action: "merge into",
                reason: "only pending or purchasing orders accept merged lines",
            });
        }

        let item = self.item(item_id).ok_or(OrderError::ItemNotFound { item_id })?;
        if added == 0 {
            return Err(OrderError::InvalidQuantity {
                product_id: item.product_id,
                quantity: added,
            });
        }

        let new_quantity = item
            .quantity
            .checked_add(added)
            .filter(|quantity| *quantity <= MAX_LINE_QUANTITY)
            .ok_or(OrderError::QuantityTooLarge {
                product_id: item.product_id,
                quantity: u64::from(item.quantity) + u64::from(added),
                max: MAX_LINE_QUANTITY,
            })?;

        Ok(vec![OrderEvent::LineQuantityMerged(LineQuantityMergedData {
            item_id,
            product_id: item.product_id,
            previous_quantity: item.quantity,
            added_quantity: added,
            new_quantity,
            by,
            at,
        })])
    }

    /// Moves the order to `to`. Returns no events when already there.
    pub fn change_status(
        &self,
        to: OrderStatus,
        by: UserId,
        at: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if self.status == to {
            return Ok(vec![]);
        }

        Ok(vec![self.status_changed(to, by, at)])
    }

    /// Records delivery. Only invoiced orders can be delivered; marking
    /// again overwrites the timestamp.
    pub fn mark_delivered(
        &self,
        by: UserId,
        at: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if self.status != OrderStatus::Invoiced {
            return Err(OrderError::InvalidTransition {
                current: self.status,
                action: "deliver",
                reason: "only invoiced orders can be delivered",
            });
        }

        Ok(vec![OrderEvent::DeliveryMarked(DeliveryMarkedData {
            delivered_at: at,
            previously_delivered_at: self.delivered_at,
            by,
            at,
        })])
    }

    /// Nullifies an open order that is at least seven days old.
    pub fn nullify(&self, by: UserId, now: DateTime<Utc>) -> Result<Vec<OrderEvent>, OrderError> {
        if !self.status.is_open() {
            return Err(OrderError::InvalidTransition {
                current: self.status,
                action: "nullify",
                reason: "only pending or purchasing orders can be nullified",
            });
        }

        let days_elapsed = self.days_since_creation(now);
        if days_elapsed < NULLIFY_MIN_AGE_DAYS {
            return Err(OrderError::TooEarly {
                days_elapsed,
                required: NULLIFY_MIN_AGE_DAYS,
            });
        }

        Ok(vec![OrderEvent::OrderNullified(OrderNullifiedData {
            previous_status: self.status,
            days_elapsed,
            by,
            at: now,
        })])
    }

    /// Applies a partial update.
    ///
    /// Replacing items skips consolidation and catalog checks but still
    /// enforces the item count and quantity rules.
    pub fn update(
        &self,
        update: &OrderUpdate,
        by: UserId,
        at: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        let mut events = Vec::new();

        if let Some(replacement) = &update.items {
            let items: Vec<OrderItem> = replacement
                .iter()
                .map(|item| item.clone().into_item(self.status))
                .collect();
            validate_items(&items)?;
            events.push(OrderEvent::ItemsReplaced(ItemsReplacedData { items, by, at }));
        }

        let resulting_status = update.status.unwrap_or(self.status);
        if resulting_status != self.status {
            events.push(self.status_changed(resulting_status, by, at));
        }

        if matches!(update.delivered_at, Some(DeliveryOverride::Set(_)))
            && resulting_status != OrderStatus::Invoiced
        {
            return Err(OrderError::InvalidTransition {
                current: resulting_status,
                action: "set delivery date on",
                reason: "only invoiced orders can be delivered",
            });
        }

        if update.touches_details() {
            events.push(OrderEvent::DetailsUpdated(DetailsUpdatedData {
                customer_id: update.customer_id,
                delivery_due: update.delivery_due,
                notes: update.notes.clone(),
                location: update.location.clone(),
                delivered_at: update.delivered_at,
                by,
                at,
            }));
        }

        Ok(events)
    }

    fn status_changed(&self, to: OrderStatus, by: UserId, at: DateTime<Utc>) -> OrderEvent {
        OrderEvent::StatusChanged(StatusChangedData {
            from: self.status,
            to,
            delivery_retracted: to.is_open() && self.delivered_at.is_some(),
            by,
            at,
        })
    }
}

fn validate_items(items: &[OrderItem]) -> Result<(), OrderError> {
    if items.is_empty() {
        return Err(OrderError::NoItems);
    }
    if items.len() > MAX_ITEMS {
        return Err(OrderError::TooManyItems {
            count: items.len(),
            max: MAX_ITEMS,
        });
    }
    if let Some(item) = items.iter().find(|item| item.quantity == 0) {
        return Err(OrderError::InvalidQuantity {
            product_id: item.product_id,
            quantity: item.quantity,
        });
    }
    if let Some(item) = items.iter().find(|item| item.quantity > MAX_LINE_QUANTITY) {
        return Err(OrderError::QuantityTooLarge {
            product_id: item.product_id,
            quantity: u64::from(item.quantity),
            max: MAX_LINE_QUANTITY,
        });
    }
    Ok(())
}

// Apply event helpers
impl Order {
    fn apply_placed(&mut self, data: OrderPlacedData) {
        self.id = data.order_id;
        self.order_number = Some(data.order_number);
        self.customer_id = data.customer_id;
        self.items = data.items;
        self.delivery_due = data.delivery_due;
        self.delivered_at = None;
        self.notes = data.notes;
        self.location = data.location;
        self.created_by = data.by;
        self.created_at = data.at;
        self.transition(data.status);
    }

    fn apply_merged(&mut self, data: LineQuantityMergedData) {
        if let Some(item) = self.items.iter_mut().find(|item| item.id == data.item_id) {
            item.quantity = data.new_quantity;
        }
    }

    fn apply_details(&mut self, data: DetailsUpdatedData) {
        if let Some(customer_id) = data.customer_id {
            self.customer_id = customer_id;
        }
        if let Some(due) = data.delivery_due {
            self.delivery_due = Some(due);
        }
        if let Some(notes) = data.notes {
            self.notes = Some(notes);
        }
        if let Some(location) = data.location {
            self.location = Some(location);
        }
        match data.delivered_at {
            Some(DeliveryOverride::Set(at)) => self.delivered_at = Some(at),
            Some(DeliveryOverride::Clear) => self.delivered_at = None,
            None => {}
        }
    }

    /// The single place where order and item statuses are written.
    fn transition(&mut self, to: OrderStatus) {
        self.status = to;
        for item in &mut self.items {
            item.status = to;
        }
        if to.is_open() {
            self.delivered_at = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::DomainEvent;
    use crate::catalog::{Sku, UnitOfMeasure};
    use crate::order::ReplacementItem;
    use chrono::{Duration, TimeZone};
    use common::ProductId;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 9, 30, 0).unwrap()
    }

    fn item(quantity: u32, cents: i64) -> OrderItem {
        OrderItem {
            id: OrderItemId::new(),
            product_id: ProductId::new(),
            sku: Sku::parse("SKU-1").unwrap(),
            product_name: "Cable".to_string(),
            quantity,
            unit_price: Money::from_cents(cents),
            unit_of_measure: UnitOfMeasure::Meter,
            brand: None,
            format: None,
            status: OrderStatus::Invoiced,
            notes: None,
        }
    }

    fn placed(items: Vec<OrderItem>, status: OrderStatus) -> Order {
        let mut order = Order::default();
        let events = order
            .place(OrderPlacedData {
                order_id: OrderId::new(),
                order_number: OrderNumber::new(1),
                customer_id: CustomerId::new(),
                items,
                status,
                delivery_due: NaiveDate::from_ymd_opt(2024, 5, 10),
                notes: None,
                location: Some("Bodega".to_string()),
                by: UserId::new(),
                at: t0(),
            })
            .unwrap();
        order.apply_events(events);
        order
    }

    fn apply(order: &mut Order, events: Vec<OrderEvent>) {
        order.apply_events(events);
    }

    #[test]
    fn place_sets_status_on_every_item() {
        let order = placed(vec![item(1, 100), item(2, 50)], OrderStatus::Pending);

        assert!(order.is_placed());
        assert_eq!(order.version(), Version::new(1));
        assert_eq!(order.status(), OrderStatus::Pending);
        assert!(order.items().iter().all(|i| i.status == OrderStatus::Pending));
        assert_eq!(order.total(), Money::from_cents(200));
        assert_eq!(order.item_count(), 2);
        assert_eq!(order.created_at(), t0());
    }

    #[test]
    fn place_rejects_bad_item_lists() {
        let order = Order::default();
        let data = |items: Vec<OrderItem>| OrderPlacedData {
            order_id: OrderId::new(),
            order_number: OrderNumber::new(1),
            customer_id: CustomerId::new(),
            items,
            status: OrderStatus::Pending,
            delivery_due: None,
            notes: None,
            location: None,
            by: UserId::new(),
            at: t0(),
        };

        assert_eq!(order.place(data(vec![])), Err(OrderError::NoItems));
        assert!(matches!(
            order.place(data((0..21).map(|_| item(1, 1)).collect())),
            Err(OrderError::TooManyItems { count: 21, max: 20 })
        ));
        assert!(order.place(data((0..20).map(|_| item(1, 1)).collect())).is_ok());
        assert!(matches!(
            order.place(data(vec![item(0, 1)])),
            Err(OrderError::InvalidQuantity { quantity: 0, .. })
        ));
        assert!(matches!(
            order.place(data(vec![item(MAX_LINE_QUANTITY + 1, 1)])),
            Err(OrderError::QuantityTooLarge { .. })
        ));
    }

    #[test]
    fn placing_twice_fails() {
        let order = placed(vec![item(1, 1)], OrderStatus::Pending);
        let err = order
            .place(OrderPlacedData {
                order_id: OrderId::new(),
                order_number: OrderNumber::new(2),
                customer_id: CustomerId::new(),
                items: vec![item(1, 1)],
                status: OrderStatus::Pending,
                delivery_due: None,
                notes: None,
                location: None,
                by: UserId::new(),
                at: t0(),
            })
            .unwrap_err();
        assert_eq!(err, OrderError::AlreadyPlaced);
    }

    #[test]
    fn merge_adds_quantity_and_keeps_total_consistent() {
        let mut order = placed(vec![item(3, 250)], OrderStatus::Pending);
        let item_id = order.items()[0].id;

        let events = order
            .merge_quantity(item_id, 2, UserId::new(), t0())
            .unwrap();
        assert_eq!(events[0].event_type(), "LineQuantityMerged");
        apply(&mut order, events);

        assert_eq!(order.items()[0].quantity, 5);
        assert_eq!(order.total(), Money::from_cents(1250));
    }

    #[test]
    fn merge_past_the_line_limit_fails() {
        let order = placed(vec![item(MAX_LINE_QUANTITY - 1, 250)], OrderStatus::Pending);
        let item_id = order.items()[0].id;

        assert!(order.merge_quantity(item_id, 1, UserId::new(), t0()).is_ok());
        assert_eq!(
            order.merge_quantity(item_id, u32::MAX, UserId::new(), t0()),
            Err(OrderError::QuantityTooLarge {
                product_id: order.items()[0].product_id,
                quantity: u64::from(MAX_LINE_QUANTITY - 1) + u64::from(u32::MAX),
                max: MAX_LINE_QUANTITY,
            })
        );
    }

    #[test]
    fn merge_into_invoiced_order_fails() {
        let order = placed(vec![item(3, 250)], OrderStatus::Invoiced);
        let item_id = order.items()[0].id;
        assert!(matches!(
            order.merge_quantity(item_id, 1, UserId::new(), t0()),
            Err(OrderError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn change_status_cascades_and_is_idempotent() {
        let mut order = placed(vec![item(1, 1), item(1, 1)], OrderStatus::Pending);
        let user = UserId::new();

        let events = order
            .change_status(OrderStatus::Purchasing, user, t0())
            .unwrap();
        apply(&mut order, events);
        let after_first = order.clone();

        let events = order
            .change_status(OrderStatus::Purchasing, user, t0())
            .unwrap();
        assert!(events.is_empty());
        apply(&mut order, events);

        assert_eq!(order, after_first);
        assert!(order.items().iter().all(|i| i.status == OrderStatus::Purchasing));
        assert_eq!(order.updated_by(), user);
    }

    #[test]
    fn mark_delivered_requires_invoiced() {
        let order = placed(vec![item(1, 1)], OrderStatus::Purchasing);
        let err = order.mark_delivered(UserId::new(), t0()).unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidTransition {
                current: OrderStatus::Purchasing,
                ..
            }
        ));
        assert!(err.to_string().contains("only invoiced orders can be delivered"));
    }

    #[test]
    fn remarking_delivery_overwrites_timestamp() {
        let mut order = placed(vec![item(1, 1)], OrderStatus::Invoiced);
        let first = t0() + Duration::days(1);
        let second = t0() + Duration::days(2);

        let events = order.mark_delivered(UserId::new(), first).unwrap();
        apply(&mut order, events);
        assert_eq!(order.delivered_at(), Some(first));

        let events = order.mark_delivered(UserId::new(), second).unwrap();
        apply(&mut order, events);
        assert_eq!(order.delivered_at(), Some(second));
    }

    #[test]
    fn reverting_status_retracts_delivery() {
        let mut order = placed(vec![item(1, 1)], OrderStatus::Invoiced);
        let events = order.mark_delivered(UserId::new(), t0()).unwrap();
        apply(&mut order, events);
        assert!(order.is_delivered());

        let events = order
            .change_status(OrderStatus::Purchasing, UserId::new(), t0())
            .unwrap();
        assert!(matches!(
            &events[0],
            OrderEvent::StatusChanged(StatusChangedData {
                delivery_retracted: true,
                ..
            })
        ));
        apply(&mut order, events);

        assert!(!order.is_delivered());
        assert_eq!(order.delivered_at(), None);
    }

    #[test]
    fn nullify_gates() {
        let order = placed(vec![item(1, 1)], OrderStatus::Purchasing);

        let err = order
            .nullify(UserId::new(), t0() + Duration::days(6) + Duration::hours(23))
            .unwrap_err();
        assert_eq!(
            err,
            OrderError::TooEarly {
                days_elapsed: 6,
                required: 7
            }
        );

        let mut order = order;
        let events = order
            .nullify(UserId::new(), t0() + Duration::days(7))
            .unwrap();
        apply(&mut order, events);
        assert_eq!(order.status(), OrderStatus::Nullified);
        assert!(order.items().iter().all(|i| i.status == OrderStatus::Nullified));
    }

    #[test]
    fn nullify_invoiced_fails_regardless_of_age() {
        let order = placed(vec![item(1, 1)], OrderStatus::Invoiced);
        for days in [0, 7, 400] {
            assert!(matches!(
                order.nullify(UserId::new(), t0() + Duration::days(days)),
                Err(OrderError::InvalidTransition { .. })
            ));
        }
    }

    #[test]
    fn overdue_uses_date_only() {
        let mut order = placed(vec![item(1, 1)], OrderStatus::Invoiced);
        let due = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();

        assert!(!order.is_overdue(due));
        assert!(order.is_overdue(due.succ_opt().unwrap()));
        assert!(order.is_pending_delivery());

        let events = order.mark_delivered(UserId::new(), t0()).unwrap();
        apply(&mut order, events);
        assert!(!order.is_overdue(due.succ_opt().unwrap()));
        assert!(!order.is_pending_delivery());
    }

    #[test]
    fn update_replaces_items_and_status_together() {
        let mut order = placed(vec![item(1, 100)], OrderStatus::Pending);
        let update = OrderUpdate {
            status: Some(OrderStatus::Invoiced),
            notes: Some("urgente".to_string()),
            items: Some(vec![ReplacementItem {
                product_id: ProductId::new(),
                sku: Sku::parse("n-1").unwrap(),
                product_name: "Nuevo".to_string(),
                quantity: 4,
                unit_price: Money::from_cents(25),
                unit_of_measure: UnitOfMeasure::Unit,
                brand: None,
                format: None,
                notes: None,
            }]),
            ..Default::default()
        };

        let events = order.update(&update, UserId::new(), t0()).unwrap();
        let types: Vec<_> = events.iter().map(|e| e.event_type()).collect();
        assert_eq!(types, ["ItemsReplaced", "StatusChanged", "DetailsUpdated"]);
        apply(&mut order, events);

        assert_eq!(order.status(), OrderStatus::Invoiced);
        assert_eq!(order.items()[0].status, OrderStatus::Invoiced);
        assert_eq!(order.items()[0].sku.as_str(), "N-1");
        assert_eq!(order.total(), Money::from_cents(100));
        assert_eq!(order.notes(), Some("urgente"));
        assert_eq!(order.location(), Some("Bodega"));
    }

    #[test]
    fn update_cannot_set_delivery_on_open_order() {
        let order = placed(vec![item(1, 1)], OrderStatus::Pending);
        let update = OrderUpdate {
            delivered_at: Some(DeliveryOverride::Set(t0())),
            ..Default::default()
        };
        assert!(matches!(
            order.update(&update, UserId::new(), t0()),
            Err(OrderError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn empty_update_is_a_no_op() {
        let order = placed(vec![item(1, 1)], OrderStatus::Pending);
        let events = order
            .update(&OrderUpdate::default(), UserId::new(), t0())
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn state_round_trips_through_json() {
        let order = placed(vec![item(2, 300)], OrderStatus::Purchasing);
        let json = serde_json::to_value(&order).unwrap();
        let back: Order = serde_json::from_value(json).unwrap();
        assert_eq!(back, order);
    }
}
