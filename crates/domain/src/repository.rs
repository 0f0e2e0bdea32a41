//! Persistence contracts.
//!
//! The domain defines what it needs from storage; the `store` crate
//! provides in-memory and PostgreSQL implementations. All implementations
//! must be thread-safe (Send + Sync).

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use common::{CustomerId, EventId, OrderId, ProductId, Version};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::{Aggregate, DomainEvent};
use crate::catalog::{Customer, Product, ProductQuery, Sku, TaxId};
use crate::notification::NotificationSettings;
use crate::order::{Order, OrderEvent, OrderNumber, OrderStatus};

/// Errors raised by repository implementations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The stored version differs from the one the write was based on.
    #[error(
        "Concurrency conflict for {aggregate} {id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        aggregate: &'static str,
        id: String,
        expected: Version,
        actual: Version,
    },

    /// A unique field already holds this value.
    #[error("{entity} with {field} {value} already exists")]
    Duplicate {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    /// The record to update does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A stock adjustment would take stock out of range.
    #[error("Insufficient stock for product {product_id}: {stock} available, adjustment {delta}")]
    InsufficientStock {
        product_id: ProductId,
        stock: u32,
        delta: i64,
    },

    /// Stored JSON could not be converted.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The storage backend failed.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// A write to one order: its new state plus the events that produced it.
#[derive(Debug, Clone)]
pub struct OrderChange {
    pub order: Order,
    /// Version the change was decided against; `Version::initial()` for a
    /// new order.
    pub expected_version: Version,
    pub events: Vec<OrderEvent>,
}

impl OrderChange {
    /// Applies `events` to `order` and packages the result.
    pub fn apply(mut order: Order, events: Vec<OrderEvent>) -> Self {
        let expected_version = order.version();
        order.apply_events(events.clone());
        Self {
            order,
            expected_version,
            events,
        }
    }

    /// True when the change creates the order.
    pub fn is_insert(&self) -> bool {
        self.expected_version == Version::initial()
    }

    /// Builds the event records, numbered after `expected_version`.
    pub fn recorded_events(&self) -> Vec<RecordedEvent> {
        let mut sequence = self.expected_version;
        self.events
            .iter()
            .map(|event| {
                sequence = sequence.next();
                RecordedEvent::new(self.order.id(), sequence, event.clone())
            })
            .collect()
    }
}

/// An order event as stored, with its outbox state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub event_id: EventId,
    pub order_id: OrderId,
    /// Order version after this event.
    pub sequence: Version,
    pub event_type: String,
    pub payload: OrderEvent,
    pub recorded_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

impl RecordedEvent {
    pub fn new(order_id: OrderId, sequence: Version, payload: OrderEvent) -> Self {
        Self {
            event_id: EventId::new(),
            order_id,
            sequence,
            event_type: payload.event_type().to_string(),
            recorded_at: payload.occurred_at(),
            payload,
            published_at: None,
        }
    }
}

/// Builder for order listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderQuery {
    /// Filter by customer.
    pub customer_id: Option<CustomerId>,

    /// Filter by status (any of these).
    pub statuses: Option<Vec<OrderStatus>>,

    /// Orders created at or after this instant.
    pub created_from: Option<DateTime<Utc>>,

    /// Orders created at or before this instant.
    pub created_to: Option<DateTime<Utc>>,

    /// Only orders overdue as of this date.
    pub overdue_on: Option<NaiveDate>,

    /// Maximum number of orders to return.
    pub limit: Option<usize>,

    /// Number of orders to skip.
    pub offset: Option<usize>,
}

impl OrderQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Orders of one customer.
    pub fn for_customer(customer_id: CustomerId) -> Self {
        Self {
            customer_id: Some(customer_id),
            ..Default::default()
        }
    }

    pub fn status(mut self, status: OrderStatus) -> Self {
        self.statuses = Some(vec![status]);
        self
    }

    pub fn statuses(mut self, statuses: Vec<OrderStatus>) -> Self {
        self.statuses = Some(statuses);
        self
    }

    pub fn created_from(mut self, at: DateTime<Utc>) -> Self {
        self.created_from = Some(at);
        self
    }

    pub fn created_to(mut self, at: DateTime<Utc>) -> Self {
        self.created_to = Some(at);
        self
    }

    pub fn overdue_on(mut self, today: NaiveDate) -> Self {
        self.overdue_on = Some(today);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if the order passes every filter (paging excluded).
    pub fn matches(&self, order: &Order) -> bool {
        self.customer_id.is_none_or(|id| order.customer_id() == id)
            && self
                .statuses
                .as_ref()
                .is_none_or(|statuses| statuses.contains(&order.status()))
            && self.created_from.is_none_or(|from| order.created_at() >= from)
            && self.created_to.is_none_or(|to| order.created_at() <= to)
            && self.overdue_on.is_none_or(|today| order.is_overdue(today))
    }
}

/// Filter for customer listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerQuery {
    #[serde(default)]
    pub active_only: bool,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Storage for order aggregates and their events.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Increments and returns the order number sequence.
    async fn next_order_number(&self) -> Result<OrderNumber, RepositoryError>;

    /// Writes one order and records its events.
    ///
    /// Fails with `ConcurrencyConflict` if the stored version is not
    /// `change.expected_version`.
    async fn save(&self, change: OrderChange) -> Result<(), RepositoryError>;

    /// Writes several orders atomically: either every change is stored or
    /// none is. Every version is checked before anything is written.
    async fn save_batch(&self, changes: Vec<OrderChange>) -> Result<(), RepositoryError>;

    /// Loads an order by id.
    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Orders of a customer created at or after `since` whose status is in
    /// `statuses`.
    async fn find_recent_for_customer(
        &self,
        customer_id: CustomerId,
        since: DateTime<Utc>,
        statuses: &[OrderStatus],
    ) -> Result<Vec<Order>, RepositoryError>;

    /// Lists orders matching the query, newest first.
    async fn list(&self, query: &OrderQuery) -> Result<Vec<Order>, RepositoryError>;

    /// Returns the recorded events of an order, oldest first.
    async fn history(&self, id: OrderId) -> Result<Vec<RecordedEvent>, RepositoryError>;
}

/// Reader side of the transactional outbox.
#[async_trait]
pub trait OutboxRepository: Send + Sync {
    /// Oldest events not yet published, up to `limit`.
    async fn unpublished(&self, limit: usize) -> Result<Vec<RecordedEvent>, RepositoryError>;

    /// Marks events as published.
    async fn mark_published(
        &self,
        event_ids: &[EventId],
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
}

/// Storage for products and customers.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Stores a new product; fails with `Duplicate` on a taken SKU.
    async fn insert_product(&self, product: &Product) -> Result<(), RepositoryError>;

    /// Replaces a stored product.
    async fn update_product(&self, product: &Product) -> Result<(), RepositoryError>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Loads the products that exist among `ids`; missing ids are skipped.
    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;

    async fn find_product_by_sku(&self, sku: &Sku) -> Result<Option<Product>, RepositoryError>;

    /// Lists products matching the query, ordered by SKU.
    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, RepositoryError>;

    /// Adds `delta` to the stock in a single step.
    ///
    /// Fails with `InsufficientStock` when the result would be negative or
    /// larger than `u32::MAX`.
    async fn adjust_stock(
        &self,
        id: ProductId,
        delta: i64,
        at: DateTime<Utc>,
    ) -> Result<Product, RepositoryError>;

    /// Stores a new customer; fails with `Duplicate` on a taken tax id.
    async fn insert_customer(&self, customer: &Customer) -> Result<(), RepositoryError>;

    /// Replaces a stored customer.
    async fn update_customer(&self, customer: &Customer) -> Result<(), RepositoryError>;

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError>;

    async fn find_customer_by_tax_id(
        &self,
        tax_id: &TaxId,
    ) -> Result<Option<Customer>, RepositoryError>;

    /// Lists customers matching the query, ordered by name.
    async fn list_customers(&self, query: &CustomerQuery)
    -> Result<Vec<Customer>, RepositoryError>;
}

/// Storage for the notification settings singleton.
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Returns the stored settings, or the defaults when none were saved.
    async fn notification_settings(&self) -> Result<NotificationSettings, RepositoryError>;

    async fn save_notification_settings(
        &self,
        settings: &NotificationSettings,
    ) -> Result<(), RepositoryError>;
}
