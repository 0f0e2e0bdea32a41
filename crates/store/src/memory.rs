//! In-memory repositories.
//!
//! Every collection sits behind a single lock so a batch of order writes is
//! checked and applied in one critical section.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CustomerId, EventId, OrderId, ProductId, Version};
use domain::{
    Aggregate, CatalogRepository, Customer, CustomerQuery, NotificationSettings, Order,
    OrderChange, OrderNumber, OrderQuery, OrderRepository, OrderStatus, OutboxRepository, Product,
    ProductQuery, RecordedEvent, RepositoryError, SettingsRepository, Sku, TaxId,
};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct State {
    orders: HashMap<OrderId, Order>,
    events: Vec<RecordedEvent>,
    last_order_number: u64,
    products: HashMap<ProductId, Product>,
    customers: HashMap<CustomerId, Customer>,
    settings: Option<NotificationSettings>,
}

impl State {
    fn check_version(&self, change: &OrderChange) -> Result<(), RepositoryError> {
        let actual = self
            .orders
            .get(&change.order.id())
            .map(|order| order.version())
            .unwrap_or_else(Version::initial);

        if actual != change.expected_version {
            return Err(RepositoryError::ConcurrencyConflict {
                aggregate: "order",
                id: change.order.id().to_string(),
                expected: change.expected_version,
                actual,
            });
        }
        Ok(())
    }

    fn write(&mut self, change: OrderChange) {
        self.events.extend(change.recorded_events());
        self.orders.insert(change.order.id(), change.order);
    }

    fn sku_taken(&self, sku: &Sku, except: ProductId) -> bool {
        self.products
            .values()
            .any(|product| product.id != except && &product.sku == sku)
    }

    fn tax_id_taken(&self, tax_id: &TaxId, except: CustomerId) -> bool {
        self.customers
            .values()
            .any(|customer| customer.id != except && customer.tax_id.as_ref() == Some(tax_id))
    }
}

/// In-memory implementation of every repository trait.
///
/// Cloning shares the underlying state. Useful for tests and for running
/// the API without a database.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of recorded order events.
    pub async fn event_count(&self) -> usize {
        self.state.read().await.events.len()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Clears all data from the store.
    pub async fn clear(&self) {
        *self.state.write().await = State::default();
    }
}

fn page<T>(items: Vec<T>, limit: Option<usize>, offset: Option<usize>) -> Vec<T> {
    items
        .into_iter()
        .skip(offset.unwrap_or(0))
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}

fn newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| b.order_number().cmp(&a.order_number()))
    });
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn next_order_number(&self) -> Result<OrderNumber, RepositoryError> {
        let mut state = self.state.write().await;
        state.last_order_number += 1;
        Ok(OrderNumber::new(state.last_order_number))
    }

    async fn save(&self, change: OrderChange) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        state.check_version(&change)?;
        state.write(change);
        Ok(())
    }

    async fn save_batch(&self, changes: Vec<OrderChange>) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        for change in &changes {
            state.check_version(change)?;
        }
        for change in changes {
            state.write(change);
        }
        Ok(())
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn find_recent_for_customer(
        &self,
        customer_id: CustomerId,
        since: DateTime<Utc>,
        statuses: &[OrderStatus],
    ) -> Result<Vec<Order>, RepositoryError> {
        let state = self.state.read().await;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|order| {
                order.customer_id() == customer_id
                    && order.created_at() >= since
                    && statuses.contains(&order.status())
            })
            .cloned()
            .collect();
        newest_first(&mut orders);
        Ok(orders)
    }

    async fn list(&self, query: &OrderQuery) -> Result<Vec<Order>, RepositoryError> {
        let state = self.state.read().await;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|order| query.matches(order))
            .cloned()
            .collect();
        newest_first(&mut orders);
        Ok(page(orders, query.limit, query.offset))
    }

    async fn history(&self, id: OrderId) -> Result<Vec<RecordedEvent>, RepositoryError> {
        let state = self.state.read().await;
        let mut events: Vec<RecordedEvent> = state
            .events
            .iter()
            .filter(|event| event.order_id == id)
            .cloned()
            .collect();
        events.sort_by_key(|event| event.sequence);
        Ok(events)
    }
}

#[async_trait]
impl OutboxRepository for InMemoryStore {
    async fn unpublished(&self, limit: usize) -> Result<Vec<RecordedEvent>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .events
            .iter()
            .filter(|event| event.published_at.is_none())
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_published(
        &self,
        event_ids: &[EventId],
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        for event in state
            .events
            .iter_mut()
            .filter(|event| event_ids.contains(&event.event_id))
        {
            event.published_at.get_or_insert(at);
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogRepository for InMemoryStore {
    async fn insert_product(&self, product: &Product) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        if state.sku_taken(&product.sku, product.id) {
            return Err(RepositoryError::Duplicate {
                entity: "product",
                field: "sku",
                value: product.sku.to_string(),
            });
        }
        state.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn update_product(&self, product: &Product) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        if !state.products.contains_key(&product.id) {
            return Err(RepositoryError::NotFound {
                entity: "product",
                id: product.id.to_string(),
            });
        }
        if state.sku_taken(&product.sku, product.id) {
            return Err(RepositoryError::Duplicate {
                entity: "product",
                field: "sku",
                value: product.sku.to_string(),
            });
        }
        state.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.products.get(id).cloned())
            .collect())
    }

    async fn find_product_by_sku(&self, sku: &Sku) -> Result<Option<Product>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .products
            .values()
            .find(|product| &product.sku == sku)
            .cloned())
    }

    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, RepositoryError> {
        let state = self.state.read().await;
        let mut products: Vec<Product> = state
            .products
            .values()
            .filter(|product| query.matches(product))
            .cloned()
            .collect();
        products.sort_by(|a, b| a.sku.cmp(&b.sku));
        Ok(page(products, query.limit, query.offset))
    }

    async fn adjust_stock(
        &self,
        id: ProductId,
        delta: i64,
        at: DateTime<Utc>,
    ) -> Result<Product, RepositoryError> {
        let mut state = self.state.write().await;
        let product = state
            .products
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "product",
                id: id.to_string(),
            })?;

        let stock = i64::from(product.stock)
            .checked_add(delta)
            .and_then(|stock| u32::try_from(stock).ok())
            .ok_or(RepositoryError::InsufficientStock {
                product_id: id,
                stock: product.stock,
                delta,
            })?;
        product.stock = stock;
        product.updated_at = at;
        Ok(product.clone())
    }

    async fn insert_customer(&self, customer: &Customer) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        if let Some(tax_id) = &customer.tax_id {
            if state.tax_id_taken(tax_id, customer.id) {
                return Err(RepositoryError::Duplicate {
                    entity: "customer",
                    field: "tax_id",
                    value: tax_id.to_string(),
                });
            }
        }
        state.customers.insert(customer.id, customer.clone());
        Ok(())
    }

    async fn update_customer(&self, customer: &Customer) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        if !state.customers.contains_key(&customer.id) {
            return Err(RepositoryError::NotFound {
                entity: "customer",
                id: customer.id.to_string(),
            });
        }
        if let Some(tax_id) = &customer.tax_id {
            if state.tax_id_taken(tax_id, customer.id) {
                return Err(RepositoryError::Duplicate {
                    entity: "customer",
                    field: "tax_id",
                    value: tax_id.to_string(),
                });
            }
        }
        state.customers.insert(customer.id, customer.clone());
        Ok(())
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        Ok(self.state.read().await.customers.get(&id).cloned())
    }

    async fn find_customer_by_tax_id(
        &self,
        tax_id: &TaxId,
    ) -> Result<Option<Customer>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .customers
            .values()
            .find(|customer| customer.tax_id.as_ref() == Some(tax_id))
            .cloned())
    }

    async fn list_customers(
        &self,
        query: &CustomerQuery,
    ) -> Result<Vec<Customer>, RepositoryError> {
        let state = self.state.read().await;
        let mut customers: Vec<Customer> = state
            .customers
            .values()
            .filter(|customer| !query.active_only || customer.active)
            .cloned()
            .collect();
        customers.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(page(customers, query.limit, query.offset))
    }
}

#[async_trait]
impl SettingsRepository for InMemoryStore {
    async fn notification_settings(&self) -> Result<NotificationSettings, RepositoryError> {
        Ok(self
            .state
            .read()
            .await
            .settings
            .clone()
            .unwrap_or_default())
    }

    async fn save_notification_settings(
        &self,
        settings: &NotificationSettings,
    ) -> Result<(), RepositoryError> {
        self.state.write().await.settings = Some(settings.clone());
        Ok(())
    }
}
