//! Shared application state.

use std::sync::Arc;

use domain::{
    CatalogRepository, CatalogService, Clock, NotificationSettingsService, OrderRepository,
    OrderService, OutboxRepository, SettingsRepository,
};
use tokio::sync::Notify;

/// A backend implementing every repository the handlers need.
pub trait Store:
    OrderRepository + OutboxRepository + CatalogRepository + SettingsRepository + Clone + 'static
{
}

impl<T> Store for T where
    T: OrderRepository
        + OutboxRepository
        + CatalogRepository
        + SettingsRepository
        + Clone
        + 'static
{
}

/// Services shared by all handlers.
pub struct AppState<S: Store> {
    pub orders: OrderService<S, S>,
    pub catalog: CatalogService<S>,
    pub settings: NotificationSettingsService<S>,
    pub clock: Arc<dyn Clock>,
    outbox: Arc<Notify>,
}

impl<S: Store> AppState<S> {
    /// Builds the services over one store. `outbox` wakes the relay after
    /// writes that record order events.
    pub fn new(store: S, clock: Arc<dyn Clock>, outbox: Arc<Notify>) -> Self {
        Self {
            orders: OrderService::new(store.clone(), store.clone()).with_clock(Arc::clone(&clock)),
            catalog: CatalogService::new(store.clone()).with_clock(Arc::clone(&clock)),
            settings: NotificationSettingsService::new(store),
            clock,
            outbox,
        }
    }

    /// Signals the outbox relay that new events are waiting.
    pub fn wake_outbox(&self) {
        self.outbox.notify_one();
    }
}
