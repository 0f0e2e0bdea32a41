//! HTTP API server for the order desk.
//!
//! Exposes orders, customers, products and notification settings over
//! REST, with structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use domain::Clock;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::sync::Notify;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use state::{AppState, Store};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router {
    use routes::{customers, notifications, orders, products};

    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(orders::create::<S>).get(orders::list::<S>))
        .route("/orders/{id}", get(orders::get::<S>).patch(orders::update::<S>))
        .route("/orders/{id}/status", post(orders::change_status::<S>))
        .route("/orders/{id}/deliver", post(orders::deliver::<S>))
        .route("/orders/{id}/nullify", post(orders::nullify::<S>))
        .route("/orders/{id}/history", get(orders::history::<S>))
        .route(
            "/customers",
            post(customers::create::<S>).get(customers::list::<S>),
        )
        .route("/customers/import", post(customers::import::<S>))
        .route(
            "/customers/{id}",
            get(customers::get::<S>)
                .patch(customers::update::<S>)
                .delete(customers::deactivate::<S>),
        )
        .route(
            "/products",
            post(products::create::<S>).get(products::list::<S>),
        )
        .route("/products/import", post(products::import::<S>))
        .route(
            "/products/{id}",
            get(products::get::<S>)
                .patch(products::update::<S>)
                .delete(products::deactivate::<S>),
        )
        .route("/products/{id}/stock", post(products::adjust_stock::<S>))
        .route(
            "/notifications/settings",
            get(notifications::get::<S>).put(notifications::replace::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state over one store.
///
/// `outbox` is the relay's waker; pass a fresh `Notify` when no relay runs.
pub fn create_state<S: Store>(
    store: S,
    clock: Arc<dyn Clock>,
    outbox: Arc<Notify>,
) -> Arc<AppState<S>> {
    Arc::new(AppState::new(store, clock, outbox))
}
