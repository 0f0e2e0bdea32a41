//! Order lifecycle endpoints.

use std::str::FromStr;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{CustomerId, OrderId};
use domain::{
    CreateOrder, CreateOrderOutcome, MergeSummary, Order, OrderQuery, OrderStatus, OrderUpdate,
    OrderView, RecordedEvent,
};
use serde::{Deserialize, Serialize};

use super::{Confirmation, parse_id};
use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::state::{AppState, Store};

// -- Request types --

/// Query string of `GET /orders`.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub customer_id: Option<CustomerId>,
    /// Comma-separated statuses, e.g. `pendiente,compra`.
    pub status: Option<String>,
    #[serde(default)]
    pub overdue: bool,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

// -- Response types --

/// What a create request did.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CreateOrderResponse {
    Created { order: OrderView },
    Merged { summary: MergeSummary },
}

// -- Handlers --

/// POST /orders: place an order, or merge it into recent open orders.
///
/// Answers 201 when an order was placed and 200 when the lines were merged.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(actor): Authenticated,
    Json(req): Json<CreateOrder>,
) -> Result<(StatusCode, Json<Confirmation<CreateOrderResponse>>), ApiError> {
    let outcome = state.orders.create_order(&actor, req).await?;
    state.wake_outbox();

    let (status, body) = match outcome {
        CreateOrderOutcome::Created(order) => (
            StatusCode::CREATED,
            Confirmation::new(
                format!("Order {} created", label(&order)),
                CreateOrderResponse::Created {
                    order: state.orders.view(order),
                },
            ),
        ),
        CreateOrderOutcome::Merged(summary) => (
            StatusCode::OK,
            Confirmation::new(
                merge_message(&summary),
                CreateOrderResponse::Merged { summary },
            ),
        ),
    };
    Ok((status, Json(body)))
}

/// GET /orders: filtered, paged listing, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(actor): Authenticated,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    let query = to_query(params, &state)?;
    Ok(Json(state.orders.list_orders(&actor, &query).await?))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(actor): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<OrderView>, ApiError> {
    let id = parse_id(&id, OrderId::parse_str)?;
    Ok(Json(state.orders.get_order(&actor, id).await?))
}

/// PATCH /orders/{id}: partial update.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(actor): Authenticated,
    Path(id): Path<String>,
    Json(req): Json<OrderUpdate>,
) -> Result<Json<Confirmation<OrderView>>, ApiError> {
    let id = parse_id(&id, OrderId::parse_str)?;
    let order = state.orders.update_order(&actor, id, req).await?;
    state.wake_outbox();

    Ok(Json(confirm(&state, "updated", order)))
}

/// POST /orders/{id}/status: move the order and all its items to a status.
#[tracing::instrument(skip(state, req))]
pub async fn change_status<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(actor): Authenticated,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<Confirmation<OrderView>>, ApiError> {
    let id = parse_id(&id, OrderId::parse_str)?;
    let status = OrderStatus::from_str(&req.status)?;
    let order = state.orders.change_status(&actor, id, status).await?;
    state.wake_outbox();

    Ok(Json(confirm(&state, &format!("moved to {status}"), order)))
}

/// POST /orders/{id}/deliver
#[tracing::instrument(skip(state))]
pub async fn deliver<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(actor): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<Confirmation<OrderView>>, ApiError> {
    let id = parse_id(&id, OrderId::parse_str)?;
    let order = state.orders.mark_delivered(&actor, id).await?;
    state.wake_outbox();

    Ok(Json(confirm(&state, "marked as delivered", order)))
}

/// POST /orders/{id}/nullify
#[tracing::instrument(skip(state))]
pub async fn nullify<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(actor): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<Confirmation<OrderView>>, ApiError> {
    let id = parse_id(&id, OrderId::parse_str)?;
    let order = state.orders.nullify(&actor, id).await?;
    state.wake_outbox();

    Ok(Json(confirm(&state, "nullified", order)))
}

/// GET /orders/{id}/history: recorded events, oldest first.
#[tracing::instrument(skip(state))]
pub async fn history<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(actor): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<Vec<RecordedEvent>>, ApiError> {
    let id = parse_id(&id, OrderId::parse_str)?;
    Ok(Json(state.orders.history(&actor, id).await?))
}

fn to_query<S: Store>(params: ListParams, state: &AppState<S>) -> Result<OrderQuery, ApiError> {
    let mut query = OrderQuery {
        customer_id: params.customer_id,
        created_from: params.created_from,
        created_to: params.created_to,
        limit: params.limit,
        offset: params.offset,
        ..Default::default()
    };

    if let Some(raw) = params.status.as_deref().filter(|raw| !raw.trim().is_empty()) {
        let statuses = raw
            .split(',')
            .map(OrderStatus::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        query = query.statuses(statuses);
    }
    if params.overdue {
        query = query.overdue_on(state.clock.today());
    }
    Ok(query)
}

fn confirm<S: Store>(state: &AppState<S>, action: &str, order: Order) -> Confirmation<OrderView> {
    Confirmation::new(format!("Order {} {action}", label(&order)), state.orders.view(order))
}

fn label(order: &Order) -> String {
    order
        .order_number()
        .map(|number| number.to_string())
        .unwrap_or_else(|| order.id().to_string())
}

fn merge_message(summary: &MergeSummary) -> String {
    let numbers: Vec<String> = summary.order_numbers.iter().map(ToString::to_string).collect();
    format!(
        "{} line(s) merged into {}",
        summary.merged_count(),
        numbers.join(", ")
    )
}
