//! Customer endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::CustomerId;
use domain::{Customer, CustomerQuery, CustomerUpdate, ImportReport, NewCustomer};

use super::{Confirmation, parse_id};
use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::state::{AppState, Store};

/// POST /customers
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(actor): Authenticated,
    Json(req): Json<NewCustomer>,
) -> Result<(StatusCode, Json<Confirmation<Customer>>), ApiError> {
    let customer = state.catalog.create_customer(&actor, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(Confirmation::new(
            format!("Customer {} created", customer.name),
            customer,
        )),
    ))
}

/// POST /customers/import: create many customers, reporting rejected rows.
#[tracing::instrument(skip(state, rows))]
pub async fn import<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(actor): Authenticated,
    Json(rows): Json<Vec<NewCustomer>>,
) -> Result<Json<Confirmation<ImportReport<Customer>>>, ApiError> {
    let report = state.catalog.import_customers(&actor, rows).await?;
    Ok(Json(Confirmation::new(
        format!(
            "{} customer(s) imported, {} rejected",
            report.created.len(),
            report.rejected.len()
        ),
        report,
    )))
}

/// GET /customers
#[tracing::instrument(skip(state))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(actor): Authenticated,
    Query(query): Query<CustomerQuery>,
) -> Result<Json<Vec<Customer>>, ApiError> {
    Ok(Json(state.catalog.list_customers(&actor, &query).await?))
}

/// GET /customers/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(actor): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<Customer>, ApiError> {
    let id = parse_id(&id, CustomerId::parse_str)?;
    Ok(Json(state.catalog.get_customer(&actor, id).await?))
}

/// PATCH /customers/{id}
#[tracing::instrument(skip(state, req))]
pub async fn update<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(actor): Authenticated,
    Path(id): Path<String>,
    Json(req): Json<CustomerUpdate>,
) -> Result<Json<Confirmation<Customer>>, ApiError> {
    let id = parse_id(&id, CustomerId::parse_str)?;
    let customer = state.catalog.update_customer(&actor, id, req).await?;
    Ok(Json(Confirmation::new("Customer updated", customer)))
}

/// DELETE /customers/{id}: soft delete.
#[tracing::instrument(skip(state))]
pub async fn deactivate<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(actor): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<Confirmation<Customer>>, ApiError> {
    let id = parse_id(&id, CustomerId::parse_str)?;
    let customer = state.catalog.deactivate_customer(&actor, id).await?;
    Ok(Json(Confirmation::new("Customer deactivated", customer)))
}
