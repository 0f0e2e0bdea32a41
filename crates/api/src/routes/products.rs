//! Product endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::ProductId;
use domain::{ImportReport, NewProduct, Product, ProductQuery, ProductUpdate};
use serde::Deserialize;

use super::{Confirmation, parse_id};
use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::state::{AppState, Store};

#[derive(Debug, Deserialize)]
pub struct StockRequest {
    /// Signed change; the result may not drop below zero.
    pub delta: i64,
}

/// POST /products
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(actor): Authenticated,
    Json(req): Json<NewProduct>,
) -> Result<(StatusCode, Json<Confirmation<Product>>), ApiError> {
    let product = state.catalog.create_product(&actor, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(Confirmation::new(
            format!("Product {} created", product.sku),
            product,
        )),
    ))
}

/// POST /products/import
#[tracing::instrument(skip(state, rows))]
pub async fn import<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(actor): Authenticated,
    Json(rows): Json<Vec<NewProduct>>,
) -> Result<Json<Confirmation<ImportReport<Product>>>, ApiError> {
    let report = state.catalog.import_products(&actor, rows).await?;
    Ok(Json(Confirmation::new(
        format!(
            "{} product(s) imported, {} rejected",
            report.created.len(),
            report.rejected.len()
        ),
        report,
    )))
}

/// GET /products
#[tracing::instrument(skip(state))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(actor): Authenticated,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.catalog.list_products(&actor, &query).await?))
}

/// GET /products/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(actor): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let id = parse_id(&id, ProductId::parse_str)?;
    Ok(Json(state.catalog.get_product(&actor, id).await?))
}

/// PATCH /products/{id}
#[tracing::instrument(skip(state, req))]
pub async fn update<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(actor): Authenticated,
    Path(id): Path<String>,
    Json(req): Json<ProductUpdate>,
) -> Result<Json<Confirmation<Product>>, ApiError> {
    let id = parse_id(&id, ProductId::parse_str)?;
    let product = state.catalog.update_product(&actor, id, req).await?;
    Ok(Json(Confirmation::new("Product updated", product)))
}

/// DELETE /products/{id}: soft delete.
#[tracing::instrument(skip(state))]
pub async fn deactivate<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(actor): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<Confirmation<Product>>, ApiError> {
    let id = parse_id(&id, ProductId::parse_str)?;
    let product = state.catalog.deactivate_product(&actor, id).await?;
    Ok(Json(Confirmation::new("Product deactivated", product)))
}

/// POST /products/{id}/stock
#[tracing::instrument(skip(state))]
pub async fn adjust_stock<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(actor): Authenticated,
    Path(id): Path<String>,
    Json(req): Json<StockRequest>,
) -> Result<Json<Confirmation<Product>>, ApiError> {
    let id = parse_id(&id, ProductId::parse_str)?;
    let product = state.catalog.adjust_stock(&actor, id, req.delta).await?;
    Ok(Json(Confirmation::new(
        format!("Stock of {} is now {}", product.sku, product.stock),
        product,
    )))
}
