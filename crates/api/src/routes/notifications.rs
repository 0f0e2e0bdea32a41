//! Notification settings endpoints (admin only).

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use domain::NotificationSettings;

use super::Confirmation;
use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::state::{AppState, Store};

/// GET /notifications/settings
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(actor): Authenticated,
) -> Result<Json<NotificationSettings>, ApiError> {
    Ok(Json(state.settings.get(&actor).await?))
}

/// PUT /notifications/settings: replace the whole configuration.
#[tracing::instrument(skip(state, req))]
pub async fn replace<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(actor): Authenticated,
    Json(req): Json<NotificationSettings>,
) -> Result<Json<Confirmation<NotificationSettings>>, ApiError> {
    let settings = state.settings.replace(&actor, req).await?;
    Ok(Json(Confirmation::new("Notification settings saved", settings)))
}
