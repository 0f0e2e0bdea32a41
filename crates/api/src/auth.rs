//! Actor extraction.
//!
//! Token issuance and verification happen upstream; the gateway forwards
//! the authenticated user as two headers:
//!
//! - `x-user-id`: the user's UUID
//! - `x-user-role`: `admin`, `vendedor` or `facturador`
//!
//! A request missing either header, or carrying an unparseable value, is
//! rejected with 401 before any handler runs.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::UserId;
use domain::{Actor, Role};

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// The actor performing the request.
///
/// ```ignore
/// async fn handler(Authenticated(actor): Authenticated) -> Result<Json<()>, ApiError> {
///     actor.authorize(Operation::ReadRecords)?;
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Authenticated(pub Actor);

impl<S: Send + Sync> FromRequestParts<S> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header(parts, USER_ID_HEADER)?;
        let user_id = UserId::parse_str(user_id)
            .map_err(|_| ApiError::Unauthorized(format!("Invalid {USER_ID_HEADER} header")))?;

        let role: Role = header(parts, USER_ROLE_HEADER)?
            .parse()
            .map_err(|e: domain::policy::UnknownRole| ApiError::Unauthorized(e.to_string()))?;

        Ok(Authenticated(Actor::new(user_id, role)))
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, ApiError> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Unauthorized(format!("Missing {name} header")))
}
