//! HTTP handlers.

pub mod customers;
pub mod health;
pub mod metrics;
pub mod notifications;
pub mod orders;
pub mod products;

use serde::Serialize;

use crate::error::ApiError;

/// Body of a successful mutation.
#[derive(Debug, Serialize)]
pub struct Confirmation<T: Serialize> {
    pub message: String,
    pub data: T,
}

impl<T: Serialize> Confirmation<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }
}

/// Parses a path identifier, rejecting malformed UUIDs with 400.
pub(crate) fn parse_id<T>(
    raw: &str,
    parse: fn(&str) -> Result<T, uuid::Error>,
) -> Result<T, ApiError> {
    parse(raw).map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))
}
