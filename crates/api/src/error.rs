//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, OrderError, RepositoryError};
use serde::Serialize;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// No usable actor on the request.
    Unauthorized(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Domain logic error.
    Domain(DomainError),
    /// Internal server error.
    Internal(String),
}

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, details) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, Vec::new()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, Vec::new()),
            ApiError::Domain(err) => {
                let status = domain_status(&err);
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!(error = %err, "domain operation failed");
                    (status, "Internal server error".to_string(), Vec::new())
                } else {
                    let details = err.details().to_vec();
                    (status, err.to_string(), details)
                }
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    Vec::new(),
                )
            }
        };

        (status, axum::Json(ErrorBody { error, details })).into_response()
    }
}

fn domain_status(err: &DomainError) -> StatusCode {
    match err {
        DomainError::Order(order_err) => match order_err {
            OrderError::InvalidTransition { .. }
            | OrderError::TooEarly { .. }
            | OrderError::AlreadyPlaced => StatusCode::CONFLICT,
            OrderError::ItemNotFound { .. } => StatusCode::NOT_FOUND,
            OrderError::InvalidStatus(_)
            | OrderError::NoItems
            | OrderError::TooManyItems { .. }
            | OrderError::InvalidQuantity { .. }
            | OrderError::QuantityTooLarge { .. } => StatusCode::BAD_REQUEST,
        },
        DomainError::Validation { .. } => StatusCode::BAD_REQUEST,
        DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::InvalidReference { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::Forbidden => StatusCode::FORBIDDEN,
        DomainError::Repository(repo_err) => match repo_err {
            RepositoryError::ConcurrencyConflict { .. }
            | RepositoryError::Duplicate { .. }
            | RepositoryError::InsufficientStock { .. } => StatusCode::CONFLICT,
            RepositoryError::NotFound { .. } => StatusCode::NOT_FOUND,
            RepositoryError::Serialization(_) | RepositoryError::Backend(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        },
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        ApiError::Domain(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_guards_are_conflicts() {
        let err = DomainError::from(OrderError::TooEarly {
            days_elapsed: 3,
            required: 7,
        });
        assert_eq!(domain_status(&err), StatusCode::CONFLICT);
    }

    #[test]
    fn references_and_policy_have_their_own_codes() {
        let reference = DomainError::InvalidReference {
            message: "Invalid order".to_string(),
            references: vec!["items[0].product_id: inactive".to_string()],
        };
        assert_eq!(domain_status(&reference), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(domain_status(&DomainError::Forbidden), StatusCode::FORBIDDEN);
    }

    #[test]
    fn backend_failures_hide_their_message() {
        let err = ApiError::Domain(DomainError::Repository(RepositoryError::Backend(
            "connection refused".to_string(),
        )));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
