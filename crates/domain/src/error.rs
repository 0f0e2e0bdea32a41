//! Domain error types.

use thiserror::Error;
use validator::ValidationErrors;

use crate::order::OrderError;
use crate::repository::RepositoryError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A lifecycle rule on an order was violated.
    #[error("{0}")]
    Order(#[from] OrderError),

    /// Malformed or out-of-range input.
    #[error("{message}")]
    Validation {
        message: String,
        details: Vec<String>,
    },

    /// The referenced aggregate does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The request references records that are missing or inactive.
    #[error("{message}")]
    InvalidReference {
        message: String,
        references: Vec<String>,
    },

    /// The acting role may not perform the operation.
    #[error("Operation not permitted")]
    Forbidden,

    /// The persistence layer failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl DomainError {
    /// Builds a validation error with field-level details.
    pub fn validation(message: impl Into<String>, details: Vec<String>) -> Self {
        DomainError::Validation {
            message: message.into(),
            details,
        }
    }

    /// Builds a not-found error for the given entity.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns the detail lines attached to the error, if any.
    pub fn details(&self) -> &[String] {
        match self {
            DomainError::Validation { details, .. } => details,
            DomainError::InvalidReference { references, .. } => references,
            _ => &[],
        }
    }
}

impl From<ValidationErrors> for DomainError {
    fn from(errors: ValidationErrors) -> Self {
        DomainError::validation("Invalid input", validation_details(&errors))
    }
}

/// Flattens `validator` errors into `"field: message"` lines, sorted by field.
pub fn validation_details(errors: &ValidationErrors) -> Vec<String> {
    let mut details: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| error.code.to_string());
                format!("{field}: {message}")
            })
        })
        .collect();
    details.sort();
    details
}
