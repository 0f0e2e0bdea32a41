//! Notification error types.

use common::OrderId;
use domain::RepositoryError;
use thiserror::Error;

/// Errors raised while building or delivering notifications.
///
/// None of these reach the caller of an order operation.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),

    /// The mailer refused the message.
    #[error("Delivery to {address} rejected: {reason}")]
    Rejected { address: String, reason: String },

    /// The order an event refers to could not be loaded.
    #[error("Order not found: {0}")]
    OrderMissing(OrderId),

    /// Settings, orders or the outbox could not be read or written.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Convenience type alias for notification results.
pub type Result<T> = std::result::Result<T, NotificationError>;
