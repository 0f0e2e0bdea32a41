//! Shared identifiers and versioning used across the order desk crates.

mod types;
mod version;

pub use types::{CustomerId, EventId, OrderId, OrderItemId, ProductId, UserId};
pub use version::Version;
