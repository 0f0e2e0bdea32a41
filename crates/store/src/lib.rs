//! Repository implementations.
//!
//! - [`InMemoryStore`]: everything behind one lock, for tests and local runs
//! - [`PostgresStore`]: JSONB documents with key columns, one transaction
//!   per write

pub mod error;
pub mod memory;
pub mod postgres;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
