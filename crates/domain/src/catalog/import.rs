//! Row-by-row outcome of a catalog import.

use serde::Serialize;

use crate::error::DomainError;

/// Maximum rows accepted by one import call.
pub const MAX_IMPORT_ROWS: usize = 500;

/// A row that was not imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRow {
    /// Zero-based position in the submitted batch.
    pub row: usize,
    pub error: String,
    pub details: Vec<String>,
}

impl RejectedRow {
    pub(crate) fn new(row: usize, error: &DomainError) -> Self {
        Self {
            row,
            error: error.to_string(),
            details: error.details().to_vec(),
        }
    }
}

/// Rows created and rows rejected. Each row is independent: a rejected
/// row never undoes the ones before it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport<T> {
    pub created: Vec<T>,
    pub rejected: Vec<RejectedRow>,
}

impl<T> Default for ImportReport<T> {
    fn default() -> Self {
        Self {
            created: Vec::new(),
            rejected: Vec::new(),
        }
    }
}
