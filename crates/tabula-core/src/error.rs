//! Errors raised by the in-memory table and data iterator.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Unknown column '{0}'")]
    UnknownColumn(String),

    #[error("More than one filter for column '{0}'")]
    DuplicateFilter(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("Filter {filter} is not supported on column '{column}'")]
    UnsupportedFilter { column: String, filter: String },

    #[error("Invalid table: {0}")]
    InvalidTable(String),
}
