//! Error type for the entity store
//!
//! Wraps DuckDB errors together with the validation failures raised while
//! compiling filter conditions, so callers see one error type per query.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// The requested table does not exist
    #[error("Table not found: {table}")]
    TableNotFound { table: String },

    /// A filter condition cannot be rendered into a predicate
    #[error("Invalid condition on '{field}': {reason}")]
    InvalidCondition { field: String, reason: String },

    /// Condition payload is not valid JSON for the condition schema
    #[error("Invalid condition JSON: {0}")]
    InvalidFilterJson(String),

    #[error("Condition JSON exceeds maximum size of {max_bytes} bytes")]
    FilterJsonTooLarge { max_bytes: usize },

    #[error("Maximum {max} conditions allowed")]
    TooManyConditions { max: usize },

    /// Backend failure (malformed predicate, type mismatch, I/O)
    #[error("DuckDB error: {0}")]
    Database(#[from] duckdb::Error),

    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),
}

impl StoreError {
    pub fn invalid_condition(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidCondition {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn table_not_found(table: &str) -> Self {
        Self::TableNotFound {
            table: table.to_string(),
        }
    }
}
