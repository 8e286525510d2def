//! Vector-store abstraction
//!
//! The entity tool only needs two things from a vector database: open a
//! table by name and run a filtered scan on it. Keeping that contract narrow
//! lets the DuckDB backend (or a test double) stand in for the engine.

use std::collections::BTreeMap;
use std::fmt;

use super::duckdb::filters::WhereClause;
use super::error::StoreError;

/// One row, keyed by column name (sorted for deterministic display)
pub type Entity = BTreeMap<String, FieldValue>;

/// Column value as returned by the store
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<FieldValue>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{:?}", v),
            Self::Text(s) => f.write_str(s),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Filtered scan request
#[derive(Debug, Clone, Default)]
pub struct ScanQuery {
    pub filter: WhereClause,
    /// Apply the filter before the row limit (pure row filter). When false,
    /// the limit picks candidate rows first and the filter trims them.
    pub prefilter: bool,
    /// `None` returns every matching row
    pub limit: Option<usize>,
}

impl ScanQuery {
    pub fn new(filter: WhereClause) -> Self {
        Self {
            filter,
            prefilter: true,
            limit: None,
        }
    }

    pub fn with_prefilter(mut self, prefilter: bool) -> Self {
        self.prefilter = prefilter;
        self
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}

/// An opened table
pub trait VectorTable {
    fn name(&self) -> &str;

    /// Column names in table order
    fn columns(&self) -> &[String];

    /// Run a filtered scan; rows come back in backend order
    fn search(&self, query: &ScanQuery) -> Result<Vec<Entity>, StoreError>;
}

/// A database holding named tables
pub trait VectorStore {
    type Table: VectorTable;

    /// Fails with `StoreError::TableNotFound` when the table is absent
    fn open_table(&self, name: &str) -> Result<Self::Table, StoreError>;
}
