//! WHERE clause builder
//!
//! Joins compiled predicates into a single conjunctive clause.

use std::fmt;

use crate::data::error::StoreError;

use super::types::{FilterCondition, Predicate};

/// Rendered boolean predicate (without the `WHERE` keyword).
///
/// Empty when no conditions were given, which matches every row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WhereClause(String);

impl WhereClause {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for WhereClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compile every condition and AND them together in input order
pub fn build_where_clause(conditions: &[FilterCondition]) -> Result<WhereClause, StoreError> {
    let parts = conditions
        .iter()
        .map(|condition| Predicate::compile(condition).map(|p| p.to_string()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(WhereClause(parts.join(" AND ")))
}
