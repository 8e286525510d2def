//! Query filter system
//!
//! Structured filter conditions and their translation into a DuckDB
//! boolean predicate. Conditions are combined with AND only.
//!
//! ## Usage
//!
//! ```
//! use agentkit::data::duckdb::filters::{build_where_clause, parse_conditions};
//!
//! let json_str = r#"[{"field": "status", "op": "eq", "value": "active"},
//!                    {"field": "priority", "op": "gt", "value": 3}]"#;
//! let conditions = parse_conditions(json_str).unwrap();
//! let clause = build_where_clause(&conditions).unwrap();
//! assert_eq!(clause.as_str(), "status = 'active' AND priority > 3");
//! ```

mod builder;
mod parser;
mod types;

pub use builder::{WhereClause, build_where_clause};
pub use parser::{check_condition_count, parse_conditions};
pub use types::{FilterCondition, FilterOp, FilterValue, Literal, Predicate};
