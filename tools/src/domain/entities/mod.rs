//! Entity lookup tool
//!
//! Retrieves rows from a vector-store table using structured filter
//! conditions and renders them as a readable summary for an agent.

mod format;

pub use format::{format_entities, format_entity};

use serde::Deserialize;
use tracing::Instrument;

use crate::core::constants::{DEFAULT_MAX_ROWS, MAX_CONDITION_JSON_SIZE};
use crate::data::duckdb::filters::{FilterCondition, build_where_clause, check_condition_count};
use crate::data::{ScanQuery, StoreError, VectorStore, VectorTable};

/// Tool name exposed to agent frameworks
pub const TOOL_NAME: &str = "get_entity";

pub const TOOL_DESCRIPTION: &str = "Use this tool to retrieve entities from a vector database table. \
     You need to specify the table name and a list of filter conditions that must ALL be met.";

/// Tool arguments as sent by an agent
#[derive(Debug, Clone, Deserialize)]
pub struct GetEntityArgs {
    /// The name of the table to get the entity from
    pub table_name: String,
    /// Filter conditions that must ALL be met
    #[serde(default)]
    pub conditions: Vec<FilterCondition>,
}

impl GetEntityArgs {
    /// Parse tool-call arguments, applying the same limits as condition JSON
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        if json.len() > MAX_CONDITION_JSON_SIZE {
            return Err(StoreError::FilterJsonTooLarge {
                max_bytes: MAX_CONDITION_JSON_SIZE,
            });
        }
        let args: Self =
            serde_json::from_str(json).map_err(|e| StoreError::InvalidFilterJson(e.to_string()))?;
        check_condition_count(&args.conditions)?;
        Ok(args)
    }
}

pub struct EntityGetTool<S: VectorStore> {
    store: S,
    max_rows: Option<usize>,
    span: tracing::Span,
}

impl<S: VectorStore> EntityGetTool<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            max_rows: Some(DEFAULT_MAX_ROWS),
            span: tracing::info_span!("tool", name = TOOL_NAME),
        }
    }

    /// Cap returned rows; `None` (or 0 via config) returns every match
    pub fn with_max_rows(mut self, max_rows: Option<usize>) -> Self {
        self.max_rows = max_rows.filter(|n| *n > 0);
        self
    }

    /// Run the tool from parsed arguments
    pub fn run(&self, args: &GetEntityArgs) -> Result<String, StoreError> {
        self.get_entities(&args.table_name, &args.conditions)
    }

    /// Fetch entities matching every condition and format them.
    ///
    /// Failures are logged and returned unchanged.
    pub fn get_entities(
        &self,
        table_name: &str,
        conditions: &[FilterCondition],
    ) -> Result<String, StoreError> {
        let _enter = self.span.enter();
        self.query(table_name, conditions).inspect_err(|e| {
            tracing::error!(table = table_name, error = %e, "Failed to get entities");
        })
    }

    /// Async entry point. Not implemented: always fails.
    pub async fn get_entities_async(
        &self,
        table_name: &str,
        conditions: &[FilterCondition],
    ) -> Result<String, StoreError> {
        async {
            tracing::debug!(
                table = table_name,
                conditions = conditions.len(),
                "Async entity lookup requested"
            );
            Err(StoreError::NotImplemented("Async version not implemented"))
        }
        .instrument(self.span.clone())
        .await
    }

    fn query(&self, table_name: &str, conditions: &[FilterCondition]) -> Result<String, StoreError> {
        check_condition_count(conditions)?;
        let table = self.store.open_table(table_name)?;

        let where_clause = build_where_clause(conditions)?;
        if where_clause.is_empty() {
            tracing::warn!(table = table.name(), "No conditions given, scanning without a filter");
        }

        let query = ScanQuery::new(where_clause)
            .with_prefilter(true)
            .with_limit(self.max_rows);
        let entities = table.search(&query)?;

        tracing::debug!(
            table = table.name(),
            matches = entities.len(),
            filter = %query.filter,
            "Entity lookup complete"
        );
        Ok(format_entities(&entities, &query.filter))
    }
}
