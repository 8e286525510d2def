//! DuckDB entity store
//!
//! Embedded backend for the [`VectorStore`] contract. Tables keep their
//! embedding in a `vector FLOAT[]` column next to ordinary scalar columns;
//! lookups here are pure row filters, no similarity ranking is involved.

pub mod filters;

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use duckdb::types::{TimeUnit, Value};
use duckdb::{AccessMode, Config, Connection};
use parking_lot::Mutex;

use crate::data::error::StoreError;
use crate::data::store::{Entity, FieldValue, ScanQuery, VectorStore, VectorTable};
use crate::utils::sql::quote_identifier;
use crate::utils::time::micros_to_datetime;

/// Days between 0001-01-01 (CE day 1) and the Unix epoch
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// DuckDB-backed store.
///
/// Uses a single connection protected by a mutex; opened tables share it.
pub struct DuckdbStore {
    conn: Arc<Mutex<Connection>>,
    span: tracing::Span,
}

impl DuckdbStore {
    /// Open (or create) a database file for reading and writing
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        tracing::debug!(path = %path.display(), "DuckDB store opened");
        Ok(Self::from_connection(conn, &path.display().to_string()))
    }

    /// Open an existing database file without write access
    pub fn open_read_only(path: &Path) -> Result<Self, StoreError> {
        let config = Config::default().access_mode(AccessMode::ReadOnly)?;
        let conn = Connection::open_with_flags(path, config)?;
        tracing::debug!(path = %path.display(), "DuckDB store opened read-only");
        Ok(Self::from_connection(conn, &path.display().to_string()))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::from_connection(conn, ":memory:"))
    }

    fn from_connection(conn: Connection, location: &str) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            span: tracing::debug_span!("duckdb_store", location = %location),
        }
    }

    /// Run one or more statements (schema setup, seeding)
    pub fn execute_batch(&self, sql: &str) -> Result<(), StoreError> {
        self.conn.lock().execute_batch(sql)?;
        Ok(())
    }

    /// Catalog name and ordered columns of a table.
    ///
    /// DuckDB identifiers are case-insensitive, so the lookup is too; the
    /// catalog's spelling is returned for use in generated SQL.
    fn table_columns(&self, name: &str) -> Result<Option<(String, Vec<String>)>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT table_name, column_name
             FROM information_schema.columns
             WHERE lower(table_name) = lower(?) AND table_schema = current_schema()
             ORDER BY table_name, ordinal_position",
        )?;
        let rows = stmt.query_map([name], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let rows = rows.collect::<Result<Vec<_>, _>>()?;

        let Some(canonical) = rows.first().map(|(table, _)| table.clone()) else {
            return Ok(None);
        };
        let columns = rows
            .into_iter()
            .filter(|(table, _)| *table == canonical)
            .map(|(_, column)| column)
            .collect();
        Ok(Some((canonical, columns)))
    }
}

impl VectorStore for DuckdbStore {
    type Table = DuckdbTable;

    fn open_table(&self, name: &str) -> Result<DuckdbTable, StoreError> {
        let _enter = self.span.enter();
        let Some((canonical, columns)) = self.table_columns(name)? else {
            tracing::debug!(table = name, "Table not found");
            return Err(StoreError::table_not_found(name));
        };

        tracing::trace!(table = %canonical, columns = ?columns, "Opened table");
        Ok(DuckdbTable {
            conn: Arc::clone(&self.conn),
            name: canonical,
            columns,
            span: self.span.clone(),
        })
    }
}

pub struct DuckdbTable {
    conn: Arc<Mutex<Connection>>,
    name: String,
    columns: Vec<String>,
    span: tracing::Span,
}

impl DuckdbTable {
    fn select_sql(&self, query: &ScanQuery) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ");
        let table = quote_identifier(&self.name);
        let limit = query
            .limit
            .map(|n| format!(" LIMIT {}", n))
            .unwrap_or_default();

        if query.filter.is_empty() {
            return format!("SELECT {} FROM {}{}", columns, table, limit);
        }

        if query.prefilter {
            format!(
                "SELECT {} FROM {} WHERE {}{}",
                columns, table, query.filter, limit
            )
        } else {
            format!(
                "SELECT {} FROM (SELECT * FROM {}{}) AS candidates WHERE {}",
                columns, table, limit, query.filter
            )
        }
    }
}

impl VectorTable for DuckdbTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn search(&self, query: &ScanQuery) -> Result<Vec<Entity>, StoreError> {
        let _enter = self.span.enter();
        let sql = self.select_sql(query);
        tracing::debug!(table = %self.name, sql = %sql, "Running entity scan");

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;

        let mut entities = Vec::new();
        while let Some(row) = rows.next()? {
            let mut entity = Entity::new();
            for (idx, column) in self.columns.iter().enumerate() {
                let value: Value = row.get(idx)?;
                entity.insert(column.clone(), field_value(value));
            }
            entities.push(entity);
        }

        tracing::debug!(table = %self.name, rows = entities.len(), "Entity scan complete");
        Ok(entities)
    }
}

fn field_value(value: Value) -> FieldValue {
    match value {
        Value::Null => FieldValue::Null,
        Value::Boolean(b) => FieldValue::Bool(b),
        Value::TinyInt(v) => FieldValue::Integer(v.into()),
        Value::SmallInt(v) => FieldValue::Integer(v.into()),
        Value::Int(v) => FieldValue::Integer(v.into()),
        Value::BigInt(v) => FieldValue::Integer(v),
        Value::UTinyInt(v) => FieldValue::Integer(v.into()),
        Value::USmallInt(v) => FieldValue::Integer(v.into()),
        Value::UInt(v) => FieldValue::Integer(v.into()),
        Value::UBigInt(v) => i64::try_from(v)
            .map(FieldValue::Integer)
            .unwrap_or_else(|_| FieldValue::Text(v.to_string())),
        Value::HugeInt(v) => i64::try_from(v)
            .map(FieldValue::Integer)
            .unwrap_or_else(|_| FieldValue::Text(v.to_string())),
        Value::Float(v) => FieldValue::Float(v.into()),
        Value::Double(v) => FieldValue::Float(v),
        Value::Text(s) | Value::Enum(s) => FieldValue::Text(s),
        Value::Timestamp(unit, v) => {
            FieldValue::Text(micros_to_datetime(timestamp_micros(unit, v)).to_rfc3339())
        }
        Value::Date32(days) => NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS_FROM_CE)
            .map(|d| FieldValue::Text(d.to_string()))
            .unwrap_or(FieldValue::Integer(days.into())),
        Value::List(items) => FieldValue::List(items.into_iter().map(field_value).collect()),
        other => FieldValue::Text(format!("{:?}", other)),
    }
}

fn timestamp_micros(unit: TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value.saturating_mul(1_000_000),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}
