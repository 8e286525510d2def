//! Data layer: the entity store contract and its DuckDB backend

pub mod duckdb;
pub mod error;
pub mod store;

pub use error::StoreError;
pub use store::{Entity, FieldValue, ScanQuery, VectorStore, VectorTable};
