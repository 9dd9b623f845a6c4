//! Storage layer for namespaces and records
//!
//! Provides SQL-based persistence with versioned migrations.

pub mod migrations;
pub mod sql_store;

pub use migrations::{migrate, CURRENT_SCHEMA_VERSION};
pub use sql_store::SqlRecordStore;
