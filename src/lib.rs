// file: src/lib.rs
// description: library entry point and public api exports
// reference: rust library patterns
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/readme.md"))]

pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod schema;
pub mod utils;
pub mod vector;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{Config, DatabaseConfig, PipelineConfig, VectorBackend, VectorConfig};
pub use database::{Dialect, SqlDatabase};
pub use error::{MigrationError, Result};
pub use models::{DatabaseSchema, EmbeddingRecord, Row, SqlValue, TableSchema, VectorRecord};
pub use pipeline::{MigrationDriver, MigrationStats, NamespaceMaintenance, migrate};
pub use schema::SchemaDiscovery;
pub use vector::{EmbedOptions, VectorStore};
