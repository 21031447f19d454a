// file: src/models/mod.rs
// description: data models module exports
// reference: internal module structure

pub mod record;
pub mod schema;
pub mod value;

pub use record::{EmbeddingRecord, VectorRecord};
pub use schema::{ColumnMetadataRow, DatabaseSchema, EligibleTable, SkipReason, TableSchema};
pub use value::{Row, SqlValue};
