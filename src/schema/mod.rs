// file: src/schema/mod.rs
// description: schema classification and discovery module exports
// reference: internal module structure

pub mod classifier;
pub mod discovery;

pub use classifier::{
    TEXT_TYPES, classify_rows, classify_sqlite_columns, is_sqlite_text_type, is_text_type,
};
pub use discovery::SchemaDiscovery;
