// file: src/error.rs
// description: Custom error types and result type aliases
// reference: https://docs.rs/thiserror

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MigrationError>;

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported database client: {0}")]
    UnsupportedDialect(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sqlx::Error> for MigrationError {
    fn from(err: sqlx::Error) -> Self {
        MigrationError::Database(err.to_string())
    }
}

impl From<tiberius::error::Error> for MigrationError {
    fn from(err: tiberius::error::Error) -> Self {
        MigrationError::Database(err.to_string())
    }
}

impl MigrationError {
    /// Failures raised by the embedding or upsert calls.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            MigrationError::Embedding(_) | MigrationError::VectorStore(_)
        )
    }
}
