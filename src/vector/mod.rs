// file: src/vector/mod.rs
// description: vector store backends module exports
// reference: internal module structure

pub mod embeddings;
pub mod lance;
pub mod pinecone;
pub mod store;

pub use embeddings::OpenAiEmbeddingClient;
pub use lance::LanceDbStore;
pub use pinecone::PineconeClient;
pub use store::{EmbedOptions, VectorStore};

use crate::config::{VectorBackend, VectorConfig};
use crate::error::{MigrationError, Result};

/// Builds the configured backend.
pub async fn connect(config: &VectorConfig) -> Result<Box<dyn VectorStore>> {
    match config.backend {
        VectorBackend::Pinecone => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                MigrationError::Config("vector.api_key is required for pinecone".to_string())
            })?;
            Ok(Box::new(
                PineconeClient::connect(api_key, &config.index_name).await?,
            ))
        }
        VectorBackend::Lancedb => {
            let uri = config.lancedb_uri.as_deref().ok_or_else(|| {
                MigrationError::Config("vector.lancedb_uri is required for lancedb".to_string())
            })?;
            let api_url = config.embedding_api_url.as_deref().ok_or_else(|| {
                MigrationError::Config(
                    "vector.embedding_api_url is required for lancedb".to_string(),
                )
            })?;
            let embedder = OpenAiEmbeddingClient::new(api_url, config.embedding_api_key.clone());
            Ok(Box::new(
                LanceDbStore::new(uri, &config.index_name, embedder).await?,
            ))
        }
    }
}
