// file: src/vector/store.rs
// description: vector store collaborator trait used by the batching pipeline
// reference: https://docs.pinecone.io/reference/api/introduction

use crate::error::Result;
use crate::models::VectorRecord;
use async_trait::async_trait;
use serde::Serialize;

/// Parameters forwarded to the embedding model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedOptions {
    pub input_type: String,
    pub truncate: String,
}

impl EmbedOptions {
    /// Options for documents being indexed (as opposed to search queries).
    pub fn passage() -> Self {
        Self {
            input_type: "passage".to_string(),
            truncate: "END".to_string(),
        }
    }
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self::passage()
    }
}

/// Every call either succeeds for the whole batch or fails.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Returns one vector per text, in input order.
    async fn embed(
        &self,
        model: &str,
        texts: &[String],
        options: &EmbedOptions,
    ) -> Result<Vec<Vec<f32>>>;

    async fn upsert_batch(&self, namespace: &str, records: Vec<VectorRecord>) -> Result<()>;

    async fn delete_many(&self, namespace: &str, ids: &[String]) -> Result<()>;

    async fn fetch(&self, namespace: &str, ids: &[String]) -> Result<Vec<VectorRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passage_options() {
        let options = EmbedOptions::default();
        assert_eq!(options.input_type, "passage");
        assert_eq!(options.truncate, "END");
        assert_eq!(
            serde_json::to_value(&options).unwrap(),
            serde_json::json!({"input_type": "passage", "truncate": "END"})
        );
    }
}
