// file: src/vector/embeddings.rs
// description: OpenAI-compatible embeddings API client used by the local LanceDB backend
// reference: https://platform.openai.com/docs/api-reference/embeddings

use crate::error::{MigrationError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

pub struct OpenAiEmbeddingClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiEmbeddingClient {
    /// `base_url` is the API root, e.g. `https://api.openai.com/v1` or a local
    /// server such as `http://localhost:11434/v1`.
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/embeddings", self.base_url)
    }

    pub async fn generate_embeddings(&self, model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest { input: texts, model };

        debug!(
            "Requesting {} embeddings from {} with model {}",
            texts.len(),
            self.base_url,
            model
        );

        let mut builder = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .json(&request);

        if let Some(api_key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = builder.send().await.map_err(|e| {
            MigrationError::Embedding(format!("Failed to send embeddings request: {}", e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(MigrationError::Embedding(format!(
                "Embeddings request failed with status {}: {}",
                status, error_text
            )));
        }

        let embedding_response: EmbeddingResponse = response.json().await.map_err(|e| {
            MigrationError::Embedding(format!("Failed to parse embeddings response: {}", e))
        })?;

        Ok(embedding_response
            .data
            .into_iter()
            .map(|data| data.embedding)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = OpenAiEmbeddingClient::new("http://localhost:11434/v1/", None);
        assert_eq!(client.endpoint(), "http://localhost:11434/v1/embeddings");
    }

    #[test]
    fn test_request_is_batched() {
        let texts = vec!["a".to_string(), "b".to_string()];
        let request = EmbeddingRequest {
            input: &texts,
            model: "nomic-embed-text",
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"input": ["a", "b"], "model": "nomic-embed-text"})
        );
    }

    #[tokio::test]
    async fn test_empty_batch_skips_request() {
        let client = OpenAiEmbeddingClient::new("http://127.0.0.1:9", None);
        let embeddings = client.generate_embeddings("m", &[]).await.unwrap();
        assert!(embeddings.is_empty());
    }
}
