// file: src/vector/pinecone.rs
// description: Pinecone REST integration for hosted embeddings and namespaced upserts
// reference: https://docs.pinecone.io/reference/api/2025-01/inference/generate-embeddings

use crate::error::{MigrationError, Result};
use crate::models::{Row, VectorRecord};
use crate::vector::store::{EmbedOptions, VectorStore};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, info};

const CONTROL_PLANE_URL: &str = "https://api.pinecone.io";
const API_VERSION: &str = "2025-01";

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    parameters: &'a EmbedOptions,
    inputs: Vec<EmbedInput<'a>>,
}

#[derive(Debug, Serialize)]
struct EmbedInput<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    values: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<PineconeVector>,
    namespace: &'a str,
}

#[derive(Debug, Serialize, Deserialize)]
struct PineconeVector {
    id: String,
    #[serde(default)]
    values: Vec<f32>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    metadata: Map<String, Value>,
}

#[derive(Debug, Serialize)]
struct DeleteRequest<'a> {
    ids: &'a [String],
    namespace: &'a str,
}

#[derive(Debug, Deserialize)]
struct FetchResponse {
    #[serde(default)]
    vectors: HashMap<String, PineconeVector>,
}

#[derive(Debug, Deserialize)]
struct DescribeIndexResponse {
    host: String,
}

impl From<VectorRecord> for PineconeVector {
    fn from(record: VectorRecord) -> Self {
        Self {
            metadata: record.metadata.to_metadata(),
            id: record.id,
            values: record.values,
        }
    }
}

impl From<PineconeVector> for VectorRecord {
    fn from(vector: PineconeVector) -> Self {
        Self {
            id: vector.id,
            values: vector.values,
            metadata: Row::from_json_object(&vector.metadata),
        }
    }
}

pub struct PineconeClient {
    client: Client,
    api_key: String,
    index_host: String,
}

impl PineconeClient {
    pub fn new(api_key: String, index_host: &str) -> Self {
        let index_host = if index_host.starts_with("http://") || index_host.starts_with("https://")
        {
            index_host.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", index_host.trim_end_matches('/'))
        };

        Self {
            client: Client::new(),
            api_key,
            index_host,
        }
    }

    /// Looks up the data-plane host of `index_name`.
    pub async fn connect(api_key: String, index_name: &str) -> Result<Self> {
        let client = Client::new();
        let url = format!("{}/indexes/{}", CONTROL_PLANE_URL, index_name);

        info!("Resolving Pinecone index '{}'", index_name);

        let response = client
            .get(&url)
            .header("Api-Key", &api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .send()
            .await
            .map_err(|e| {
                MigrationError::VectorStore(format!("Failed to describe index {}: {}", index_name, e))
            })?;

        let response = check_status(response, MigrationError::VectorStore).await?;
        let described: DescribeIndexResponse = response.json().await.map_err(|e| {
            MigrationError::VectorStore(format!("Failed to parse describe_index response: {}", e))
        })?;

        debug!("Index '{}' served from {}", index_name, described.host);
        Ok(Self::new(api_key, &described.host))
    }

    pub fn index_host(&self) -> &str {
        &self.index_host
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .header("Content-Type", "application/json")
    }
}

async fn check_status(
    response: Response,
    wrap: impl FnOnce(String) -> MigrationError,
) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(wrap(format!(
        "Pinecone request failed with status {}: {}",
        status, error_text
    )))
}

#[async_trait]
impl VectorStore for PineconeClient {
    async fn embed(
        &self,
        model: &str,
        texts: &[String],
        options: &EmbedOptions,
    ) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbedRequest {
            model,
            parameters: options,
            inputs: texts.iter().map(|text| EmbedInput { text }).collect(),
        };

        debug!("Requesting {} embeddings from model {}", texts.len(), model);

        let response = self
            .authorized(self.client.post(format!("{}/embed", CONTROL_PLANE_URL)))
            .json(&request)
            .send()
            .await
            .map_err(|e| MigrationError::Embedding(format!("Failed to send embed request: {}", e)))?;

        let response = check_status(response, MigrationError::Embedding).await?;
        let embedded: EmbedResponse = response.json().await.map_err(|e| {
            MigrationError::Embedding(format!("Failed to parse embed response: {}", e))
        })?;

        Ok(embedded.data.into_iter().map(|d| d.values).collect())
    }

    async fn upsert_batch(&self, namespace: &str, records: Vec<VectorRecord>) -> Result<()> {
        let count = records.len();
        let request = UpsertRequest {
            vectors: records.into_iter().map(PineconeVector::from).collect(),
            namespace,
        };

        let response = self
            .authorized(self.client.post(format!("{}/vectors/upsert", self.index_host)))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                MigrationError::VectorStore(format!("Failed to send upsert request: {}", e))
            })?;

        check_status(response, MigrationError::VectorStore).await?;
        debug!("Upserted {} vectors into namespace '{}'", count, namespace);
        Ok(())
    }

    async fn delete_many(&self, namespace: &str, ids: &[String]) -> Result<()> {
        let request = DeleteRequest { ids, namespace };

        let response = self
            .authorized(self.client.post(format!("{}/vectors/delete", self.index_host)))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                MigrationError::VectorStore(format!("Failed to send delete request: {}", e))
            })?;

        check_status(response, MigrationError::VectorStore).await?;
        Ok(())
    }

    async fn fetch(&self, namespace: &str, ids: &[String]) -> Result<Vec<VectorRecord>> {
        let mut query: Vec<(&str, &str)> = ids.iter().map(|id| ("ids", id.as_str())).collect();
        query.push(("namespace", namespace));

        let response = self
            .authorized(self.client.get(format!("{}/vectors/fetch", self.index_host)))
            .query(&query)
            .send()
            .await
            .map_err(|e| {
                MigrationError::VectorStore(format!("Failed to send fetch request: {}", e))
            })?;

        let response = check_status(response, MigrationError::VectorStore).await?;
        let fetched: FetchResponse = response.json().await.map_err(|e| {
            MigrationError::VectorStore(format!("Failed to parse fetch response: {}", e))
        })?;

        Ok(order_by_ids(fetched.vectors, ids))
    }
}

/// Fetch answers with an unordered map; hand records back in request order.
fn order_by_ids(mut vectors: HashMap<String, PineconeVector>, ids: &[String]) -> Vec<VectorRecord> {
    ids.iter()
        .filter_map(|id| vectors.remove(id))
        .map(VectorRecord::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SqlValue;
    use serde_json::json;

    #[test]
    fn test_host_normalization() {
        let bare = PineconeClient::new("k".into(), "rows-abc.svc.pinecone.io/");
        assert_eq!(bare.index_host(), "https://rows-abc.svc.pinecone.io");

        let local = PineconeClient::new("k".into(), "http://localhost:5081");
        assert_eq!(local.index_host(), "http://localhost:5081");
    }

    #[test]
    fn test_embed_request_shape() {
        let options = EmbedOptions::passage();
        let texts = vec!["Ann".to_string(), "Bob".to_string()];
        let request = EmbedRequest {
            model: "llama-text-embed-v2",
            parameters: &options,
            inputs: texts.iter().map(|text| EmbedInput { text }).collect(),
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "model": "llama-text-embed-v2",
                "parameters": {"input_type": "passage", "truncate": "END"},
                "inputs": [{"text": "Ann"}, {"text": "Bob"}]
            })
        );
    }

    #[test]
    fn test_embed_response_keeps_order() {
        let body = json!({
            "model": "llama-text-embed-v2",
            "vector_type": "dense",
            "data": [
                {"values": [0.1, 0.2], "vector_type": "dense"},
                {"values": [0.3, 0.4], "vector_type": "dense"}
            ],
            "usage": {"total_tokens": 4}
        });

        let parsed: EmbedResponse = serde_json::from_value(body).unwrap();
        let vectors: Vec<Vec<f32>> = parsed.data.into_iter().map(|d| d.values).collect();
        assert_eq!(vectors, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
    }

    #[test]
    fn test_upsert_payload_drops_null_metadata() {
        let metadata: Row = [
            ("id", SqlValue::Int(1)),
            ("name", SqlValue::from("Ann")),
            ("nickname", SqlValue::Null),
            ("text", SqlValue::from("Ann")),
        ]
        .into_iter()
        .collect();

        let request = UpsertRequest {
            vectors: vec![PineconeVector::from(VectorRecord {
                id: "1".to_string(),
                values: vec![0.5],
                metadata,
            })],
            namespace: "users",
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "vectors": [{
                    "id": "1",
                    "values": [0.5],
                    "metadata": {"id": 1, "name": "Ann", "text": "Ann"}
                }],
                "namespace": "users"
            })
        );
    }

    #[test]
    fn test_fetch_results_follow_requested_order() {
        let body = json!({
            "vectors": {
                "2": {"id": "2", "values": [2.0], "metadata": {"name": "Bob"}},
                "1": {"id": "1", "values": [1.0]}
            },
            "namespace": "users"
        });

        let parsed: FetchResponse = serde_json::from_value(body).unwrap();
        let ids = vec!["1".to_string(), "2".to_string(), "3".to_string()];
        let records = order_by_ids(parsed.vectors, &ids);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "1");
        assert_eq!(records[1].metadata.get("name"), Some(&SqlValue::from("Bob")));
    }
}
