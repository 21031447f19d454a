// file: src/vector/lance.rs
// description: local LanceDB vector store with one table per namespace
// reference: https://docs.rs/lancedb

use crate::error::{MigrationError, Result};
use crate::models::{Row, VectorRecord};
use crate::vector::embeddings::OpenAiEmbeddingClient;
use crate::vector::store::{EmbedOptions, VectorStore};
use arrow_array::types::Float32Type;
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
};
use arrow_schema::{DataType, Field, Schema};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, Table, connect};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

pub struct LanceDbStore {
    connection: Connection,
    index_name: String,
    embedder: OpenAiEmbeddingClient,
}

impl LanceDbStore {
    pub async fn new(uri: &str, index_name: &str, embedder: OpenAiEmbeddingClient) -> Result<Self> {
        info!("Connecting to LanceDB at {}", uri);

        let connection = connect(uri).execute().await.map_err(|e| {
            MigrationError::VectorStore(format!("Failed to connect to LanceDB: {}", e))
        })?;

        Ok(Self {
            connection,
            index_name: index_name.to_string(),
            embedder,
        })
    }

    /// LanceDB has no namespaces; each one gets its own table.
    pub fn table_name(&self, namespace: &str) -> String {
        format!("{}__{}", self.index_name, namespace)
    }

    async fn table_exists(&self, table_name: &str) -> Result<bool> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| MigrationError::VectorStore(format!("Failed to list tables: {}", e)))?;

        Ok(table_names.iter().any(|name| name == table_name))
    }

    async fn get_table(&self, table_name: &str) -> Result<Table> {
        self.connection
            .open_table(table_name)
            .execute()
            .await
            .map_err(|e| {
                MigrationError::VectorStore(format!("Failed to open table {}: {}", table_name, e))
            })
    }

    /// Arrow schema of a namespace table: id, embedding, and the row metadata as JSON.
    pub fn vectors_schema(dimension: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    dimension as i32,
                ),
                false,
            ),
            Field::new("metadata", DataType::Utf8, false),
        ]))
    }

    fn create_record_batch(schema: Arc<Schema>, records: &[VectorRecord]) -> Result<RecordBatch> {
        let dimension = records.first().map(VectorRecord::dimension).unwrap_or(0);
        if let Some(bad) = records.iter().find(|r| r.dimension() != dimension) {
            return Err(MigrationError::VectorStore(format!(
                "Vector for id {} has dimension {}, expected {}",
                bad.id,
                bad.dimension(),
                dimension
            )));
        }

        let ids = StringArray::from_iter_values(records.iter().map(|r| r.id.as_str()));

        let vectors = FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
            records
                .iter()
                .map(|r| Some(r.values.iter().copied().map(Some).collect::<Vec<_>>())),
            dimension as i32,
        );

        let metadata = records
            .iter()
            .map(|r| serde_json::to_string(&r.metadata))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let metadata = StringArray::from_iter_values(metadata);

        RecordBatch::try_new(
            schema,
            vec![Arc::new(ids), Arc::new(vectors), Arc::new(metadata)],
        )
        .map_err(|e| MigrationError::VectorStore(format!("Failed to create record batch: {}", e)))
    }
}

fn id_predicate(ids: &[String]) -> String {
    let quoted: Vec<String> = ids
        .iter()
        .map(|id| format!("'{}'", id.replace('\'', "''")))
        .collect();
    format!("id IN ({})", quoted.join(", "))
}

fn read_records(batch: &RecordBatch) -> Result<Vec<VectorRecord>> {
    let ids = batch
        .column_by_name("id")
        .ok_or_else(|| MigrationError::VectorStore("Missing 'id' column".to_string()))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| MigrationError::VectorStore("Invalid 'id' column type".to_string()))?;

    let vectors = batch
        .column_by_name("vector")
        .ok_or_else(|| MigrationError::VectorStore("Missing 'vector' column".to_string()))?
        .as_any()
        .downcast_ref::<FixedSizeListArray>()
        .ok_or_else(|| MigrationError::VectorStore("Invalid 'vector' column type".to_string()))?;

    let metadata = batch
        .column_by_name("metadata")
        .ok_or_else(|| MigrationError::VectorStore("Missing 'metadata' column".to_string()))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| {
            MigrationError::VectorStore("Invalid 'metadata' column type".to_string())
        })?;

    let mut records = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let list = vectors.value(i);
        let values = list
            .as_any()
            .downcast_ref::<Float32Array>()
            .ok_or_else(|| MigrationError::VectorStore("Invalid vector item type".to_string()))?
            .values()
            .to_vec();

        let object: Map<String, Value> = serde_json::from_str(metadata.value(i))?;

        records.push(VectorRecord {
            id: ids.value(i).to_string(),
            values,
            metadata: Row::from_json_object(&object),
        });
    }

    Ok(records)
}

#[async_trait]
impl VectorStore for LanceDbStore {
    async fn embed(
        &self,
        model: &str,
        texts: &[String],
        options: &EmbedOptions,
    ) -> Result<Vec<Vec<f32>>> {
        debug!(
            "Embedding options {:?} are not forwarded to OpenAI-compatible endpoints",
            options
        );
        self.embedder.generate_embeddings(model, texts).await
    }

    async fn upsert_batch(&self, namespace: &str, records: Vec<VectorRecord>) -> Result<()> {
        let Some(first) = records.first() else {
            return Ok(());
        };

        let schema = Self::vectors_schema(first.dimension());
        let record_batch = Self::create_record_batch(schema.clone(), &records)?;
        let table_name = self.table_name(namespace);

        if !self.table_exists(&table_name).await? {
            self.connection
                .create_table(
                    &table_name,
                    RecordBatchIterator::new(vec![Ok(record_batch)], schema),
                )
                .execute()
                .await
                .map_err(|e| {
                    MigrationError::VectorStore(format!("Failed to create table: {}", e))
                })?;
            info!("Created new table: {}", table_name);
        } else {
            let table = self.get_table(&table_name).await?;
            let mut merge = table.merge_insert(&["id"]);
            merge
                .when_matched_update_all(None)
                .when_not_matched_insert_all();
            merge
                .execute(Box::new(RecordBatchIterator::new(
                    vec![Ok(record_batch)],
                    schema,
                )))
                .await
                .map_err(|e| {
                    MigrationError::VectorStore(format!(
                        "Failed to upsert into {}: {}",
                        table_name, e
                    ))
                })?;
        }

        debug!("Upserted {} vectors into {}", records.len(), table_name);
        Ok(())
    }

    async fn delete_many(&self, namespace: &str, ids: &[String]) -> Result<()> {
        let table_name = self.table_name(namespace);
        if ids.is_empty() || !self.table_exists(&table_name).await? {
            return Ok(());
        }

        let table = self.get_table(&table_name).await?;
        table.delete(&id_predicate(ids)).await.map_err(|e| {
            MigrationError::VectorStore(format!("Failed to delete from {}: {}", table_name, e))
        })?;
        Ok(())
    }

    async fn fetch(&self, namespace: &str, ids: &[String]) -> Result<Vec<VectorRecord>> {
        let table_name = self.table_name(namespace);
        if ids.is_empty() || !self.table_exists(&table_name).await? {
            return Ok(Vec::new());
        }

        let table = self.get_table(&table_name).await?;
        let batches: Vec<RecordBatch> = table
            .query()
            .only_if(id_predicate(ids))
            .execute()
            .await
            .map_err(|e| MigrationError::VectorStore(format!("Fetch query failed: {}", e)))?
            .try_collect()
            .await
            .map_err(|e| {
                MigrationError::VectorStore(format!("Failed to read result batch: {}", e))
            })?;

        let mut found: HashMap<String, VectorRecord> = HashMap::new();
        for batch in &batches {
            for record in read_records(batch)? {
                found.insert(record.id.clone(), record);
            }
        }

        Ok(ids.iter().filter_map(|id| found.remove(id)).collect())
    }
}
