// file: src/pipeline/batch.rs
// description: streams one table, batches mapped rows, and embeds plus upserts each batch
// reference: batched embedding and upsert workflow

use crate::config::Config;
use crate::database::SqlDatabase;
use crate::error::{MigrationError, Result};
use crate::models::{EligibleTable, EmbeddingRecord, VectorRecord};
use crate::pipeline::mapper::map_row;
use crate::pipeline::progress::{TableProgress, TableStats};
use crate::vector::{EmbedOptions, VectorStore};
use futures::TryStreamExt;
use std::mem;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub model: String,
    pub options: EmbedOptions,
    pub embedding_text_field: String,
    pub batch_size: usize,
}

impl BatchSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.vector.model.clone(),
            options: EmbedOptions::passage(),
            embedding_text_field: config.vector.embedding_text_field.clone(),
            batch_size: config.pipeline.batch_size.max(1),
        }
    }
}

/// Accumulates records until `capacity` is reached. Never holds more than
/// `capacity` records.
#[derive(Debug)]
pub struct Batch {
    records: Vec<EmbeddingRecord>,
    capacity: usize,
}

impl Batch {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, record: EmbeddingRecord) {
        self.records.push(record);
    }

    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drains the batch, leaving it empty.
    pub fn take(&mut self) -> Vec<EmbeddingRecord> {
        mem::replace(&mut self.records, Vec::with_capacity(self.capacity))
    }
}

pub struct BatchingPipeline<'a> {
    store: &'a dyn VectorStore,
    settings: &'a BatchSettings,
}

impl<'a> BatchingPipeline<'a> {
    pub fn new(store: &'a dyn VectorStore, settings: &'a BatchSettings) -> Self {
        Self { store, settings }
    }

    /// Streams every row of `table` into the namespace of the same name.
    pub async fn process_table(
        &self,
        db: &dyn SqlDatabase,
        table: &EligibleTable<'_>,
        progress: &TableProgress,
    ) -> Result<TableStats> {
        let namespace = table.name;
        let mut stats = TableStats::default();
        let mut batch = Batch::new(self.settings.batch_size);
        let mut rows = db.stream_rows(table.name);

        while let Some(row) = rows.try_next().await? {
            stats.rows_read += 1;

            match map_row(&row, table, &self.settings.embedding_text_field) {
                Some(record) => batch.push(record),
                None => {
                    stats.rows_skipped += 1;
                    continue;
                }
            }

            if batch.is_full() {
                info!(
                    "Embedding and upserting batch of {} to namespace '{}'",
                    batch.len(),
                    namespace
                );
                let written = self.flush(namespace, batch.take()).await?;
                stats.record_flush(written);
                progress.update(&stats);
            }
        }

        if !batch.is_empty() {
            info!(
                "Embedding and upserting final batch of {} to namespace '{}'",
                batch.len(),
                namespace
            );
            let written = self.flush(namespace, batch.take()).await?;
            stats.record_flush(written);
        }

        progress.finish(&stats);
        Ok(stats)
    }

    /// One embed call and one upsert call. Embeddings pair with records by
    /// position.
    async fn flush(&self, namespace: &str, records: Vec<EmbeddingRecord>) -> Result<usize> {
        let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();

        let embeddings = self
            .store
            .embed(&self.settings.model, &texts, &self.settings.options)
            .await?;

        if embeddings.len() != records.len() {
            return Err(MigrationError::Embedding(format!(
                "Expected {} embeddings, received {}",
                records.len(),
                embeddings.len()
            )));
        }

        let vectors: Vec<VectorRecord> = records
            .into_iter()
            .zip(embeddings)
            .map(|(record, values)| VectorRecord::from_embedding(record, values))
            .collect();

        let count = vectors.len();
        self.store.upsert_batch(namespace, vectors).await?;
        debug!("Flushed {} records to namespace '{}'", count, namespace);

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Row, SqlValue, TableSchema};
    use crate::pipeline::progress::ProgressTracker;
    use crate::testing::{MockDatabase, MockVectorStore, numbered_rows};
    use pretty_assertions::assert_eq;

    fn settings(batch_size: usize) -> BatchSettings {
        BatchSettings {
            model: "llama-text-embed-v2".to_string(),
            options: EmbedOptions::passage(),
            embedding_text_field: "text".to_string(),
            batch_size,
        }
    }

    fn named_schema() -> TableSchema {
        TableSchema {
            primary_key: Some("id".to_string()),
            text_columns: vec!["name".to_string()],
        }
    }

    async fn run(
        db: &MockDatabase,
        store: &MockVectorStore,
        table: &str,
        batch_size: usize,
    ) -> Result<TableStats> {
        let settings = settings(batch_size);
        let schema = named_schema();
        let eligible = schema.eligible(table).unwrap();
        let tracker = ProgressTracker::hidden();
        let progress = tracker.table(table);
        BatchingPipeline::new(store, &settings)
            .process_table(db, &eligible, &progress)
            .await
    }

    #[test]
    fn test_batch_take_resets() {
        let mut batch = Batch::new(2);
        let record = EmbeddingRecord {
            id: "1".to_string(),
            text: "a".to_string(),
            metadata: Row::new(),
        };
        batch.push(record.clone());
        assert!(!batch.is_full());
        batch.push(record);
        assert!(batch.is_full());

        assert_eq!(batch.take().len(), 2);
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn test_flushes_full_batches_then_remainder() {
        let db = MockDatabase::new("pg").with_table("docs", numbered_rows(250));
        let store = MockVectorStore::new();

        let stats = run(&db, &store, "docs", 100).await.unwrap();

        let sizes: Vec<usize> = store.upserts().iter().map(|(_, r)| r.len()).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
        assert_eq!(store.embed_calls().len(), 3);
        assert_eq!(stats.batches_flushed, 3);
        assert_eq!(stats.records_upserted, 250);
        assert!(store.upserts().iter().all(|(ns, _)| ns == "docs"));
    }

    #[tokio::test]
    async fn test_exact_multiple_has_no_trailing_flush() {
        let db = MockDatabase::new("pg").with_table("docs", numbered_rows(200));
        let store = MockVectorStore::new();

        let stats = run(&db, &store, "docs", 100).await.unwrap();
        assert_eq!(stats.batches_flushed, 2);
    }

    #[tokio::test]
    async fn test_empty_table_never_flushes() {
        let db = MockDatabase::new("pg").with_table("docs", Vec::new());
        let store = MockVectorStore::new();

        let stats = run(&db, &store, "docs", 100).await.unwrap();

        assert_eq!(stats, TableStats::default());
        assert!(store.embed_calls().is_empty());
        assert!(store.upserts().is_empty());
    }

    #[tokio::test]
    async fn test_rows_without_text_do_not_count_toward_batch() {
        let mut rows = numbered_rows(3);
        rows.insert(
            1,
            [("id", SqlValue::Int(99)), ("name", SqlValue::Null)]
                .into_iter()
                .collect(),
        );
        let db = MockDatabase::new("pg").with_table("docs", rows);
        let store = MockVectorStore::new();

        let stats = run(&db, &store, "docs", 3).await.unwrap();

        assert_eq!(stats.rows_read, 4);
        assert_eq!(stats.rows_skipped, 1);
        assert_eq!(stats.batches_flushed, 1);
        let ids: Vec<String> = store.upserts()[0].1.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec!["0", "1", "2"]);
    }

    #[tokio::test]
    async fn test_embeddings_pair_by_position() {
        let db = MockDatabase::new("pg").with_table("docs", numbered_rows(3));
        let store = MockVectorStore::new();

        run(&db, &store, "docs", 10).await.unwrap();

        let texts = &store.embed_calls()[0];
        assert_eq!(texts, &vec!["row 0", "row 1", "row 2"]);

        for record in &store.upserts()[0].1 {
            let text = record.metadata.get("text").and_then(|v| v.as_str()).unwrap();
            assert_eq!(record.values, MockVectorStore::vector_for(text));
        }
    }

    #[tokio::test]
    async fn test_embedding_count_mismatch_fails() {
        let db = MockDatabase::new("pg").with_table("docs", numbered_rows(3));
        let store = MockVectorStore::new().short_embeddings();

        let result = run(&db, &store, "docs", 10).await;

        assert!(matches!(result, Err(MigrationError::Embedding(_))));
        assert!(store.upserts().is_empty());
    }

    #[tokio::test]
    async fn test_upstream_failure_aborts_table() {
        let db = MockDatabase::new("pg").with_table("docs", numbered_rows(250));
        let store = MockVectorStore::new().failing_upsert();

        let result = run(&db, &store, "docs", 100).await;

        assert!(matches!(result, Err(MigrationError::VectorStore(_))));
        assert_eq!(store.embed_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_read_failure_propagates() {
        let db = MockDatabase::new("pg")
            .with_table("docs", numbered_rows(5))
            .failing_reads();
        let store = MockVectorStore::new();

        let result = run(&db, &store, "docs", 100).await;
        assert!(matches!(result, Err(MigrationError::Database(_))));
    }
}
