// file: src/testing.rs
// description: in-memory database and vector store doubles for unit tests
// reference: internal test support

use crate::database::SqlDatabase;
use crate::error::{MigrationError, Result};
use crate::models::{Row, SqlValue, VectorRecord};
use crate::vector::{EmbedOptions, VectorStore};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
struct DatabaseLog {
    queries: Vec<String>,
    reads: Vec<String>,
    closed: bool,
}

/// Answers every raw query with the configured catalog rows and serves
/// table scans from memory.
pub struct MockDatabase {
    client: String,
    catalog: Vec<Row>,
    tables: HashMap<String, Vec<Row>>,
    fail_reads: bool,
    log: Mutex<DatabaseLog>,
}

impl MockDatabase {
    pub fn new(client: &str) -> Self {
        Self {
            client: client.to_string(),
            catalog: Vec::new(),
            tables: HashMap::new(),
            fail_reads: false,
            log: Mutex::new(DatabaseLog::default()),
        }
    }

    /// Catalog rows as `(table, column, data_type, is_primary_key)`.
    pub fn with_catalog(mut self, rows: Vec<(&str, &str, &str, &str)>) -> Self {
        self.catalog = rows
            .into_iter()
            .map(|(table, column, data_type, pk)| {
                [
                    ("table_name", table),
                    ("column_name", column),
                    ("data_type", data_type),
                    ("is_primary_key", pk),
                ]
                .into_iter()
                .collect()
            })
            .collect();
        self
    }

    pub fn with_table(mut self, name: &str, rows: Vec<Row>) -> Self {
        self.tables.insert(name.to_string(), rows);
        self
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.log.lock().unwrap().queries.clone()
    }

    pub fn reads(&self) -> Vec<String> {
        self.log.lock().unwrap().reads.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.log.lock().unwrap().closed
    }
}

#[async_trait]
impl SqlDatabase for MockDatabase {
    fn client(&self) -> &str {
        &self.client
    }

    async fn run_raw_query(&self, sql: &str) -> Result<Vec<Row>> {
        self.log.lock().unwrap().queries.push(sql.to_string());
        Ok(self.catalog.clone())
    }

    async fn list_columns(&self, table: &str) -> Result<Vec<Row>> {
        self.log
            .lock()
            .unwrap()
            .queries
            .push(format!("columns:{}", table));
        Ok(Vec::new())
    }

    fn stream_rows<'a>(&'a self, table: &'a str) -> BoxStream<'a, Result<Row>> {
        self.log.lock().unwrap().reads.push(table.to_string());

        if self.fail_reads {
            let error = MigrationError::Database(format!("read of {} failed", table));
            return stream::once(async move { Err(error) }).boxed();
        }

        let rows = self.tables.get(table).cloned().unwrap_or_default();
        stream::iter(rows.into_iter().map(Ok)).boxed()
    }

    async fn close(&self) -> Result<()> {
        self.log.lock().unwrap().closed = true;
        Ok(())
    }
}

/// Builds a table of `count` rows with an integer `id` and a `name`.
pub fn numbered_rows(count: usize) -> Vec<Row> {
    (0..count)
        .map(|i| {
            [
                ("id", SqlValue::Int(i as i64)),
                ("name", SqlValue::Text(format!("row {}", i))),
            ]
            .into_iter()
            .collect()
        })
        .collect()
}

#[derive(Default)]
struct StoreLog {
    embed_calls: Vec<Vec<String>>,
    upserts: Vec<(String, Vec<VectorRecord>)>,
    deletes: Vec<(String, Vec<String>)>,
}

/// Deterministic embeddings derived from each text, plus recorded writes.
#[derive(Default)]
pub struct MockVectorStore {
    fail_embed: bool,
    fail_upsert: bool,
    fail_maintenance: bool,
    short_embeddings: bool,
    log: Mutex<StoreLog>,
}

impl MockVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_embed(mut self) -> Self {
        self.fail_embed = true;
        self
    }

    pub fn failing_upsert(mut self) -> Self {
        self.fail_upsert = true;
        self
    }

    pub fn failing_maintenance(mut self) -> Self {
        self.fail_maintenance = true;
        self
    }

    /// Returns one vector fewer than requested.
    pub fn short_embeddings(mut self) -> Self {
        self.short_embeddings = true;
        self
    }

    pub fn embed_calls(&self) -> Vec<Vec<String>> {
        self.log.lock().unwrap().embed_calls.clone()
    }

    pub fn upserts(&self) -> Vec<(String, Vec<VectorRecord>)> {
        self.log.lock().unwrap().upserts.clone()
    }

    pub fn deletes(&self) -> Vec<(String, Vec<String>)> {
        self.log.lock().unwrap().deletes.clone()
    }

    pub fn vector_for(text: &str) -> Vec<f32> {
        vec![text.len() as f32, text.bytes().map(f32::from).sum()]
    }
}

#[async_trait]
impl VectorStore for MockVectorStore {
    async fn embed(
        &self,
        _model: &str,
        texts: &[String],
        _options: &EmbedOptions,
    ) -> Result<Vec<Vec<f32>>> {
        self.log.lock().unwrap().embed_calls.push(texts.to_vec());

        if self.fail_embed {
            return Err(MigrationError::Embedding("embed quota exceeded".to_string()));
        }

        let mut vectors: Vec<Vec<f32>> = texts.iter().map(|t| Self::vector_for(t)).collect();
        if self.short_embeddings {
            vectors.pop();
        }
        Ok(vectors)
    }

    async fn upsert_batch(&self, namespace: &str, records: Vec<VectorRecord>) -> Result<()> {
        if self.fail_upsert {
            return Err(MigrationError::VectorStore("upsert rejected".to_string()));
        }

        self.log
            .lock()
            .unwrap()
            .upserts
            .push((namespace.to_string(), records));
        Ok(())
    }

    async fn delete_many(&self, namespace: &str, ids: &[String]) -> Result<()> {
        if self.fail_maintenance {
            return Err(MigrationError::VectorStore("delete rejected".to_string()));
        }

        self.log
            .lock()
            .unwrap()
            .deletes
            .push((namespace.to_string(), ids.to_vec()));
        Ok(())
    }

    async fn fetch(&self, namespace: &str, ids: &[String]) -> Result<Vec<VectorRecord>> {
        if self.fail_maintenance {
            return Err(MigrationError::VectorStore("fetch rejected".to_string()));
        }

        let log = self.log.lock().unwrap();
        Ok(log
            .upserts
            .iter()
            .filter(|(ns, _)| ns == namespace)
            .flat_map(|(_, records)| records.iter())
            .filter(|record| ids.contains(&record.id))
            .cloned()
            .collect())
    }
}
