// file: src/models/record.rs
// description: transient embedding records and the vectors written to the index
// reference: internal data structures

use crate::models::value::Row;

/// A row that produced embeddable text, waiting in a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRecord {
    pub id: String,
    pub text: String,
    pub metadata: Row,
}

/// A record paired with its embedding, as upserted into a namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: Row,
}

impl VectorRecord {
    pub fn from_embedding(record: EmbeddingRecord, values: Vec<f32>) -> Self {
        Self {
            id: record.id,
            values,
            metadata: record.metadata,
        }
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }
}
