// file: src/pipeline/mapper.rs
// description: maps one database row to an embedding-ready record
// reference: internal data transformation

use crate::models::{EligibleTable, EmbeddingRecord, Row, SqlValue};

/// Space-joins the truthy values of `text_columns`, in column order.
pub fn build_text(row: &Row, text_columns: &[String]) -> String {
    text_columns
        .iter()
        .filter_map(|column| row.get(column))
        .filter(|value| value.is_truthy())
        .map(SqlValue::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Returns `None` when the row has no embeddable text. The metadata is an
/// independent copy of `row` with `text_field` set to the joined text.
pub fn map_row(row: &Row, table: &EligibleTable<'_>, text_field: &str) -> Option<EmbeddingRecord> {
    let text = build_text(row, table.text_columns);
    if text.is_empty() {
        return None;
    }

    let id = row
        .get(table.primary_key)
        .unwrap_or(&SqlValue::Null)
        .to_string();

    let mut metadata = row.clone();
    metadata.insert(text_field, text.clone());

    Some(EmbeddingRecord { id, text, metadata })
}
