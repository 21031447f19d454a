// file: src/models/schema.rs
// description: canonical per-table schema shared by every dialect
// reference: internal data structures

use crate::models::value::Row;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One column as reported by a catalog introspection query.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ColumnMetadataRow {
    pub table_name: String,
    pub column_name: String,
    pub data_type: String,
    /// `"YES"` or `"NO"`.
    pub is_primary_key: String,
}

impl ColumnMetadataRow {
    pub fn new(table: &str, column: &str, data_type: &str, primary_key: bool) -> Self {
        Self {
            table_name: table.to_string(),
            column_name: column.to_string(),
            data_type: data_type.to_string(),
            is_primary_key: if primary_key { "YES" } else { "NO" }.to_string(),
        }
    }

    pub fn is_primary_key(&self) -> bool {
        self.is_primary_key == "YES"
    }

    /// Reads the four catalog fields out of a raw result row. Missing fields
    /// come back empty, which leaves the classifier with a partial schema.
    pub fn from_row(row: &Row) -> Self {
        let field = |name: &str| {
            row.get_ignore_case(name)
                .and_then(|value| value.as_str())
                .unwrap_or_default()
                .to_string()
        };

        Self {
            table_name: field("table_name"),
            column_name: field("column_name"),
            data_type: field("data_type"),
            is_primary_key: field("is_primary_key"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSchema {
    pub primary_key: Option<String>,
    pub text_columns: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoPrimaryKey,
    NoTextColumns,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoPrimaryKey => write!(f, "No primary key found."),
            SkipReason::NoTextColumns => write!(f, "No text columns found."),
        }
    }
}

/// A table that passed the eligibility gate.
#[derive(Debug, Clone, Copy)]
pub struct EligibleTable<'a> {
    pub name: &'a str,
    pub primary_key: &'a str,
    pub text_columns: &'a [String],
}

impl TableSchema {
    /// Records `column` as the primary key unless one is already set.
    pub fn offer_primary_key(&mut self, column: &str) {
        if self.primary_key.is_none() {
            self.primary_key = Some(column.to_string());
        }
    }

    pub fn push_text_column(&mut self, column: &str) {
        self.text_columns.push(column.to_string());
    }

    pub fn eligible<'a>(&'a self, name: &'a str) -> std::result::Result<EligibleTable<'a>, SkipReason> {
        let primary_key = self
            .primary_key
            .as_deref()
            .ok_or(SkipReason::NoPrimaryKey)?;

        if self.text_columns.is_empty() {
            return Err(SkipReason::NoTextColumns);
        }

        Ok(EligibleTable {
            name,
            primary_key,
            text_columns: &self.text_columns,
        })
    }
}

/// Table name to schema, iterated in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DatabaseSchema {
    tables: IndexMap<String, TableSchema>,
}

impl DatabaseSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn get(&self, table: &str) -> Option<&TableSchema> {
        self.tables.get(table)
    }

    /// Returns the entry for `table`, creating an empty one on first sight.
    pub fn entry(&mut self, table: &str) -> &mut TableSchema {
        self.tables.entry(table.to_string()).or_default()
    }

    pub fn insert(&mut self, table: &str, schema: TableSchema) {
        self.tables.insert(table.to_string(), schema);
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TableSchema)> {
        self.tables
            .iter()
            .map(|(name, schema)| (name.as_str(), schema))
    }
}
