// file: src/schema/classifier.rs
// description: turns flat column metadata into per-table primary key and text columns
// reference: information_schema data_type names across postgres, mysql and sql server

use crate::models::{ColumnMetadataRow, DatabaseSchema, Row, TableSchema};

/// Catalog type names that carry embeddable text. Matched exactly and case-sensitively.
pub const TEXT_TYPES: &[&str] = &[
    // general
    "text",
    "varchar",
    "char",
    "json",
    // postgres
    "character varying",
    "jsonb",
    // mysql
    "tinytext",
    "mediumtext",
    "longtext",
    // sql server
    "nvarchar",
    "nchar",
    "ntext",
];

/// Substrings of a sqlite declared type that mark a text column.
const SQLITE_TEXT_MARKERS: &[&str] = &["CHAR", "TEXT", "JSON"];

pub fn is_text_type(data_type: &str) -> bool {
    TEXT_TYPES.contains(&data_type)
}

/// SQLite declared types are free-form (`VARCHAR(80)`, `nvarchar`, `JSON`),
/// so they are matched by substring, ignoring case.
pub fn is_sqlite_text_type(declared_type: &str) -> bool {
    let upper = declared_type.to_uppercase();
    SQLITE_TEXT_MARKERS.iter().any(|marker| upper.contains(marker))
}

/// Builds a schema from catalog rows in the order given. The first primary
/// key row of a table wins; text columns are appended without de-duplication.
pub fn classify_rows<'a, I>(rows: I) -> DatabaseSchema
where
    I: IntoIterator<Item = &'a ColumnMetadataRow>,
{
    let mut schema = DatabaseSchema::new();

    for row in rows {
        let table = schema.entry(&row.table_name);

        if row.is_primary_key() {
            table.offer_primary_key(&row.column_name);
        }

        if is_text_type(&row.data_type) {
            table.push_text_column(&row.column_name);
        }
    }

    schema
}

/// Builds one table's schema from `PRAGMA table_info` rows (`name`, `type`, `pk`).
pub fn classify_sqlite_columns(columns: &[Row]) -> TableSchema {
    let mut table = TableSchema::default();

    for column in columns {
        let Some(name) = column.get_ignore_case("name").and_then(|v| v.as_str()) else {
            continue;
        };

        let pk_position = column
            .get_ignore_case("pk")
            .and_then(|v| v.as_i64())
            .unwrap_or(0);
        if pk_position > 0 {
            table.offer_primary_key(name);
        }

        let declared = column
            .get_ignore_case("type")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        if is_sqlite_text_type(declared) {
            table.push_text_column(name);
        }
    }

    table
}
