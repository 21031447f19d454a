// file: src/schema/discovery.rs
// description: discovers primary keys and text columns for every table of a database
// reference: internal schema discovery workflow

use crate::database::{Dialect, Introspection, SqlDatabase};
use crate::error::{MigrationError, Result};
use crate::models::{ColumnMetadataRow, DatabaseSchema};
use crate::schema::classifier::{classify_rows, classify_sqlite_columns};
use tracing::{debug, info};

pub struct SchemaDiscovery<'a> {
    db: &'a dyn SqlDatabase,
}

impl<'a> SchemaDiscovery<'a> {
    pub fn new(db: &'a dyn SqlDatabase) -> Self {
        Self { db }
    }

    /// Re-discovers the whole schema. The dialect is resolved before any
    /// query is issued.
    pub async fn discover(&self) -> Result<DatabaseSchema> {
        let dialect = Dialect::from_client(self.db.client())?;
        debug!("Discovering schema for dialect {}", dialect);

        let schema = match dialect.introspection() {
            Introspection::Catalog(sql) => self.discover_from_catalog(sql).await?,
            Introspection::PerTable => self.discover_per_table(dialect).await?,
        };

        info!("Discovered {} tables", schema.len());
        Ok(schema)
    }

    async fn discover_from_catalog(&self, sql: &str) -> Result<DatabaseSchema> {
        let rows = self.db.run_raw_query(sql).await?;
        let columns: Vec<ColumnMetadataRow> = rows.iter().map(ColumnMetadataRow::from_row).collect();
        debug!("Catalog returned {} column rows", columns.len());
        Ok(classify_rows(&columns))
    }

    async fn discover_per_table(&self, dialect: Dialect) -> Result<DatabaseSchema> {
        let tables = self.db.run_raw_query(dialect.list_tables_sql()).await?;
        let mut schema = DatabaseSchema::new();

        for table in &tables {
            let name = table
                .get_ignore_case("name")
                .and_then(|v| v.as_str())
                .ok_or_else(|| {
                    MigrationError::Database("Table listing row has no name".to_string())
                })?;

            let columns = self.db.list_columns(name).await?;
            schema.insert(name, classify_sqlite_columns(&columns));
        }

        Ok(schema)
    }
}
