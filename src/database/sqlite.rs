// file: src/database/sqlite.rs
// description: sqlite collaborator backed by a single-connection sqlx pool
// reference: https://docs.rs/sqlx/latest/sqlx/sqlite

use crate::database::client::SqlDatabase;
use crate::database::dialect::Dialect;
use crate::error::{MigrationError, Result};
use crate::models::{Row, SqlValue};
use async_stream::try_stream;
use async_trait::async_trait;
use futures::TryStreamExt;
use futures::stream::BoxStream;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as _, TypeInfo, ValueRef};
use std::str::FromStr;
use tracing::{debug, info};

pub struct SqliteDatabase {
    client: String,
    pool: SqlitePool,
}

impl SqliteDatabase {
    /// `location` is a file path, `:memory:`, or a `sqlite:` url. A missing
    /// file is created.
    pub async fn open(client: &str, location: &str) -> Result<Self> {
        let options = if location == ":memory:" || location.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(location).map_err(|e| {
                MigrationError::Config(format!("Invalid sqlite location {}: {}", location, e))
            })?
        } else {
            SqliteConnectOptions::new()
                .filename(location)
                .create_if_missing(true)
        };

        info!("Opening sqlite database at {}", location);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| {
                MigrationError::Database(format!("Failed to open sqlite database: {}", e))
            })?;

        Ok(Self {
            client: client.to_string(),
            pool,
        })
    }
}

#[async_trait]
impl SqlDatabase for SqliteDatabase {
    fn client(&self) -> &str {
        &self.client
    }

    async fn run_raw_query(&self, sql: &str) -> Result<Vec<Row>> {
        debug!("sqlite query: {}", sql);
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn list_columns(&self, table: &str) -> Result<Vec<Row>> {
        self.run_raw_query(&Dialect::Sqlite.list_columns_sql(table))
            .await
    }

    fn stream_rows<'a>(&'a self, table: &'a str) -> BoxStream<'a, Result<Row>> {
        Box::pin(try_stream! {
            let sql = Dialect::Sqlite.select_all_sql(table);
            let mut rows = sqlx::query(&sql).fetch(&self.pool);
            while let Some(row) = rows.try_next().await? {
                yield decode_row(&row)?;
            }
        })
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// SQLite types values dynamically, so decoding follows the storage class of
/// each value rather than the declared column type.
fn decode_row(row: &SqliteRow) -> Result<Row> {
    let mut decoded = Row::with_capacity(row.len());

    for (idx, column) in row.columns().iter().enumerate() {
        let storage = {
            let raw = row.try_get_raw(idx)?;
            if raw.is_null() {
                None
            } else {
                Some(raw.type_info().name().to_string())
            }
        };

        let value = match storage.as_deref() {
            None => SqlValue::Null,
            Some("INTEGER") | Some("BOOLEAN") => SqlValue::Int(row.try_get_unchecked(idx)?),
            Some("REAL") => SqlValue::Float(row.try_get_unchecked(idx)?),
            Some("BLOB") => SqlValue::Bytes(row.try_get_unchecked(idx)?),
            Some(_) => match row.try_get_unchecked::<String, _>(idx) {
                Ok(text) => SqlValue::Text(text),
                Err(_) => SqlValue::Bytes(row.try_get_unchecked(idx)?),
            },
        };

        decoded.insert(column.name(), value);
    }

    Ok(decoded)
}
