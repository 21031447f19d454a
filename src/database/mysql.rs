// file: src/database/mysql.rs
// description: mysql / mariadb collaborator backed by a single-connection sqlx pool
// reference: https://docs.rs/sqlx/latest/sqlx/mysql

use crate::database::client::SqlDatabase;
use crate::database::dialect::Dialect;
use crate::error::{MigrationError, Result};
use crate::models::{Row, SqlValue};
use async_stream::try_stream;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures::TryStreamExt;
use futures::stream::BoxStream;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::types::Decimal;
use sqlx::{Column, Row as _, TypeInfo};
use tracing::{debug, info};

pub struct MySqlDatabase {
    client: String,
    pool: MySqlPool,
}

impl MySqlDatabase {
    pub async fn connect(client: &str, connection_string: &str) -> Result<Self> {
        info!("Connecting to mysql");

        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .connect(connection_string)
            .await
            .map_err(|e| MigrationError::Database(format!("Failed to connect to mysql: {}", e)))?;

        Ok(Self {
            client: client.to_string(),
            pool,
        })
    }
}

#[async_trait]
impl SqlDatabase for MySqlDatabase {
    fn client(&self) -> &str {
        &self.client
    }

    async fn run_raw_query(&self, sql: &str) -> Result<Vec<Row>> {
        debug!("mysql query: {}", sql);
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn list_columns(&self, table: &str) -> Result<Vec<Row>> {
        self.run_raw_query(&Dialect::MySql.list_columns_sql(table))
            .await
    }

    fn stream_rows<'a>(&'a self, table: &'a str) -> BoxStream<'a, Result<Row>> {
        Box::pin(try_stream! {
            let sql = Dialect::MySql.select_all_sql(table);
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

fn decode_row(row: &MySqlRow) -> Result<Row> {
    let mut decoded = Row::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        let value = decode_value(row, idx, column.type_info().name())?;
        decoded.insert(column.name(), value);
    }
    Ok(decoded)
}

/// Values past `i64::MAX` stay exact as text; a float would merge nearby ids.
fn unsigned_value(n: u64) -> SqlValue {
    i64::try_from(n)
        .map(SqlValue::Int)
        .unwrap_or_else(|_| SqlValue::Text(n.to_string()))
}

fn decode_value(row: &MySqlRow, idx: usize, type_name: &str) -> Result<SqlValue> {
    let value: SqlValue = match type_name {
        "NULL" => SqlValue::Null,
        "BOOLEAN" => row.try_get::<Option<bool>, _>(idx)?.into(),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            row.try_get_unchecked::<Option<i64>, _>(idx)?.into()
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => row
            .try_get_unchecked::<Option<u64>, _>(idx)?
            .map(unsigned_value)
            .unwrap_or(SqlValue::Null),
        "FLOAT" => row.try_get::<Option<f32>, _>(idx)?.map(f64::from).into(),
        "DOUBLE" => row.try_get::<Option<f64>, _>(idx)?.into(),
        "DECIMAL" => row
            .try_get::<Option<Decimal>, _>(idx)?
            .map(|d| d.to_string())
            .into(),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(idx)?
            .map(|d| d.to_string())
            .into(),
        "TIME" => row
            .try_get::<Option<NaiveTime>, _>(idx)?
            .map(|t| t.to_string())
            .into(),
        "DATETIME" => row
            .try_get::<Option<NaiveDateTime>, _>(idx)?
            .map(|t| t.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
            .into(),
        "TIMESTAMP" => row
            .try_get::<Option<DateTime<Utc>>, _>(idx)?
            .map(|t| t.to_rfc3339())
            .into(),
        "JSON" => row
            .try_get::<Option<serde_json::Value>, _>(idx)?
            .map(|v| v.to_string())
            .into(),
        "BIT" | "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB"
        | "GEOMETRY" => row
            .try_get_unchecked::<Option<Vec<u8>>, _>(idx)?
            .map(SqlValue::Bytes)
            .unwrap_or(SqlValue::Null),
        // char, varchar, text variants, enum, set
        _ => match row.try_get_unchecked::<Option<String>, _>(idx) {
            Ok(text) => text.into(),
            Err(_) => row
                .try_get_unchecked::<Option<Vec<u8>>, _>(idx)?
                .map(SqlValue::Bytes)
                .unwrap_or(SqlValue::Null),
        },
    };
    Ok(value)
}
