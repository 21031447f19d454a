// file: src/database/mssql.rs
// description: sql server collaborator over a single tiberius TDS connection
// reference: https://docs.rs/tiberius

use crate::database::client::SqlDatabase;
use crate::database::dialect::Dialect;
use crate::error::{MigrationError, Result};
use crate::models::{Row, SqlValue};
use async_stream::try_stream;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use futures::TryStreamExt;
use futures::stream::BoxStream;
use tiberius::{Client, ColumnData, Config as TdsConfig, FromSql};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info};

type TdsClient = Client<Compat<TcpStream>>;

/// The TDS client needs `&mut` for every request, so the single connection
/// sits behind a mutex; `None` once closed.
pub struct MsSqlDatabase {
    client: String,
    connection: Mutex<Option<TdsClient>>,
}

impl MsSqlDatabase {
    /// `connection_string` uses ADO.NET syntax, e.g.
    /// `server=tcp:localhost,1433;user=sa;password=...;TrustServerCertificate=true`.
    pub async fn connect(client: &str, connection_string: &str) -> Result<Self> {
        let config = TdsConfig::from_ado_string(connection_string).map_err(|e| {
            MigrationError::Config(format!("Invalid sql server connection string: {}", e))
        })?;

        info!("Connecting to sql server at {}", config.get_addr());

        let tcp = TcpStream::connect(config.get_addr()).await?;
        tcp.set_nodelay(true)?;

        let connection = Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| {
                MigrationError::Database(format!("Failed to connect to sql server: {}", e))
            })?;

        Ok(Self {
            client: client.to_string(),
            connection: Mutex::new(Some(connection)),
        })
    }
}

fn closed() -> MigrationError {
    MigrationError::Database("sql server connection already closed".to_string())
}

#[async_trait]
impl SqlDatabase for MsSqlDatabase {
    fn client(&self) -> &str {
        &self.client
    }

    async fn run_raw_query(&self, sql: &str) -> Result<Vec<Row>> {
        debug!("sql server query: {}", sql);
        let mut guard = self.connection.lock().await;
        let connection = guard.as_mut().ok_or_else(closed)?;

        let rows = connection
            .simple_query(sql)
            .await?
            .into_first_result()
            .await?;

        rows.iter().map(decode_row).collect()
    }

    async fn list_columns(&self, table: &str) -> Result<Vec<Row>> {
        self.run_raw_query(&Dialect::MsSql.list_columns_sql(table))
            .await
    }

    fn stream_rows<'a>(&'a self, table: &'a str) -> BoxStream<'a, Result<Row>> {
        Box::pin(try_stream! {
            let sql = Dialect::MsSql.select_all_sql(table);
            let mut guard = self.connection.lock().await;
            let connection = guard.as_mut().ok_or_else(closed)?;
            let mut rows = connection.simple_query(sql).await?.into_row_stream();
            while let Some(row) = rows.try_next().await? {
                yield decode_row(&row)?;
            }
        })
    }

    async fn close(&self) -> Result<()> {
        if let Some(connection) = self.connection.lock().await.take() {
            connection.close().await?;
        }
        Ok(())
    }
}

fn decode_row(row: &tiberius::Row) -> Result<Row> {
    let mut decoded = Row::with_capacity(row.len());
    for (column, data) in row.cells() {
        decoded.insert(column.name(), decode_value(data)?);
    }
    Ok(decoded)
}

#[allow(unreachable_patterns)]
fn decode_value(data: &ColumnData<'static>) -> Result<SqlValue> {
    let value: SqlValue = match data {
        ColumnData::U8(v) => v.map(i64::from).into(),
        ColumnData::I16(v) => v.map(i64::from).into(),
        ColumnData::I32(v) => v.map(i64::from).into(),
        ColumnData::I64(v) => (*v).into(),
        ColumnData::F32(v) => v.map(f64::from).into(),
        ColumnData::F64(v) => (*v).into(),
        ColumnData::Bit(v) => (*v).into(),
        ColumnData::String(v) => v.as_ref().map(|s| s.to_string()).into(),
        ColumnData::Guid(v) => v.as_ref().map(|g| g.to_string()).into(),
        ColumnData::Numeric(v) => v.as_ref().map(|n| n.to_string()).into(),
        ColumnData::Binary(v) => v
            .as_ref()
            .map(|b| SqlValue::Bytes(b.to_vec()))
            .unwrap_or(SqlValue::Null),
        ColumnData::DateTimeOffset(_) => DateTime::<FixedOffset>::from_sql(data)?
            .map(|t| t.to_rfc3339())
            .into(),
        ColumnData::Date(_) => NaiveDate::from_sql(data)?.map(|d| d.to_string()).into(),
        ColumnData::Time(_) => NaiveTime::from_sql(data)?.map(|t| t.to_string()).into(),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            NaiveDateTime::from_sql(data)?
                .map(|t| t.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
                .into()
        }
        other => {
            debug!("Leaving unsupported sql server value as null: {:?}", other);
            SqlValue::Null
        }
    };
    Ok(value)
}
