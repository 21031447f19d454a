// file: src/database/client.rs
// description: relational database collaborator trait and connection factory
// reference: https://docs.rs/sqlx, https://docs.rs/tiberius

use crate::config::DatabaseConfig;
use crate::database::dialect::Dialect;
use crate::database::{MsSqlDatabase, MySqlDatabase, PostgresDatabase, SqliteDatabase};
use crate::error::Result;
use crate::models::Row;
use async_trait::async_trait;
use futures::stream::BoxStream;
use tracing::info;

/// The capabilities the migration needs from a relational source.
#[async_trait]
pub trait SqlDatabase: Send + Sync {
    /// Client identifier the connection was opened with, e.g. `pg`.
    fn client(&self) -> &str;

    async fn run_raw_query(&self, sql: &str) -> Result<Vec<Row>>;

    /// Column rows (`name`, `type`, `pk`) for one table.
    async fn list_columns(&self, table: &str) -> Result<Vec<Row>>;

    /// Forward-only scan over every row of `table`.
    fn stream_rows<'a>(&'a self, table: &'a str) -> BoxStream<'a, Result<Row>>;

    async fn close(&self) -> Result<()>;
}

/// Opens exactly one connection for the configured dialect.
pub async fn connect(config: &DatabaseConfig) -> Result<Box<dyn SqlDatabase>> {
    let dialect = Dialect::from_client(&config.client)?;
    info!("Connecting to {} database", dialect);

    let database: Box<dyn SqlDatabase> = match dialect {
        Dialect::Postgres => {
            Box::new(PostgresDatabase::connect(&config.client, &config.connection_string).await?)
        }
        Dialect::MySql => {
            Box::new(MySqlDatabase::connect(&config.client, &config.connection_string).await?)
        }
        Dialect::MsSql => {
            Box::new(MsSqlDatabase::connect(&config.client, &config.connection_string).await?)
        }
        Dialect::Sqlite => {
            Box::new(SqliteDatabase::open(&config.client, &config.sqlite_location()).await?)
        }
    };

    Ok(database)
}
