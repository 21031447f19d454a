// file: src/database/postgres.rs
// description: postgres collaborator backed by a single-connection sqlx pool
// reference: https://docs.rs/sqlx/latest/sqlx/postgres

use crate::database::client::SqlDatabase;
use crate::database::dialect::Dialect;
use crate::error::{MigrationError, Result};
use crate::models::{Row, SqlValue};
use async_stream::try_stream;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures::TryStreamExt;
use futures::stream::BoxStream;
use sqlx::postgres::types::{PgInterval, PgMoney};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow, PgTypeInfo, PgTypeKind};
use sqlx::types::{Decimal, Uuid};
use sqlx::{Column, Row as _, TypeInfo};
use tracing::{debug, info};

pub struct PostgresDatabase {
    client: String,
    pool: PgPool,
}

impl PostgresDatabase {
    pub async fn connect(client: &str, connection_string: &str) -> Result<Self> {
        info!("Connecting to postgres");

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(connection_string)
            .await
            .map_err(|e| MigrationError::Database(format!("Failed to connect to postgres: {}", e)))?;

        Ok(Self {
            client: client.to_string(),
            pool,
        })
    }
}

#[async_trait]
impl SqlDatabase for PostgresDatabase {
    fn client(&self) -> &str {
        &self.client
    }

    async fn run_raw_query(&self, sql: &str) -> Result<Vec<Row>> {
        debug!("postgres query: {}", sql);
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn list_columns(&self, table: &str) -> Result<Vec<Row>> {
        self.run_raw_query(&Dialect::Postgres.list_columns_sql(table))
            .await
    }

    fn stream_rows<'a>(&'a self, table: &'a str) -> BoxStream<'a, Result<Row>> {
        Box::pin(try_stream! {
            let sql = Dialect::Postgres.select_all_sql(table);
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

fn decode_row(row: &PgRow) -> Result<Row> {
    let mut decoded = Row::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        let value = decode_value(row, idx, column.type_info())?;
        decoded.insert(column.name(), value);
    }
    Ok(decoded)
}

/// How a column is read out of sqlx's binary row format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decoding {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Numeric,
    Money,
    Bytea,
    Json,
    Uuid,
    Timestamp,
    TimestampTz,
    Date,
    Time,
    Interval,
    Text,
    TextArray,
    Int2Array,
    Int4Array,
    Int8Array,
    Float8Array,
    BoolArray,
    Unsupported,
}

fn decoding_for(type_info: &PgTypeInfo) -> Decoding {
    // Enum labels travel as plain UTF-8.
    if matches!(type_info.kind(), PgTypeKind::Enum(_)) {
        return Decoding::Text;
    }
    decoding_for_name(type_info.name())
}

fn decoding_for_name(type_name: &str) -> Decoding {
    match type_name {
        "BOOL" => Decoding::Bool,
        "INT2" => Decoding::Int2,
        "INT4" => Decoding::Int4,
        "INT8" => Decoding::Int8,
        "FLOAT4" => Decoding::Float4,
        "FLOAT8" => Decoding::Float8,
        "NUMERIC" => Decoding::Numeric,
        "MONEY" => Decoding::Money,
        "BYTEA" => Decoding::Bytea,
        "JSON" | "JSONB" => Decoding::Json,
        "UUID" => Decoding::Uuid,
        "TIMESTAMP" => Decoding::Timestamp,
        "TIMESTAMPTZ" => Decoding::TimestampTz,
        "DATE" => Decoding::Date,
        "TIME" => Decoding::Time,
        "INTERVAL" => Decoding::Interval,
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => Decoding::Text,
        "TEXT[]" | "VARCHAR[]" | "BPCHAR[]" | "NAME[]" => Decoding::TextArray,
        "INT2[]" => Decoding::Int2Array,
        "INT4[]" => Decoding::Int4Array,
        "INT8[]" => Decoding::Int8Array,
        "FLOAT4[]" | "FLOAT8[]" => Decoding::Float8Array,
        "BOOL[]" => Decoding::BoolArray,
        _ => Decoding::Unsupported,
    }
}

/// Arrays become a JSON array string so they stay readable in metadata.
fn json_array<T: serde::Serialize>(values: Option<Vec<T>>) -> Result<SqlValue> {
    Ok(match values {
        Some(values) => SqlValue::Text(serde_json::to_string(&values)?),
        None => SqlValue::Null,
    })
}

/// Renders an interval the way postgres prints it, e.g. `1 year 2 mons 3 days 04:05:06`.
fn format_interval(interval: &PgInterval) -> String {
    let mut parts = Vec::new();

    let years = interval.months / 12;
    let months = interval.months % 12;
    if years != 0 {
        parts.push(format!("{} year{}", years, if years.abs() == 1 { "" } else { "s" }));
    }
    if months != 0 {
        parts.push(format!("{} mon{}", months, if months.abs() == 1 { "" } else { "s" }));
    }
    if interval.days != 0 {
        let plural = if interval.days.abs() == 1 { "" } else { "s" };
        parts.push(format!("{} day{}", interval.days, plural));
    }

    if interval.microseconds != 0 || parts.is_empty() {
        let sign = if interval.microseconds < 0 { "-" } else { "" };
        let total = interval.microseconds.unsigned_abs();
        let seconds = total / 1_000_000;
        let micros = total % 1_000_000;
        let mut clock = format!(
            "{}{:02}:{:02}:{:02}",
            sign,
            seconds / 3600,
            (seconds / 60) % 60,
            seconds % 60
        );
        if micros != 0 {
            clock.push_str(&format!(".{:06}", micros));
        }
        parts.push(clock);
    }

    parts.join(" ")
}

/// NUMERIC and MONEY come back as text to keep their precision. Types without
/// a decoder are left null rather than guessed from their binary encoding.
fn decode_value(row: &PgRow, idx: usize, type_info: &PgTypeInfo) -> Result<SqlValue> {
    let value: SqlValue = match decoding_for(type_info) {
        Decoding::Bool => row.try_get::<Option<bool>, _>(idx)?.into(),
        Decoding::Int2 => row.try_get::<Option<i16>, _>(idx)?.map(i64::from).into(),
        Decoding::Int4 => row.try_get::<Option<i32>, _>(idx)?.map(i64::from).into(),
        Decoding::Int8 => row.try_get::<Option<i64>, _>(idx)?.into(),
        Decoding::Float4 => row.try_get::<Option<f32>, _>(idx)?.map(f64::from).into(),
        Decoding::Float8 => row.try_get::<Option<f64>, _>(idx)?.into(),
        Decoding::Numeric => row
            .try_get::<Option<Decimal>, _>(idx)?
            .map(|d| d.to_string())
            .into(),
        Decoding::Money => row
            .try_get::<Option<PgMoney>, _>(idx)?
            .map(|m| m.to_decimal(2).to_string())
            .into(),
        Decoding::Bytea => row
            .try_get::<Option<Vec<u8>>, _>(idx)?
            .map(SqlValue::Bytes)
            .unwrap_or(SqlValue::Null),
        Decoding::Json => row
            .try_get::<Option<serde_json::Value>, _>(idx)?
            .map(|v| v.to_string())
            .into(),
        Decoding::Uuid => row
            .try_get::<Option<Uuid>, _>(idx)?
            .map(|u| u.to_string())
            .into(),
        Decoding::Timestamp => row
            .try_get::<Option<NaiveDateTime>, _>(idx)?
            .map(|t| t.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
            .into(),
        Decoding::TimestampTz => row
            .try_get::<Option<DateTime<Utc>>, _>(idx)?
            .map(|t| t.to_rfc3339())
            .into(),
        Decoding::Date => row
            .try_get::<Option<NaiveDate>, _>(idx)?
            .map(|d| d.to_string())
            .into(),
        Decoding::Time => row
            .try_get::<Option<NaiveTime>, _>(idx)?
            .map(|t| t.to_string())
            .into(),
        Decoding::Interval => row
            .try_get::<Option<PgInterval>, _>(idx)?
            .map(|i| format_interval(&i))
            .into(),
        Decoding::Text => row.try_get_unchecked::<Option<String>, _>(idx)?.into(),
        Decoding::TextArray => {
            json_array(row.try_get_unchecked::<Option<Vec<Option<String>>>, _>(idx)?)?
        }
        Decoding::Int2Array => json_array(row.try_get::<Option<Vec<Option<i16>>>, _>(idx)?)?,
        Decoding::Int4Array => json_array(row.try_get::<Option<Vec<Option<i32>>>, _>(idx)?)?,
        Decoding::Int8Array => json_array(row.try_get::<Option<Vec<Option<i64>>>, _>(idx)?)?,
        Decoding::Float8Array => match type_info.name() {
            "FLOAT4[]" => json_array(row.try_get::<Option<Vec<Option<f32>>>, _>(idx)?)?,
            _ => json_array(row.try_get::<Option<Vec<Option<f64>>>, _>(idx)?)?,
        },
        Decoding::BoolArray => json_array(row.try_get::<Option<Vec<Option<bool>>>, _>(idx)?)?,
        Decoding::Unsupported => {
            debug!(
                "No decoder for postgres type {} in column {}, leaving it null",
                type_info.name(),
                idx
            );
            SqlValue::Null
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_array_interval_and_money_have_decoders() {
        assert_eq!(decoding_for_name("TEXT[]"), Decoding::TextArray);
        assert_eq!(decoding_for_name("VARCHAR[]"), Decoding::TextArray);
        assert_eq!(decoding_for_name("INT4[]"), Decoding::Int4Array);
        assert_eq!(decoding_for_name("INTERVAL"), Decoding::Interval);
        assert_eq!(decoding_for_name("MONEY"), Decoding::Money);
        assert_eq!(decoding_for_name("VARCHAR"), Decoding::Text);
    }

    #[test]
    fn test_unknown_types_are_not_read_as_text() {
        for name in ["TSVECTOR", "POINT", "INET", "INTERVAL[]", "BIT"] {
            assert_eq!(decoding_for_name(name), Decoding::Unsupported, "{}", name);
        }
    }

    #[test]
    fn test_arrays_render_as_json() {
        let tags = Some(vec![Some("rust".to_string()), None, Some("sql".to_string())]);
        assert_eq!(
            json_array(tags).unwrap(),
            SqlValue::from(r#"["rust",null,"sql"]"#)
        );
        assert_eq!(json_array(Some(vec![1i32, 2])).unwrap(), SqlValue::from("[1,2]"));
        assert_eq!(json_array::<i32>(None).unwrap(), SqlValue::Null);
    }

    #[test]
    fn test_interval_text() {
        let interval = PgInterval {
            months: 14,
            days: 3,
            microseconds: 4 * 3_600_000_000 + 5 * 60_000_000 + 6_000_000,
        };
        assert_eq!(format_interval(&interval), "1 year 2 mons 3 days 04:05:06");

        let day = PgInterval {
            months: 0,
            days: 1,
            microseconds: 0,
        };
        assert_eq!(format_interval(&day), "1 day");

        let short = PgInterval {
            months: 0,
            days: 0,
            microseconds: -1_500_000,
        };
        assert_eq!(format_interval(&short), "-00:00:01.500000");

        let zero = PgInterval {
            months: 0,
            days: 0,
            microseconds: 0,
        };
        assert_eq!(format_interval(&zero), "00:00:00");
    }
}
