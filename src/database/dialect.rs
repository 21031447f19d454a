// file: src/database/dialect.rs
// description: supported SQL dialects and their schema introspection queries
// reference: information_schema views of postgres, mysql and sql server; sqlite pragma table_info

use crate::error::{MigrationError, Result};
use std::fmt;
use std::str::FromStr;

/// Tables installed by common Postgres extensions, never user data.
pub const POSTGRES_SYSTEM_TABLES: &[&str] = &["pg_stat_statements", "spatial_ref_sys"];

const POSTGRES_CATALOG_QUERY: &str = "
SELECT
    c.table_name::text AS table_name,
    c.column_name::text AS column_name,
    c.data_type::text AS data_type,
    CASE
        WHEN tc.constraint_type = 'PRIMARY KEY' THEN 'YES'
        ELSE 'NO'
    END AS is_primary_key
FROM
    information_schema.columns c
LEFT JOIN
    information_schema.key_column_usage kcu ON c.table_name = kcu.table_name
    AND c.column_name = kcu.column_name
    AND c.table_schema = kcu.table_schema
LEFT JOIN
    information_schema.table_constraints tc ON kcu.constraint_name = tc.constraint_name
    AND kcu.table_name = tc.table_name
    AND kcu.table_schema = tc.table_schema
    AND tc.constraint_type = 'PRIMARY KEY'
WHERE
    c.table_schema = 'public'
    AND c.table_name NOT IN ('pg_stat_statements', 'spatial_ref_sys')
ORDER BY c.table_name, c.ordinal_position";

const MYSQL_CATALOG_QUERY: &str = "
SELECT
    CAST(table_name AS CHAR) AS table_name,
    CAST(column_name AS CHAR) AS column_name,
    CAST(data_type AS CHAR) AS data_type,
    CASE
        WHEN column_key = 'PRI' THEN 'YES'
        ELSE 'NO'
    END AS is_primary_key
FROM
    information_schema.columns
WHERE
    table_schema = DATABASE()
ORDER BY table_name, ordinal_position";

const MSSQL_CATALOG_QUERY: &str = "
SELECT
    c.TABLE_NAME AS table_name,
    c.COLUMN_NAME AS column_name,
    c.DATA_TYPE AS data_type,
    CASE
        WHEN tc.CONSTRAINT_TYPE = 'PRIMARY KEY' THEN 'YES'
        ELSE 'NO'
    END AS is_primary_key
FROM
    INFORMATION_SCHEMA.COLUMNS c
LEFT JOIN
    INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu ON c.TABLE_NAME = kcu.TABLE_NAME
    AND c.COLUMN_NAME = kcu.COLUMN_NAME
LEFT JOIN
    INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc ON kcu.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
    AND kcu.TABLE_NAME = tc.TABLE_NAME
    AND tc.CONSTRAINT_TYPE = 'PRIMARY KEY'
WHERE
    c.TABLE_CATALOG = DB_NAME()
ORDER BY c.TABLE_NAME, c.ORDINAL_POSITION";

const SQLITE_LIST_TABLES: &str =
    "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Postgres,
    MySql,
    MsSql,
    Sqlite,
}

/// How a dialect exposes its column metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Introspection {
    /// One catalog statement returning `ColumnMetadataRow`-shaped rows.
    Catalog(&'static str),
    /// List tables, then read each table's columns and classify locally.
    PerTable,
}

impl Dialect {
    pub const ALL: [Dialect; 4] = [
        Dialect::Postgres,
        Dialect::MySql,
        Dialect::MsSql,
        Dialect::Sqlite,
    ];

    /// Resolves a client identifier (knex-style names and common aliases).
    pub fn from_client(client: &str) -> Result<Self> {
        match client.trim().to_ascii_lowercase().as_str() {
            "pg" | "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "mysql" | "mysql2" | "mariadb" => Ok(Dialect::MySql),
            "mssql" | "sqlserver" => Ok(Dialect::MsSql),
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            _ => Err(MigrationError::UnsupportedDialect(client.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Postgres => "pg",
            Dialect::MySql => "mysql2",
            Dialect::MsSql => "mssql",
            Dialect::Sqlite => "sqlite3",
        }
    }

    pub fn introspection(&self) -> Introspection {
        match self {
            Dialect::Postgres => Introspection::Catalog(POSTGRES_CATALOG_QUERY),
            Dialect::MySql => Introspection::Catalog(MYSQL_CATALOG_QUERY),
            Dialect::MsSql => Introspection::Catalog(MSSQL_CATALOG_QUERY),
            Dialect::Sqlite => Introspection::PerTable,
        }
    }

    /// Query returning one `name` column per user table.
    pub fn list_tables_sql(&self) -> &'static str {
        match self {
            Dialect::Postgres => {
                "SELECT table_name::text AS name FROM information_schema.tables \
                 WHERE table_schema = 'public' AND table_type = 'BASE TABLE' \
                 AND table_name NOT IN ('pg_stat_statements', 'spatial_ref_sys')"
            }
            Dialect::MySql => {
                "SELECT CAST(table_name AS CHAR) AS name FROM information_schema.tables \
                 WHERE table_schema = DATABASE() AND table_type = 'BASE TABLE'"
            }
            Dialect::MsSql => {
                "SELECT TABLE_NAME AS name FROM INFORMATION_SCHEMA.TABLES \
                 WHERE TABLE_CATALOG = DB_NAME() AND TABLE_TYPE = 'BASE TABLE'"
            }
            Dialect::Sqlite => SQLITE_LIST_TABLES,
        }
    }

    /// Query returning `name`, `type` and `pk` for each column of `table`.
    /// `pk` is positive for primary key members.
    pub fn list_columns_sql(&self, table: &str) -> String {
        let literal = quote_literal(table);
        match self {
            Dialect::Postgres => format!(
                "SELECT c.column_name::text AS name, c.data_type::text AS type, \
                 CASE WHEN tc.constraint_type = 'PRIMARY KEY' THEN 1 ELSE 0 END AS pk \
                 FROM information_schema.columns c \
                 LEFT JOIN information_schema.key_column_usage kcu ON c.table_name = kcu.table_name \
                 AND c.column_name = kcu.column_name AND c.table_schema = kcu.table_schema \
                 LEFT JOIN information_schema.table_constraints tc ON kcu.constraint_name = tc.constraint_name \
                 AND kcu.table_schema = tc.table_schema AND tc.constraint_type = 'PRIMARY KEY' \
                 WHERE c.table_schema = 'public' AND c.table_name = {} \
                 ORDER BY c.ordinal_position",
                literal
            ),
            Dialect::MySql => format!(
                "SELECT CAST(column_name AS CHAR) AS name, CAST(data_type AS CHAR) AS type, \
                 CASE WHEN column_key = 'PRI' THEN 1 ELSE 0 END AS pk \
                 FROM information_schema.columns \
                 WHERE table_schema = DATABASE() AND table_name = {} \
                 ORDER BY ordinal_position",
                literal
            ),
            Dialect::MsSql => format!(
                "SELECT c.COLUMN_NAME AS name, c.DATA_TYPE AS type, \
                 CASE WHEN tc.CONSTRAINT_TYPE = 'PRIMARY KEY' THEN 1 ELSE 0 END AS pk \
                 FROM INFORMATION_SCHEMA.COLUMNS c \
                 LEFT JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu ON c.TABLE_NAME = kcu.TABLE_NAME \
                 AND c.COLUMN_NAME = kcu.COLUMN_NAME \
                 LEFT JOIN INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc ON kcu.CONSTRAINT_NAME = tc.CONSTRAINT_NAME \
                 AND tc.CONSTRAINT_TYPE = 'PRIMARY KEY' \
                 WHERE c.TABLE_CATALOG = DB_NAME() AND c.TABLE_NAME = {} \
                 ORDER BY c.ORDINAL_POSITION",
                literal
            ),
            Dialect::Sqlite => format!("PRAGMA table_info({})", self.quote_identifier(table)),
        }
    }

    pub fn select_all_sql(&self, table: &str) -> String {
        format!("SELECT * FROM {}", self.quote_identifier(table))
    }

    pub fn quote_identifier(&self, ident: &str) -> String {
        match self {
            Dialect::Postgres | Dialect::Sqlite => format!("\"{}\"", ident.replace('"', "\"\"")),
            Dialect::MySql => format!("`{}`", ident.replace('`', "``")),
            Dialect::MsSql => format!("[{}]", ident.replace(']', "]]")),
        }
    }
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

impl FromStr for Dialect {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self> {
        Dialect::from_client(s)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
