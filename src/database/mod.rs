// file: src/database/mod.rs
// description: relational source module exports
// reference: internal module structure

pub mod client;
pub mod dialect;
pub mod mssql;
pub mod mysql;
pub mod postgres;
pub mod sqlite;

pub use client::{SqlDatabase, connect};
pub use dialect::{Dialect, Introspection};
pub use mssql::MsSqlDatabase;
pub use mysql::MySqlDatabase;
pub use postgres::PostgresDatabase;
pub use sqlite::SqliteDatabase;
