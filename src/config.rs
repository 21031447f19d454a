// file: src/config.rs
// description: application configuration management with toml support
// reference: https://docs.rs/config

use crate::error::{MigrationError, Result};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_EMBEDDING_MODEL: &str = "llama-text-embed-v2";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub vector: VectorConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Dialect identifier, e.g. `pg`, `mysql2`, `mssql`, `sqlite3`.
    pub client: String,
    #[serde(default)]
    pub connection_string: String,
    /// Local database file for the sqlite dialect; wins over `connection_string`.
    #[serde(default)]
    pub sqlite_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    Pinecone,
    Lancedb,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VectorConfig {
    pub backend: VectorBackend,
    #[serde(default)]
    pub api_key: Option<String>,
    pub index_name: String,
    pub model: String,
    pub embedding_text_field: String,
    #[serde(default)]
    pub lancedb_uri: Option<String>,
    #[serde(default)]
    pub embedding_api_url: Option<String>,
    #[serde(default)]
    pub embedding_api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    pub batch_size: usize,
}

impl DatabaseConfig {
    /// Location handed to the sqlite driver.
    pub fn sqlite_location(&self) -> String {
        match &self.sqlite_file {
            Some(path) => path.display().to_string(),
            None if !self.connection_string.is_empty() => self.connection_string.clone(),
            None => ":memory:".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = Self::from_sources(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Layers built-in defaults, the TOML file at `path`, then `SQL2VEC__*`
    /// environment variables. Does not validate.
    pub fn from_sources(path: Option<&Path>) -> Result<Self> {
        dotenv().ok();

        let defaults = config::Config::try_from(&Self::default_config())
            .map_err(|e| MigrationError::Config(e.to_string()))?;
        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("SQL2VEC")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| MigrationError::Config(e.to_string()))?;

        settings
            .try_deserialize()
            .map_err(|e| MigrationError::Config(e.to_string()))
    }

    pub fn default_config() -> Self {
        Self {
            database: DatabaseConfig {
                client: "sqlite3".to_string(),
                connection_string: String::new(),
                sqlite_file: None,
            },
            vector: VectorConfig {
                backend: VectorBackend::Pinecone,
                api_key: None,
                index_name: "sql-rows".to_string(),
                model: DEFAULT_EMBEDDING_MODEL.to_string(),
                embedding_text_field: "text".to_string(),
                lancedb_uri: None,
                embedding_api_url: None,
                embedding_api_key: None,
            },
            pipeline: PipelineConfig {
                batch_size: DEFAULT_BATCH_SIZE,
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.pipeline.batch_size == 0 {
            return Err(MigrationError::Config(
                "batch_size must be greater than 0".to_string(),
            ));
        }

        if self.vector.embedding_text_field.trim().is_empty() {
            return Err(MigrationError::Config(
                "embedding_text_field must not be empty".to_string(),
            ));
        }

        if self.vector.model.trim().is_empty() {
            return Err(MigrationError::Config(
                "model must not be empty".to_string(),
            ));
        }

        match self.vector.backend {
            VectorBackend::Pinecone => {
                if self.vector.api_key.as_deref().is_none_or(str::is_empty) {
                    return Err(MigrationError::Config(
                        "vector.api_key is required for the pinecone backend".to_string(),
                    ));
                }
                if self.vector.index_name.trim().is_empty() {
                    return Err(MigrationError::Config(
                        "vector.index_name is required for the pinecone backend".to_string(),
                    ));
                }
            }
            VectorBackend::Lancedb => {
                if self.vector.lancedb_uri.is_none() {
                    return Err(MigrationError::Config(
                        "vector.lancedb_uri is required for the lancedb backend".to_string(),
                    ));
                }
                if self.vector.embedding_api_url.is_none() {
                    return Err(MigrationError::Config(
                        "vector.embedding_api_url is required for the lancedb backend"
                            .to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pinecone_config() -> Config {
        let mut config = Config::default_config();
        config.vector.api_key = Some("pc-test".to_string());
        config
    }

    #[test]
    fn test_default_batch_size() {
        let config = Config::default_config();
        assert_eq!(config.pipeline.batch_size, 100);
        assert_eq!(config.vector.model, "llama-text-embed-v2");
    }

    #[test]
    fn test_pinecone_requires_api_key() {
        let config = Config::default_config();
        assert!(matches!(config.validate(), Err(MigrationError::Config(_))));
        assert!(pinecone_config().validate().is_ok());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut config = pinecone_config();
        config.pipeline.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_lancedb_requires_uri_and_embedder() {
        let mut config = Config::default_config();
        config.vector.backend = VectorBackend::Lancedb;
        assert!(config.validate().is_err());

        config.vector.lancedb_uri = Some("data/lancedb".to_string());
        assert!(config.validate().is_err());

        config.vector.embedding_api_url = Some("http://localhost:11434/v1".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sqlite_location_precedence() {
        let mut db = Config::default_config().database;
        assert_eq!(db.sqlite_location(), ":memory:");

        db.connection_string = "app.db".to_string();
        assert_eq!(db.sqlite_location(), "app.db");

        db.sqlite_file = Some(PathBuf::from("/tmp/other.db"));
        assert_eq!(db.sqlite_location(), "/tmp/other.db");
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            r#"
[database]
client = "pg"
connection_string = "postgres://localhost/app"

[vector]
backend = "pinecone"
api_key = "pc-key"
index_name = "rows"
model = "llama-text-embed-v2"
embedding_text_field = "chunk_text"

[pipeline]
batch_size = 50
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.database.client, "pg");
        assert_eq!(config.database.sqlite_file, None);
        assert_eq!(config.vector.backend, VectorBackend::Pinecone);
        assert_eq!(config.vector.embedding_text_field, "chunk_text");
        assert_eq!(config.pipeline.batch_size, 50);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[database]\nclient = \"mysql2\"\n").unwrap();

        let config = Config::from_sources(Some(&path)).unwrap();
        assert_eq!(config.database.client, "mysql2");
        assert_eq!(config.vector.embedding_text_field, "text");
        assert_eq!(config.pipeline.batch_size, DEFAULT_BATCH_SIZE);
    }
}
