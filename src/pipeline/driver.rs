// file: src/pipeline/driver.rs
// description: coordinates schema discovery, per-table batching, and connection teardown
// reference: orchestrates the one-shot migration workflow

use crate::config::Config;
use crate::database::{self, Dialect, SqlDatabase};
use crate::error::Result;
use crate::pipeline::batch::{BatchSettings, BatchingPipeline};
use crate::pipeline::progress::{MigrationStats, ProgressTracker};
use crate::schema::SchemaDiscovery;
use crate::vector::{self, VectorStore};
use tracing::{error, info, warn};

pub struct MigrationDriver {
    db: Box<dyn SqlDatabase>,
    store: Box<dyn VectorStore>,
    settings: BatchSettings,
    show_progress: bool,
}

impl MigrationDriver {
    pub fn new(db: Box<dyn SqlDatabase>, store: Box<dyn VectorStore>, settings: BatchSettings) -> Self {
        Self {
            db,
            store,
            settings,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Runs the whole migration. The database connection is closed on every
    /// path, including failures.
    pub async fn run(self) -> Result<MigrationStats> {
        let outcome = self.migrate_tables().await;

        if let Err(e) = &outcome {
            error!("Error during processing: {}", e);
            if e.is_upstream() {
                warn!("Batches flushed before the failure remain in the index");
            }
        }

        match self.db.close().await {
            Ok(()) => info!("Database connection closed."),
            Err(e) => warn!("Failed to close database connection: {}", e),
        }

        if let Ok(stats) = &outcome {
            self.log_final_stats(stats);
        }

        outcome
    }

    async fn migrate_tables(&self) -> Result<MigrationStats> {
        let tracker = ProgressTracker::new(self.show_progress);

        info!("Discovering database schema...");
        let schema = SchemaDiscovery::new(self.db.as_ref()).discover().await?;
        info!(
            "Discovered schema: {}",
            serde_json::to_string_pretty(&schema)?
        );

        info!("Starting data migration...");
        let pipeline = BatchingPipeline::new(self.store.as_ref(), &self.settings);
        let mut stats = MigrationStats::new();

        for (name, table_schema) in schema.iter() {
            let table = match table_schema.eligible(name) {
                Ok(table) => table,
                Err(reason) => {
                    warn!("Skipping table '{}': {}", name, reason);
                    stats.tables_skipped += 1;
                    continue;
                }
            };

            info!("Processing table '{}' into namespace '{}'...", name, name);
            let progress = tracker.table(name);
            let table_stats = pipeline
                .process_table(self.db.as_ref(), &table, &progress)
                .await?;
            stats.add_table(&table_stats);
            info!("Finished processing table '{}'.", name);
        }

        stats.duration_secs = tracker.elapsed_secs();
        Ok(stats)
    }

    fn log_final_stats(&self, stats: &MigrationStats) {
        info!("=== Migration Summary ===");
        info!("Duration: {} seconds", stats.duration_secs);
        info!("Tables processed: {}", stats.tables_processed);
        info!("Tables skipped: {}", stats.tables_skipped);
        info!("Rows read: {}", stats.rows_read);
        info!("Rows without text: {}", stats.rows_skipped);
        info!("Records upserted: {}", stats.records_upserted);
        info!("Batches flushed: {}", stats.batches_flushed);
    }
}

/// Connects both collaborators from `config` and runs the migration. Every
/// failure is logged once here or by the driver; callers only need the result.
pub async fn migrate(config: &Config, show_progress: bool) -> Result<MigrationStats> {
    let (db, store) = match connect_collaborators(config).await {
        Ok(collaborators) => collaborators,
        Err(e) => {
            error!("Error during processing: {}", e);
            return Err(e);
        }
    };

    MigrationDriver::new(db, store, BatchSettings::from_config(config))
        .with_progress(show_progress)
        .run()
        .await
}

async fn connect_collaborators(
    config: &Config,
) -> Result<(Box<dyn SqlDatabase>, Box<dyn VectorStore>)> {
    Dialect::from_client(&config.database.client)?;

    let store = vector::connect(&config.vector).await?;
    let db = database::connect(&config.database).await?;
    Ok((db, store))
}
