// file: src/main.rs
// description: commandline application entry point with command handling
// reference: application bootstrap and orchestration

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use sql2vec::utils::{format_error, format_stat, format_success, format_warning, init_logger};
use sql2vec::{Config, MigrationStats, NamespaceMaintenance, SchemaDiscovery, database, vector};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "sql2vec")]
#[command(author = "cipher")]
#[command(version)]
#[command(about = "Embed relational table rows into a namespaced vector index", long_about = None)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config/default.toml"
    )]
    config: PathBuf,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    color: bool,

    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

/// Values here win over the config file and `SQL2VEC__*` variables.
#[derive(Args)]
struct Overrides {
    /// Database client: pg, mysql2, mssql or sqlite3
    #[arg(long, env = "DB_CLIENT")]
    client: Option<String>,

    #[arg(long, env = "DB_CONNECTION_STRING", hide_env_values = true)]
    connection_string: Option<String>,

    #[arg(long, value_name = "FILE", env = "SQLITE_DB_FILE")]
    sqlite_file: Option<PathBuf>,

    #[arg(long, env = "PINECONE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, env = "PINECONE_INDEX")]
    index_name: Option<String>,

    /// Metadata field that receives the embedded text
    #[arg(long, env = "EMBEDDING_TEXT_FIELD")]
    text_field: Option<String>,

    #[arg(long, value_name = "NUM")]
    batch_size: Option<usize>,
}

impl Overrides {
    fn apply(self, config: &mut Config) {
        if let Some(client) = self.client {
            config.database.client = client;
        }
        if let Some(connection_string) = self.connection_string {
            config.database.connection_string = connection_string;
        }
        if let Some(sqlite_file) = self.sqlite_file {
            config.database.sqlite_file = Some(sqlite_file);
        }
        if let Some(api_key) = self.api_key {
            config.vector.api_key = Some(api_key);
        }
        if let Some(index_name) = self.index_name {
            config.vector.index_name = index_name;
        }
        if let Some(text_field) = self.text_field {
            config.vector.embedding_text_field = text_field;
        }
        if let Some(batch_size) = self.batch_size {
            config.pipeline.batch_size = batch_size;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Discover the schema and upsert every eligible table
    Migrate {
        #[arg(long)]
        no_progress: bool,
    },

    /// Print the discovered schema as JSON without migrating
    Schema,

    /// Fetch records from a table's namespace by id
    Fetch {
        #[arg(short, long)]
        table: String,

        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<String>,
    },

    /// Delete records from a table's namespace by id
    Delete {
        #[arg(short, long)]
        table: String,

        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<String>,

        #[arg(long)]
        confirm: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    init_logger(cli.color, cli.verbose);

    info!("sql2vec migration");
    info!("Loading configuration from: {}", cli.config.display());

    let mut config = if cli.config.exists() {
        Config::from_sources(Some(cli.config.as_path())).context("Failed to load configuration")?
    } else {
        warn!(
            "Config file {} not found, using defaults and environment",
            cli.config.display()
        );
        Config::from_sources(None).context("Failed to load configuration")?
    };
    cli.overrides.apply(&mut config);

    match cli.command {
        Commands::Migrate { no_progress } => {
            config.validate().context("Invalid configuration")?;
            return Ok(cmd_migrate(&config, !no_progress).await);
        }
        Commands::Schema => {
            cmd_schema(&config).await?;
        }
        Commands::Fetch { table, ids } => {
            config.validate().context("Invalid configuration")?;
            cmd_fetch(&config, &table, &ids).await?;
        }
        Commands::Delete {
            table,
            ids,
            confirm,
        } => {
            config.validate().context("Invalid configuration")?;
            cmd_delete(&config, &table, &ids, confirm).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// The migration logs its own failure, so the CLI only reports the status.
async fn cmd_migrate(config: &Config, show_progress: bool) -> ExitCode {
    let outcome = sql2vec::migrate(config, show_progress).await;
    if let Ok(stats) = &outcome {
        print_summary(stats);
    }
    ExitCode::from(exit_status(&outcome))
}

fn exit_status<T>(outcome: &sql2vec::Result<T>) -> u8 {
    match outcome {
        Ok(_) => 0,
        Err(_) => 1,
    }
}

fn print_summary(stats: &MigrationStats) {
    println!();
    println!("{}", format_success("Migration complete"));
    println!("{}", format_stat("Tables processed", stats.tables_processed));
    println!("{}", format_stat("Tables skipped", stats.tables_skipped));
    println!("{}", format_stat("Rows read", stats.rows_read));
    println!("{}", format_stat("Rows without text", stats.rows_skipped));
    println!("{}", format_stat("Records upserted", stats.records_upserted));
    println!("{}", format_stat("Batches flushed", stats.batches_flushed));
    println!("{}", format_stat("Embed rate", format!("{:.1}%", stats.embed_rate())));
    println!("{}", format_stat("Duration", format!("{}s", stats.duration_secs)));
    println!(
        "{}",
        format_stat("Records/sec", format!("{:.2}", stats.records_per_second()))
    );
}

async fn cmd_schema(config: &Config) -> Result<()> {
    let db = database::connect(&config.database)
        .await
        .context("Failed to connect to database")?;

    let discovered = SchemaDiscovery::new(db.as_ref()).discover().await;

    if let Err(e) = db.close().await {
        warn!("Failed to close database connection: {}", e);
    }

    let schema = discovered.context("Schema discovery failed")?;
    println!("{}", serde_json::to_string_pretty(&schema)?);

    for (name, table) in schema.iter() {
        if let Err(reason) = table.eligible(name) {
            eprintln!("{}", format_warning(&format!("{}: {}", name, reason)));
        }
    }

    Ok(())
}

async fn cmd_fetch(config: &Config, table: &str, ids: &[String]) -> Result<()> {
    let store = vector::connect(&config.vector)
        .await
        .context("Failed to connect to vector store")?;

    let Some(records) = NamespaceMaintenance::new(store.as_ref()).fetch(table, ids).await else {
        eprintln!("{}", format_error("Fetch failed, see log for details"));
        return Ok(());
    };

    if records.is_empty() {
        println!("No records found in namespace '{}'", table);
        return Ok(());
    }

    for record in &records {
        println!(
            "{} [{} dims] {}",
            record.id,
            record.dimension(),
            serde_json::to_string(&record.metadata)?
        );
    }

    Ok(())
}

async fn cmd_delete(config: &Config, table: &str, ids: &[String], confirm: bool) -> Result<()> {
    if !confirm {
        eprintln!(
            "{}",
            format_warning(&format!(
                "This deletes {} records from namespace '{}'. Use --confirm to proceed",
                ids.len(),
                table
            ))
        );
        return Ok(());
    }

    let store = vector::connect(&config.vector)
        .await
        .context("Failed to connect to vector store")?;

    if NamespaceMaintenance::new(store.as_ref()).delete(table, ids).await {
        println!("{}", format_success(&format!("Deleted {} records", ids.len())));
    } else {
        eprintln!("{}", format_error("Delete failed, see log for details"));
    }

    Ok(())
}
