//! Inspect, validate and diff the schema of a clipstash SQLite database.
//!
//! ```bash
//! # Dump the live schema
//! clipstash --database sqlite://clips.db schema
//!
//! # Check a declared schema for cycles, dangling references and bad names
//! clipstash validate --schema schema.sql
//!
//! # Print the migration script that brings the database up to date
//! clipstash diff --expected schema.sql --sql
//! ```

mod config;
mod report;

use clap::{Parser, Subcommand};
use clipstash::{CancellationToken, SchemaDefinition, SchemaOptions, SchemaReader};
use config::{Config, ConfigError};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Inspect, validate and diff clipstash database schemas.
#[derive(Parser, Debug)]
#[command(name = "clipstash", version)]
struct Cli {
    /// Database connection URL (e.g. sqlite://clips.db)
    #[arg(long, global = true, env = "DATABASE_URL")]
    database: Option<String>,

    /// Configuration file (default: .config/clipstash.toml, searched upwards)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Dump the current schema as SQL
    Schema,
    /// Check a schema for structural problems
    Validate {
        /// Validate the schema declared by this DDL script instead of the database
        #[arg(long)]
        schema: Option<PathBuf>,
    },
    /// Compare the database against an expected schema
    Diff {
        /// DDL script declaring the expected schema
        #[arg(long)]
        expected: PathBuf,

        /// Print the migration script instead of the change listing
        #[arg(long)]
        sql: bool,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Engine(#[from] clipstash::Error),
    #[error(transparent)]
    Invalid(#[from] clipstash::ValidationErrors),
    #[error("no database URL: pass --database, set DATABASE_URL or add database_url to the config")]
    NoDatabase,
    #[error("failed to read {}: {source}", path.display())]
    ReadScript {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to execute {}: {source}", path.display())]
    LoadScript {
        path: PathBuf,
        #[source]
        source: sqlx::Error,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // .env must be loaded before clap reads DATABASE_URL
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("clipstash=info")),
        )
        .init();

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted");
                cancel.cancel();
            }
        }
    });

    match run(cli, &cancel).await {
        Ok(code) => code,
        Err(CliError::Engine(clipstash::Error::Cancelled)) => ExitCode::from(130),
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, cancel: &CancellationToken) -> Result<ExitCode, CliError> {
    let config = load_config(cli.config.as_deref())?;
    let color = std::io::stdout().is_terminal();

    match cli.command {
        Commands::Schema => {
            let url = database_url(cli.database, &config)?;
            let schema = read_database(&config.schema, &url, cancel).await?;
            print!("{}", report::schema_script(&schema));
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate { schema } => {
            let schema = match schema {
                Some(path) => read_declared(&config.schema, &path, cancel).await?,
                None => {
                    let url = database_url(cli.database, &config)?;
                    read_database(&config.schema, &url, cancel).await?
                }
            };

            let result = clipstash::validate(&schema);
            print!("{}", report::validation_listing(&result, color));
            Ok(if result.is_valid() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Diff { expected, sql } => {
            let url = database_url(cli.database, &config)?;
            let expected = read_declared(&config.schema, &expected, cancel).await?;

            for warning in clipstash::validate(&expected).into_result()? {
                warn!("{}", warning);
            }

            let current = read_database(&config.schema, &url, cancel).await?;
            let diff = clipstash::compare(&current, &expected);

            if sql {
                print!("{}", diff.to_sql());
            } else {
                print!("{}", report::diff_listing(&diff, color));
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Load the explicit config file, or search upwards; no file means defaults.
fn load_config(explicit: Option<&Path>) -> Result<Config, CliError> {
    let loaded = match explicit {
        Some(path) => config::load_file(path).map(|config| (config, path.to_path_buf())),
        None => config::load(),
    };

    match loaded {
        Ok((config, path)) => {
            debug!(path = %path.display(), "loaded configuration");
            Ok(config)
        }
        Err(ConfigError::NotFound) => Ok(Config::default()),
        Err(e) => Err(e.into()),
    }
}

fn database_url(flag: Option<String>, config: &Config) -> Result<String, CliError> {
    flag.or_else(|| config.database_url.clone()).ok_or(CliError::NoDatabase)
}

async fn read_database(
    options: &SchemaOptions,
    url: &str,
    cancel: &CancellationToken,
) -> Result<Arc<SchemaDefinition>, CliError> {
    info!(database = %mask_password(url), "reading schema");
    let reader = SchemaReader::new(options.clone());
    Ok(reader.read_schema_from_url(url, cancel).await?)
}

/// Build the schema declared by a DDL script.
///
/// The script runs against a private in-memory database which is then read
/// back, so both sides of a comparison come from the same introspection.
async fn read_declared(
    options: &SchemaOptions,
    path: &Path,
    cancel: &CancellationToken,
) -> Result<Arc<SchemaDefinition>, CliError> {
    let ddl = std::fs::read_to_string(path).map_err(|source| CliError::ReadScript {
        path: path.to_path_buf(),
        source,
    })?;

    let mut conn = SchemaReader::connect("sqlite::memory:").await?;
    sqlx::raw_sql(&ddl)
        .execute(&mut conn)
        .await
        .map_err(|source| CliError::LoadScript {
            path: path.to_path_buf(),
            source,
        })?;

    let reader = SchemaReader::new(options.clone());
    Ok(reader.read_schema(&mut conn, cancel).await?)
}

/// Mask password in database URL for display
fn mask_password(url: &str) -> String {
    let Some(scheme_end) = url.find("://").map(|i| i + 3) else {
        return url.to_string();
    };
    let rest = &url[scheme_end..];
    let Some(at) = rest.find('@') else {
        return url.to_string();
    };

    match rest[..at].split_once(':') {
        Some((user, _)) => format!("{}{}:***{}", &url[..scheme_end], user, &rest[at..]),
        None => url.to_string(),
    }
}
