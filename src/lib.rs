pub mod cli;
pub mod commands;
pub mod data;
pub mod engine;
pub mod errors;
pub mod models;
pub mod utils;

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use rusqlite::Connection;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::engine::normalizer::TimestampParser;
use crate::errors::AppError;
use crate::models::config::JournalConfig;

/// Shared application state, handed to every command.
pub struct AppState {
    pub db: Connection,
    pub config: JournalConfig,
    pub parser: TimestampParser,
}

impl AppState {
    /// Open the journal database named by the config (or by `db_override`).
    pub fn open(config: JournalConfig, db_override: Option<PathBuf>) -> Result<Self, AppError> {
        ensure_data_dir(&config)?;
        let db_path = db_override.unwrap_or_else(|| config.db_path());
        let db_path_str = db_path.to_string_lossy().to_string();

        let db = data::storage::initialize_database(&db_path_str)?;
        info!("Database ready at {}", db_path_str);

        Ok(AppState {
            db,
            parser: TimestampParser::from_config(&config),
            config,
        })
    }

    /// State backed by an in-memory database.
    pub fn in_memory(config: JournalConfig) -> Result<Self, AppError> {
        Ok(AppState {
            db: data::storage::open_in_memory()?,
            parser: TimestampParser::from_config(&config),
            config,
        })
    }
}

/// Make sure the data directory exists.
fn ensure_data_dir(config: &JournalConfig) -> Result<(), AppError> {
    let dir = config.data_dir();
    fs::create_dir_all(&dir)
        .map_err(|e| AppError::FileWrite(format!("Cannot create {}: {}", dir.display(), e)))?;
    Ok(())
}

pub fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Cli::parse();

    let config = match &args.config {
        Some(path) => JournalConfig::load(path)?,
        None => JournalConfig::default(),
    };

    let mut state = AppState::open(config, args.db)?;
    cli::dispatch(args.command, &mut state)
}
