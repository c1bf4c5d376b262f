use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use log::info;
use thiserror::Error;

use crate::config::Settings;
use crate::db::Database;
use crate::error::StoreError;
use crate::extract::{self, ExtractionConfig, FileType};
use crate::load::{self, LoadError, Table};

#[derive(Debug, Parser)]
#[command(name = "sales-schema", version, about = "Manage the products/sales schema")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check that the database answers.
    Check,
    /// Create missing tables, indexes and triggers.
    Init,
    /// Drop every table, losing all data.
    Drop {
        #[arg(long)]
        yes: bool,
    },
    /// Insert CSV or JSON records into one table.
    Load(LoadArgs),
}

#[derive(Debug, Args)]
pub struct LoadArgs {
    pub table: Table,
    /// A file, or a directory scanned with `--pattern`.
    pub source: PathBuf,
    /// Defaults to the file extension, then csv.
    #[arg(long, value_enum)]
    pub format: Option<FileType>,
    #[arg(long, default_value = ",", value_parser = delimiter)]
    pub delimiter: u8,
    /// The first CSV line is a record, not column names.
    #[arg(long)]
    pub no_header: bool,
    #[arg(long = "pattern")]
    pub patterns: Vec<String>,
    /// Move loaded files to `archive/` beside the source.
    #[arg(long)]
    pub archive: bool,
}

impl LoadArgs {
    /// Extraction settings; `chunk_size` comes from `APP_BATCH_SIZE`.
    pub fn extraction(&self, chunk_size: usize) -> ExtractionConfig {
        let file_type = self
            .format
            .or_else(|| FileType::from_path(&self.source))
            .unwrap_or(FileType::Csv);

        let mut config = ExtractionConfig::new(&self.source, file_type);
        config.chunk_size = chunk_size;
        config.delimiter = self.delimiter;
        config.has_headers = !self.no_header;
        config.file_patterns = self.patterns.clone();
        config.archive_processed = self.archive;
        config
    }
}

fn delimiter(value: &str) -> Result<u8, String> {
    extract::parse_delimiter(value).map_err(|e| e.to_string())
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("refusing to drop tables without --yes")]
    DropNotConfirmed,

    #[error("database is not reachable")]
    Unreachable,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

pub fn run(command: Command, settings: &Settings) -> Result<(), CliError> {
    match command {
        Command::Check => {
            let db = Database::connect(&settings.database);
            if !db.test_connection() {
                return Err(CliError::Unreachable);
            }
        }
        Command::Init => {
            Database::init(settings, true)?;
        }
        Command::Drop { yes } => {
            if !yes {
                return Err(CliError::DropNotConfirmed);
            }
            Database::init(settings, false)?.drop_tables()?;
        }
        Command::Load(args) => {
            let config = args.extraction(settings.app.batch_size);
            config.validate().map_err(LoadError::from)?;

            let db = Database::init(settings, false)?;
            let files = load::load(&db, args.table, &config)?;
            let rows: usize = files.iter().map(|f| f.row_count).sum();
            info!("loaded {} rows from {} files", rows, files.len());
        }
    }
    Ok(())
}
