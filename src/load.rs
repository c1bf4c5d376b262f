//! Loading extracted files into their table.

use clap::ValueEnum;
use log::{info, warn};
use thiserror::Error;

use crate::constants::{CUSTOMERS, PRODUCTS, SALES};
use crate::customer::{self, NewCustomer};
use crate::db::Database;
use crate::error::StoreError;
use crate::extract::{ExtractError, ExtractionConfig, FileMetadata};
use crate::product::{self, NewProduct};
use crate::sales::{self, NewSale};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Table {
    Products,
    Sales,
    Customers,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Products => PRODUCTS,
            Table::Sales => SALES,
            Table::Customers => CUSTOMERS,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Loads every source file into `table`, one transaction per file.
///
/// Stops at the first file that fails; it leaves no rows behind, while files
/// loaded before it stay committed (and archived, when configured).
pub fn load(
    db: &Database,
    table: Table,
    config: &ExtractionConfig,
) -> Result<Vec<FileMetadata>, LoadError> {
    let files = config.source_files()?;
    if files.is_empty() {
        warn!("nothing to load from {}", config.source_path.display());
        return Ok(Vec::new());
    }

    let mut conn = db.conn()?;
    let mut loaded = Vec::with_capacity(files.len());
    for path in files {
        let rows = match table {
            Table::Products => {
                let rows: Vec<NewProduct> = config.read(&path)?;
                product::insert_batch(&mut conn, &rows, config.chunk_size)?
            }
            Table::Sales => {
                let rows: Vec<NewSale> = config.read(&path)?;
                sales::insert_batch(&mut conn, &rows, config.chunk_size)?
            }
            Table::Customers => {
                let rows: Vec<NewCustomer> = config.read(&path)?;
                customer::insert_batch(&mut conn, &rows, config.chunk_size)?
            }
        };
        let metadata = FileMetadata::new(&path, rows)?;
        info!("loaded {} rows into {} from {}", rows, table.name(), path.display());

        if config.archive_processed {
            config.archive(&path)?;
        }
        loaded.push(metadata);
    }
    Ok(loaded)
}
