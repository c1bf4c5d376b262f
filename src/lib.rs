//! Products, sales and customers on PostgreSQL: idempotent table creation,
//! constraint-aware errors, a small data-access layer over diesel and CSV / JSON
//! loading.

pub mod amount;
pub mod cli;
pub mod config;
pub mod constants;
pub mod customer;
pub mod db;
pub mod ddl;
pub mod error;
pub mod extract;
pub mod load;
pub mod pagination;
pub mod product;
pub mod sales;
pub mod schema;
pub mod validation;

pub use config::{AppSettings, ConfigError, DatabaseSettings, Environment, Settings};
pub use db::{DBConnection, DBPool, Database};
pub use error::{StoreError, StoreResult};
pub use extract::{ExtractError, ExtractionConfig, FileType};
pub use load::{LoadError, Table};
pub use pagination::Pagination;
