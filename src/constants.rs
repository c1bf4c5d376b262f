pub const CUSTOMERS: &str = "customers";
pub const PRODUCTS: &str = "products";
pub const SALES: &str = "sales";

/// Tables managed by this crate, in creation order.
pub const TABLES: [&str; 3] = [CUSTOMERS, PRODUCTS, SALES];

pub const PRODUCTS_SKU_UNIQUE: &str = "products_sku_number_key";
pub const CUSTOMERS_EMAIL_UNIQUE: &str = "customers_email_key";
pub const SALES_PRODUCT_FK: &str = "sales_product_id_fkey";
pub const SALES_CUSTOMER_FK: &str = "sales_customer_id_fkey";
pub const PRODUCTS_SALE_FK: &str = "products_sale_id_fkey";

/// Serialises concurrent schema initialisation (`pg_advisory_xact_lock` key).
pub const SCHEMA_LOCK_KEY: i64 = 0x5A1E_5C4E;

pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// PostgreSQL's limit on bind parameters in one statement.
pub const MAX_BIND_PARAMS: usize = 65_535;

/// Values bound per row by `NewProduct`, `NewSale` and `NewCustomer`.
pub const PRODUCT_INSERT_COLUMNS: usize = 8;
pub const SALE_INSERT_COLUMNS: usize = 6;
pub const CUSTOMER_INSERT_COLUMNS: usize = 8;

/// Directory, beside the extraction source, that loaded files are moved to.
pub const ARCHIVE_DIR: &str = "archive";
