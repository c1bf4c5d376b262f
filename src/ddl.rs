//! Table definitions for `customers`, `products` and `sales`.
//!
//! Every statement is safe to re-run against an initialised database: tables
//! and indexes use `IF NOT EXISTS`, the timestamp trigger function is
//! replaced in place, and the constraints and triggers that PostgreSQL cannot
//! create conditionally are guarded by catalog lookups.

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Text};
use log::{debug, info, warn};

use crate::constants::{SCHEMA_LOCK_KEY, TABLES};
use crate::error::StoreResult;

const CREATE_TIMESTAMP_FUNCTION: &str = r#"
CREATE OR REPLACE FUNCTION touch_row_timestamps() RETURNS trigger AS $$
BEGIN
    IF TG_OP = 'INSERT' THEN
        NEW.created_at := clock_timestamp();
        NEW.updated_at := NEW.created_at;
    ELSE
        NEW.created_at := OLD.created_at;
        NEW.updated_at := GREATEST(clock_timestamp(), OLD.updated_at + interval '1 microsecond');
    END IF;
    RETURN NEW;
END;
$$ LANGUAGE plpgsql
"#;

const CREATE_CUSTOMERS: &str = r#"
CREATE TABLE IF NOT EXISTS customers (
    customer_id   INTEGER     NOT NULL,
    first_name    TEXT        NOT NULL,
    last_name     TEXT        NOT NULL,
    email         TEXT        NOT NULL,
    phone_number  TEXT,
    address       TEXT,
    city          TEXT,
    is_active     BOOLEAN     NOT NULL DEFAULT TRUE,
    created_at    TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp(),
    updated_at    TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp(),
    CONSTRAINT customers_pkey PRIMARY KEY (customer_id),
    CONSTRAINT customers_email_key UNIQUE (email)
)
"#;

// `sale_id` gets its foreign key once `sales` exists, see ADD_PRODUCTS_SALE_FK.
const CREATE_PRODUCTS: &str = r#"
CREATE TABLE IF NOT EXISTS products (
    product_id      INTEGER       NOT NULL,
    sale_id         INTEGER,
    product_name    TEXT          NOT NULL,
    description     TEXT,
    sku_number      TEXT,
    category        TEXT,
    price           NUMERIC(12,2) NOT NULL,
    stock_quantity  INTEGER       NOT NULL DEFAULT 0,
    created_at      TIMESTAMPTZ   NOT NULL DEFAULT clock_timestamp(),
    updated_at      TIMESTAMPTZ   NOT NULL DEFAULT clock_timestamp(),
    CONSTRAINT products_pkey PRIMARY KEY (product_id),
    CONSTRAINT products_sku_number_key UNIQUE (sku_number)
)
"#;

const CREATE_SALES: &str = r#"
CREATE TABLE IF NOT EXISTS sales (
    sale_id       INTEGER       NOT NULL,
    product_id    INTEGER,
    customer_id   INTEGER,
    sale_date     TIMESTAMPTZ   NOT NULL DEFAULT clock_timestamp(),
    quantity      INTEGER       NOT NULL,
    total_amount  NUMERIC(12,2) NOT NULL,
    created_at    TIMESTAMPTZ   NOT NULL DEFAULT clock_timestamp(),
    updated_at    TIMESTAMPTZ   NOT NULL DEFAULT clock_timestamp(),
    CONSTRAINT sales_pkey PRIMARY KEY (sale_id),
    CONSTRAINT sales_product_id_fkey FOREIGN KEY (product_id)
        REFERENCES products (product_id) ON DELETE RESTRICT,
    CONSTRAINT sales_customer_id_fkey FOREIGN KEY (customer_id)
        REFERENCES customers (customer_id) ON DELETE RESTRICT
)
"#;

const ADD_PRODUCTS_SALE_FK: &str = r#"
DO $$
BEGIN
    IF NOT EXISTS (
        SELECT 1 FROM pg_constraint
        WHERE conname = 'products_sale_id_fkey'
          AND conrelid = 'products'::regclass
    ) THEN
        ALTER TABLE products
            ADD CONSTRAINT products_sale_id_fkey FOREIGN KEY (sale_id)
            REFERENCES sales (sale_id) ON DELETE RESTRICT;
    END IF;
END
$$
"#;

const CREATE_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS ix_products_sale_id ON products (sale_id);
CREATE INDEX IF NOT EXISTS ix_sales_product_id ON sales (product_id);
CREATE INDEX IF NOT EXISTS ix_sales_customer_id ON sales (customer_id)
"#;

fn create_trigger(table: &str) -> String {
    format!(
        r#"
DO $$
BEGIN
    IF NOT EXISTS (
        SELECT 1 FROM pg_trigger
        WHERE tgname = '{table}_touch_timestamps'
          AND tgrelid = '{table}'::regclass
    ) THEN
        CREATE TRIGGER {table}_touch_timestamps
            BEFORE INSERT OR UPDATE ON {table}
            FOR EACH ROW EXECUTE FUNCTION touch_row_timestamps();
    END IF;
END
$$
"#
    )
}

/// Statements in the order they have to run. `customers` comes first since
/// `sales` references it; the products/sales cycle is closed afterwards.
pub fn statements() -> Vec<(&'static str, String)> {
    let mut statements = vec![
        ("timestamp function", CREATE_TIMESTAMP_FUNCTION.to_string()),
        ("customers", CREATE_CUSTOMERS.to_string()),
        ("products", CREATE_PRODUCTS.to_string()),
        ("sales", CREATE_SALES.to_string()),
        ("products.sale_id foreign key", ADD_PRODUCTS_SALE_FK.to_string()),
        ("indexes", CREATE_INDEXES.to_string()),
    ];
    for table in TABLES {
        statements.push(("timestamp trigger", create_trigger(table)));
    }
    statements
}

/// Creates whatever part of the schema is missing. Runs in a single
/// transaction holding an advisory lock, so concurrent callers queue up.
pub fn apply_schema(conn: &mut PgConnection) -> StoreResult<()> {
    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        diesel::sql_query("SELECT pg_advisory_xact_lock($1)")
            .bind::<BigInt, _>(SCHEMA_LOCK_KEY)
            .execute(conn)?;

        for (name, sql) in statements() {
            debug!("applying schema step: {}", name);
            conn.batch_execute(&sql)?;
        }
        Ok(())
    })?;

    info!("schema applied ({})", TABLES.join(", "));
    Ok(())
}

/// Drops all tables and the trigger function. Data is lost.
pub fn drop_schema(conn: &mut PgConnection) -> StoreResult<()> {
    warn!("dropping tables {}", TABLES.join(", "));
    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        conn.batch_execute(
            "DROP TABLE IF EXISTS sales, products, customers CASCADE; \
             DROP FUNCTION IF EXISTS touch_row_timestamps()",
        )
    })?;
    info!("schema dropped");
    Ok(())
}

#[derive(QueryableByName)]
struct TableName {
    #[diesel(sql_type = Text)]
    table_name: String,
}

/// Managed tables that currently exist in the connection's schema, sorted by name.
pub fn existing_tables(conn: &mut PgConnection) -> StoreResult<Vec<String>> {
    let rows = diesel::sql_query(
        "SELECT table_name::text AS table_name \
         FROM information_schema.tables \
         WHERE table_schema = current_schema() \
           AND table_name IN ('customers', 'products', 'sales') \
         ORDER BY table_name",
    )
    .load::<TableName>(conn)?;

    Ok(rows.into_iter().map(|row| row.table_name).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_create_is_conditional() {
        for (name, sql) in statements() {
            for line in sql.lines().map(str::trim) {
                if line.starts_with("CREATE TABLE") || line.starts_with("CREATE INDEX") {
                    assert!(line.contains("IF NOT EXISTS"), "{name}: {line}");
                }
                if line.starts_with("CREATE FUNCTION") {
                    panic!("{name}: function must use CREATE OR REPLACE");
                }
                if line.starts_with("ALTER TABLE") || line.starts_with("CREATE TRIGGER") {
                    let guarded = sql.contains("IF NOT EXISTS (");
                    assert!(guarded, "{name}: unguarded `{line}`");
                }
            }
        }
    }

    #[test]
    fn referenced_tables_are_created_first() {
        let names: Vec<_> = statements().into_iter().map(|(name, _)| name).collect();
        let position = |n: &str| names.iter().position(|x| *x == n).unwrap();

        let function = position("timestamp function");
        assert!(function < position("timestamp trigger"));
        assert!(position("customers") < position("sales"));
        assert!(position("products") < position("sales"));
        assert!(position("sales") < position("products.sale_id foreign key"));
    }

    #[test]
    fn deletes_are_restricted() {
        let all: String = statements().into_iter().map(|(_, sql)| sql).collect();
        assert_eq!(all.matches("REFERENCES").count(), 3);
        assert_eq!(all.matches("ON DELETE RESTRICT").count(), 3);
        assert!(!all.contains("CASCADE"));
    }

    #[test]
    fn one_trigger_per_table() {
        let triggers: Vec<_> = statements()
            .into_iter()
            .filter(|(name, _)| *name == "timestamp trigger")
            .map(|(_, sql)| sql)
            .collect();
        assert_eq!(triggers.len(), TABLES.len());
        for table in TABLES {
            let on_table = format!("ON {table}\n");
            assert!(triggers.iter().any(|sql| sql.contains(&on_table)));
        }
    }
}
