#![allow(dead_code)]

use std::env;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use diesel::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, TestCustomizer};

use sales_schema::{DBConnection, Database, ddl};

/// Database for one test. Its only connection sits in a transaction that is
/// never committed, so nothing a test writes outlives it.
///
/// Tests using it are `#[ignore]`d; run them with
/// `TEST_DATABASE_URL=postgres://… cargo test -- --ignored`.
pub fn database() -> Database {
    let url = env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must be set to run the ignored database tests");

    let pool = Pool::builder()
        .max_size(1)
        .connection_customizer(Box::new(TestCustomizer))
        .build(ConnectionManager::<PgConnection>::new(url))
        .expect("failed to connect to TEST_DATABASE_URL");
    Database::from_pool(pool)
}

/// Connection with the schema already applied.
pub fn connection() -> DBConnection {
    let db = database();
    let mut conn = db.conn().expect("checkout");
    ddl::apply_schema(&mut conn).expect("apply schema");
    conn
}

pub fn amount(value: &str) -> BigDecimal {
    BigDecimal::from_str(value).expect("decimal literal")
}
