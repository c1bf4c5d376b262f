use diesel::connection::InstrumentationEvent;
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use log::{debug, error, info};

use crate::config::{DatabaseSettings, Settings};
use crate::ddl;
use crate::error::{StoreError, StoreResult};

pub type DBPool = Pool<ConnectionManager<PgConnection>>;
pub type DBConnection = PooledConnection<ConnectionManager<PgConnection>>;

/// Logs every statement sent over a pooled connection.
#[derive(Debug, Clone, Copy)]
struct EchoStatements;

impl CustomizeConnection<PgConnection, r2d2::Error> for EchoStatements {
    fn on_acquire(&self, conn: &mut PgConnection) -> Result<(), r2d2::Error> {
        conn.set_instrumentation(echo_query);
        Ok(())
    }
}

fn echo_query(event: InstrumentationEvent<'_>) {
    if let InstrumentationEvent::StartQuery { query, .. } = event {
        debug!(target: "sales_schema::sql", "{}", query);
    }
}

/// Handle to the store. Every data-access call gets its connection from here
/// (or from a connection checked out of it).
#[derive(Clone)]
pub struct Database {
    pool: DBPool,
}

impl Database {
    /// Builds the pool without opening connections; use `test_connection` or
    /// `init` to find out whether the server is reachable.
    pub fn connect(settings: &DatabaseSettings) -> Self {
        info!(
            "creating connection pool for {}:{}/{} (size {}, max {})",
            settings.host,
            settings.port,
            settings.database,
            settings.pool_size,
            settings.max_connections()
        );

        let manager = ConnectionManager::<PgConnection>::new(settings.database_url());
        let mut builder = Pool::builder()
            .max_size(settings.max_connections())
            .min_idle(Some(settings.pool_size))
            .connection_timeout(settings.pool_timeout)
            .max_lifetime(Some(settings.pool_recycle));
        if settings.echo {
            builder = builder.connection_customizer(Box::new(EchoStatements));
        }

        Database {
            pool: builder.build_unchecked(manager),
        }
    }

    pub fn from_pool(pool: DBPool) -> Self {
        Database { pool }
    }

    /// Connects, checks the server answers and optionally creates the tables.
    pub fn init(settings: &Settings, create_tables: bool) -> StoreResult<Self> {
        let db = Database::connect(&settings.database);
        db.ping()?;
        if create_tables {
            db.create_tables()?;
        }
        Ok(db)
    }

    pub fn pool(&self) -> &DBPool {
        &self.pool
    }

    pub fn conn(&self) -> StoreResult<DBConnection> {
        Ok(self.pool.get()?)
    }

    fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn()?;
        diesel::sql_query("SELECT 1").execute(&mut conn)?;
        Ok(())
    }

    pub fn test_connection(&self) -> bool {
        match self.ping() {
            Ok(()) => {
                info!("database connection test successful");
                true
            }
            Err(err) => {
                error!("database connection test failed: {}", err);
                false
            }
        }
    }

    pub fn create_tables(&self) -> StoreResult<()> {
        let mut conn = self.conn()?;
        ddl::apply_schema(&mut conn)
    }

    pub fn drop_tables(&self) -> StoreResult<()> {
        let mut conn = self.conn()?;
        ddl::drop_schema(&mut conn)
    }

    /// Runs `f` in one transaction: committed when it returns `Ok`, rolled
    /// back otherwise.
    pub fn transaction<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> StoreResult<T>,
    {
        let mut conn = self.conn()?;
        let result = conn.transaction::<T, StoreError, _>(|conn| f(conn));
        match &result {
            Ok(_) => debug!("transaction committed"),
            Err(err) => error!("transaction rolled back: {}", err),
        }
        result
    }
}
