use sqlx::pool::PoolConnection;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Errors from the persistence layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
}

impl DatabaseError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DatabaseError::Sqlx(sqlx::Error::Database(e)) if e.is_unique_violation())
    }

    /// The database could not be reached, as opposed to a failing query
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            DatabaseError::ConfigMissing(_)
                | DatabaseError::Sqlx(sqlx::Error::PoolTimedOut)
                | DatabaseError::Sqlx(sqlx::Error::PoolClosed)
                | DatabaseError::Sqlx(sqlx::Error::Io(_))
                | DatabaseError::Sqlx(sqlx::Error::Tls(_))
        )
    }
}

/// Owned handle to the connection pool. Constructed once at startup, passed
/// through application state, and closed explicitly on shutdown.
#[derive(Clone, Debug)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect eagerly, failing fast if the database is unreachable
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let pool = Self::pool_options(config)?.connect(&config.url).await?;
        info!("Connected database pool (max {} connections)", config.max_connections);
        Ok(Self { pool })
    }

    /// Build the pool without opening a connection; connections are made on first use
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let pool = Self::pool_options(config)?.connect_lazy(&config.url)?;
        Ok(Self { pool })
    }

    fn pool_options(config: &DatabaseConfig) -> Result<PgPoolOptions, DatabaseError> {
        if config.url.is_empty() {
            return Err(DatabaseError::ConfigMissing("DATABASE_URL"));
        }
        Ok(PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout)))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check out a single connection, e.g. for a run of usage queries
    pub async fn acquire(&self) -> Result<PoolConnection<Postgres>, DatabaseError> {
        Ok(self.pool.acquire().await?)
    }

    /// Apply embedded migrations from ./migrations
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the pool, waiting for checked-out connections to return
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed database pool");
    }
}
