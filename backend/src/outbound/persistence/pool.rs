//! Async connection pool for Diesel PostgreSQL connections.
//!
//! Wraps `diesel-async` over `bb8`. Checkout honours the configured connect
//! timeout; callers additionally race checkout against the request context.

use std::time::Duration;

use diesel::connection::SimpleConnection as _;
use diesel::{Connection as _, PgConnection};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};
use diesel_async::{AsyncPgConnection, RunQueryDsl as _};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness as _, embed_migrations};
use serde::Deserialize;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Errors that can occur during pool operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// No DSN was configured.
    #[error("database.dsn is required")]
    MissingDsn,

    /// Failed to build the connection pool.
    #[error("failed to build connection pool: {message}")]
    Build { message: String },

    /// Failed to check out a connection from the pool.
    #[error("failed to get connection from pool: {message}")]
    Checkout { message: String },

    /// The startup probe query failed.
    #[error("database ping failed: {message}")]
    Ping { message: String },

    /// Schema migrations could not be applied.
    #[error("failed to apply migrations: {message}")]
    Migration { message: String },
}

impl PoolError {
    /// Create a build error with the given message.
    pub fn build(message: impl Into<String>) -> Self {
        Self::Build {
            message: message.into(),
        }
    }

    /// Create a checkout error with the given message.
    pub fn checkout(message: impl Into<String>) -> Self {
        Self::Checkout {
            message: message.into(),
        }
    }

    /// Create a ping error with the given message.
    pub fn ping(message: impl Into<String>) -> Self {
        Self::Ping {
            message: message.into(),
        }
    }

    /// Create a migration error with the given message.
    pub fn migration(message: impl Into<String>) -> Self {
        Self::Migration {
            message: message.into(),
        }
    }
}

const fn default_max_connections() -> u32 {
    10
}

const fn default_connect_timeout_ms() -> u64 {
    30_000
}

const fn default_run_migrations() -> bool {
    true
}

/// `database.*` configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string.
    #[serde(default)]
    pub dsn: String,
    /// Upper bound on pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Checkout and connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Apply embedded migrations at startup.
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            dsn: String::new(),
            max_connections: default_max_connections(),
            connect_timeout_ms: default_connect_timeout_ms(),
            run_migrations: default_run_migrations(),
        }
    }
}

impl DatabaseConfig {
    /// Checkout timeout as a [`Duration`].
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    fn require_dsn(&self) -> Result<&str, PoolError> {
        let dsn = self.dsn.trim();
        if dsn.is_empty() {
            Err(PoolError::MissingDsn)
        } else {
            Ok(dsn)
        }
    }
}

/// Shared pool of async PostgreSQL connections.
#[derive(Clone)]
pub struct DbPool {
    inner: Pool<AsyncPgConnection>,
}

impl DbPool {
    /// Build the pool and prove a connection can be made.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::MissingDsn`], [`PoolError::Build`] when the pool
    /// cannot be constructed and [`PoolError::Ping`] when `SELECT 1` fails.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, PoolError> {
        let dsn = config.require_dsn()?;
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(dsn);
        let inner = Pool::builder()
            .max_size(config.max_connections.max(1))
            .connection_timeout(config.connect_timeout())
            .build(manager)
            .await
            .map_err(|err| PoolError::build(err.to_string()))?;
        let pool = Self { inner };
        pool.ping().await?;
        Ok(pool)
    }

    /// Get a connection from the pool.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Checkout`] if no connection is available within
    /// the configured timeout.
    pub async fn get(&self) -> Result<PooledConnection<'_, AsyncPgConnection>, PoolError> {
        self.inner
            .get()
            .await
            .map_err(|err| PoolError::checkout(err.to_string()))
    }

    /// Run `SELECT 1` on a pooled connection.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Checkout`] or [`PoolError::Ping`].
    pub async fn ping(&self) -> Result<(), PoolError> {
        let mut conn = self.get().await?;
        diesel::sql_query("SELECT 1")
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| PoolError::ping(err.to_string()))
    }
}

/// Apply the embedded migrations over a dedicated synchronous connection.
///
/// Blocking; call from `spawn_blocking` inside a runtime.
///
/// # Errors
///
/// Returns [`PoolError::MissingDsn`] or [`PoolError::Migration`].
pub fn run_migrations(config: &DatabaseConfig) -> Result<usize, PoolError> {
    let dsn = config.require_dsn()?;
    let mut conn =
        PgConnection::establish(dsn).map_err(|err| PoolError::migration(err.to_string()))?;
    conn.batch_execute("SET lock_timeout = '10s'")
        .map_err(|err| PoolError::migration(err.to_string()))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map(|applied| applied.len())
        .map_err(|err| PoolError::migration(err.to_string()))
}
