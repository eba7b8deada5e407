//! `SQLite` record-store connection handling.
//!
//! The record store lives in a `SQLite` file owned by the admin server. The
//! pool is opened once at startup and closed exactly once at teardown;
//! [`StorePool::is_open`] is the precondition every tick checks before
//! reading.

use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::error::StoreError;

/// Default maximum number of connections in the pool.
const DEFAULT_MAX_CONNECTIONS: u32 = 4;

/// Default connection timeout in seconds.
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Default idle timeout in seconds.
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;

/// Default table holding the live entities.
const DEFAULT_TABLE: &str = "players";

/// Configuration for the record-store connection pool.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// `SQLite` connection URL.
    ///
    /// Format: `sqlite://path/to/players.db` or `sqlite::memory:`
    pub url: String,
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Connection (and acquire) timeout.
    pub connect_timeout: Duration,
    /// Idle connection timeout.
    pub idle_timeout: Duration,
    /// Open the database read-only.
    pub read_only: bool,
    /// Name of the table holding the live entities.
    pub table: String,
}

impl StoreConfig {
    /// Create a new configuration from a database URL.
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_owned(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
            read_only: true,
            table: DEFAULT_TABLE.to_owned(),
        }
    }

    /// Set the maximum number of connections.
    #[must_use]
    pub const fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Open the database read-write instead of read-only.
    #[must_use]
    pub const fn writable(mut self) -> Self {
        self.read_only = false;
        self
    }

    /// Set the live-entity table name.
    #[must_use]
    pub fn with_table(mut self, table: &str) -> Self {
        table.clone_into(&mut self.table);
        self
    }
}

/// Connection pool handle to the record store.
#[derive(Clone)]
pub struct StorePool {
    pool: SqlitePool,
}

impl StorePool {
    /// Connect to the record store using the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the URL cannot be parsed.
    /// Returns [`StoreError::Unavailable`] if the connection fails.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let connect_options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| StoreError::Config(format!("Invalid database URL: {e}")))?
            .read_only(config.read_only);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout)
            .connect_with(connect_options)
            .await
            .map_err(|e| StoreError::Unavailable(format!("failed to open {}: {e}", config.url)))?;

        tracing::info!(
            url = config.url,
            max_connections = config.max_connections,
            read_only = config.read_only,
            "Opened record store"
        );

        Ok(Self { pool })
    }

    /// Return a reference to the underlying [`SqlitePool`].
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Whether the pool is still accepting work.
    pub fn is_open(&self) -> bool {
        !self.pool.is_closed()
    }

    /// Close all connections in the pool gracefully.
    ///
    /// Safe to call more than once.
    pub async fn close(&self) {
        if self.pool.is_closed() {
            return;
        }
        self.pool.close().await;
        tracing::info!("Record store closed");
    }
}
