//! Live-entity snapshot reads.
//!
//! A snapshot is the full `players` table as of the moment of the call. The
//! reader never caches and never retries: a failed read is reported to the
//! caller, which simply tries again on its next tick. Row order is whatever
//! `SQLite` returns and carries no meaning.
//!
//! Column types are coerced in SQL so one malformed row cannot fail the whole
//! read: a coordinate that is not a number reads as `0.0`.

use std::future::Future;
use std::time::Duration;

use markersync_types::{DEFAULT_WORLD, LiveEntity, Position};

use crate::error::StoreError;
use crate::sqlite::StorePool;

/// Default deadline for a single snapshot query.
const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 5;

/// A source of live-entity snapshots.
///
/// Implemented by [`PlayerSnapshotReader`] for the `SQLite` record store and
/// by scripted readers in tests.
pub trait SnapshotReader: Send + Sync {
    /// Whether the underlying store connection is open.
    ///
    /// A reconciliation tick is a no-op while this returns `false`.
    fn is_open(&self) -> bool;

    /// Read every live entity currently in the store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the store cannot be reached and
    /// [`StoreError::Query`] or [`StoreError::QueryTimeout`] if the read
    /// itself fails.
    fn read_snapshot(&self) -> impl Future<Output = Result<Vec<LiveEntity>, StoreError>> + Send;

    /// Release the store connection. Calling it twice is harmless.
    fn close(&self) -> impl Future<Output = ()> + Send;
}

/// A row from the `players` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlayerRow {
    /// Stable player token.
    pub token: String,
    /// Player display name.
    pub name: String,
    /// World (dimension) the player is in.
    pub dimension: Option<String>,
    /// East-west coordinate.
    pub x: Option<f64>,
    /// Height coordinate.
    pub y: Option<f64>,
    /// North-south coordinate.
    pub z: Option<f64>,
}

impl From<PlayerRow> for LiveEntity {
    fn from(row: PlayerRow) -> Self {
        let world = row
            .dimension
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_WORLD.to_owned());
        Self {
            identity: row.token,
            display_name: row.name,
            position: Position {
                world,
                x: row.x.unwrap_or_default(),
                y: row.y.unwrap_or_default(),
                z: row.z.unwrap_or_default(),
            },
        }
    }
}

/// Reads live entities from the `players` table.
#[derive(Clone)]
pub struct PlayerSnapshotReader {
    store: StorePool,
    query: String,
    query_timeout: Duration,
}

impl PlayerSnapshotReader {
    /// Create a reader over `table` in the given store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if `table` is not a plain SQL
    /// identifier (it is interpolated into the query).
    pub fn new(store: StorePool, table: &str) -> Result<Self, StoreError> {
        if !is_plain_identifier(table) {
            return Err(StoreError::Config(format!(
                "table name {table:?} is not a plain identifier"
            )));
        }
        Ok(Self {
            store,
            query: format!(
                "SELECT CAST(token AS TEXT) AS token, CAST(name AS TEXT) AS name, \
                 CAST(dimension AS TEXT) AS dimension, CAST(x AS REAL) AS x, \
                 CAST(y AS REAL) AS y, CAST(z AS REAL) AS z FROM {table}"
            ),
            query_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
        })
    }

    /// Set the deadline for a single snapshot query.
    #[must_use]
    pub const fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// The store this reader reads from.
    pub const fn store(&self) -> &StorePool {
        &self.store
    }

    async fn fetch_rows(&self) -> Result<Vec<PlayerRow>, StoreError> {
        let rows = sqlx::query_as::<_, PlayerRow>(&self.query)
            .fetch_all(self.store.pool())
            .await?;
        Ok(rows)
    }
}

impl SnapshotReader for PlayerSnapshotReader {
    fn is_open(&self) -> bool {
        self.store.is_open()
    }

    async fn read_snapshot(&self) -> Result<Vec<LiveEntity>, StoreError> {
        if !self.store.is_open() {
            return Err(StoreError::Unavailable("connection closed".to_owned()));
        }

        let rows = tokio::time::timeout(self.query_timeout, self.fetch_rows())
            .await
            .map_err(|_elapsed| StoreError::QueryTimeout {
                elapsed_ms: u64::try_from(self.query_timeout.as_millis()).unwrap_or(u64::MAX),
            })??;

        tracing::debug!(rows = rows.len(), "Read live-entity snapshot");
        Ok(rows.into_iter().map(LiveEntity::from).collect())
    }

    async fn close(&self) {
        self.store.close().await;
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_without_dimension_lands_in_default_world() {
        let row = PlayerRow {
            token: "t1".to_owned(),
            name: "Bob".to_owned(),
            dimension: None,
            x: Some(1.5),
            y: None,
            z: Some(-3.0),
        };
        let entity = LiveEntity::from(row);
        assert_eq!(entity.identity, "t1");
        assert_eq!(entity.display_name, "Bob");
        assert_eq!(entity.position, Position::new(DEFAULT_WORLD, 1.5, 0.0, -3.0));
    }

    #[test]
    fn blank_dimension_is_treated_as_missing() {
        let row = PlayerRow {
            token: "t2".to_owned(),
            name: "Eve".to_owned(),
            dimension: Some("  ".to_owned()),
            x: None,
            y: None,
            z: None,
        };
        assert_eq!(LiveEntity::from(row).position.world, DEFAULT_WORLD);
    }

    #[test]
    fn identifier_check() {
        assert!(is_plain_identifier("players"));
        assert!(is_plain_identifier("_live_2"));
        assert!(!is_plain_identifier(""));
        assert!(!is_plain_identifier("2players"));
        assert!(!is_plain_identifier("players; DROP TABLE x"));
    }
}
