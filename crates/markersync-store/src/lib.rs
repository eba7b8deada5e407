//! Record-store access for the live map marker sync.
//!
//! The record store is a `SQLite` database written by the admin server. This
//! crate only ever reads from it: every reconciliation tick takes one fresh
//! snapshot of the live entities, with no caching between ticks.
//!
//! # Architecture
//!
//! ```text
//! Reconciliation tick
//!     |
//!     +-- read_snapshot --> PlayerSnapshotReader --> StorePool --> players table
//! ```
//!
//! # Modules
//!
//! - [`sqlite`] -- `SQLite` connection pool and configuration
//! - [`snapshot_reader`] -- [`SnapshotReader`] trait and the `players` table reader
//! - [`error`] -- Shared error types
//!
//! [`SnapshotReader`]: snapshot_reader::SnapshotReader

pub mod error;
pub mod snapshot_reader;
pub mod sqlite;

// Re-export primary types for convenience.
pub use error::StoreError;
pub use snapshot_reader::{PlayerRow, PlayerSnapshotReader, SnapshotReader};
pub use sqlite::{StoreConfig, StorePool};
