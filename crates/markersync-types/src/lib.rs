//! Shared type definitions for the live map marker sync.
//!
//! Types defined here flow downstream to `TypeScript` via `ts-rs` so a map
//! frontend can consume the observer API without hand-written bindings.
//!
//! # Modules
//!
//! - [`ids`] -- String newtypes for marker IDs and icon handles
//! - [`structs`] -- Live entities, positions, overlay markers, tick summaries

pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use ids::{DEFAULT_ICON_ID, IconHandle, MarkerId};
pub use structs::{DEFAULT_WORLD, LiveEntity, OverlayMarker, Position, TickSummary};
