//! Observer API server for the live map marker sync.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws/ticks`) streaming every tick outcome
//!   via [`tokio::sync::broadcast`]
//! - **REST endpoints** for the current overlay markers and recent tick
//!   history
//! - **Operator REST endpoints** for runtime control (pause, resume,
//!   speed, status, stop)
//!
//! # Architecture
//!
//! The observer reads from an in-memory [`OverlaySnapshot`] that the engine
//! refreshes after each tick. REST reads never touch the record store or
//! the rendering service, so the observer cannot stall a tick.
//!
//! [`OverlaySnapshot`]: state::OverlaySnapshot

pub mod error;
pub mod handlers;
pub mod operator;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::{AppState, OverlaySnapshot, TickBroadcast, TickStatus};
