//! Rendering-service boundary for the live map marker sync.
//!
//! The rendering service owns the overlay: named namespaces (marker sets)
//! holding positioned, labelled markers, plus a registry of icon assets.
//! This crate describes that service as the [`OverlayService`] trait, ships
//! an in-process implementation ([`InMemoryOverlay`]), and wraps one
//! namespace in the [`MarkerSet`] adapter the reconciliation engine talks
//! to.
//!
//! # Modules
//!
//! - [`service`] -- [`OverlayService`] capability trait and [`NamespaceSpec`]
//! - [`memory`] -- [`InMemoryOverlay`], a thread-safe in-process service
//! - [`marker_set`] -- [`MarkerSet`] adapter scoped to one namespace
//! - [`readiness`] -- [`ReadySignal`] handshake with the host runtime
//! - [`error`] -- Shared error types

pub mod error;
pub mod marker_set;
pub mod memory;
pub mod readiness;
pub mod service;

// Re-export primary types for convenience.
pub use error::{MarkerError, OverlayError};
pub use marker_set::MarkerSet;
pub use memory::{InMemoryOverlay, RegisteredIcon};
pub use readiness::ReadySignal;
pub use service::{NamespaceSpec, OverlayService};
