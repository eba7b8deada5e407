//! The rendering service's capability set.
//!
//! Everything the marker sync needs from the service that draws the map:
//! namespace bootstrap and teardown, marker CRUD inside a namespace, and icon
//! registration. Implementations must be safe to call from several tasks at
//! once; the reconciliation engine adds no locking of its own.

use std::future::Future;

use markersync_types::{IconHandle, MarkerId, OverlayMarker, Position};

use crate::error::OverlayError;

/// Identity and display label of an overlay namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceSpec {
    /// Unique namespace ID.
    pub id: String,
    /// Label shown in the map's layer control.
    pub label: String,
}

impl NamespaceSpec {
    /// Create a namespace spec.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// A rendering service holding overlay namespaces and icon assets.
///
/// Async methods return `Send` futures so callers can drive them from
/// spawned Tokio tasks.
pub trait OverlayService: Send + Sync {
    /// Create the namespace if it does not exist yet.
    ///
    /// Returns `true` if the namespace was created, `false` if it already
    /// existed (its markers are left untouched).
    fn ensure_namespace(
        &self,
        spec: &NamespaceSpec,
    ) -> impl Future<Output = Result<bool, OverlayError>> + Send;

    /// Whether the namespace currently exists.
    fn namespace_exists(&self, namespace: &str) -> impl Future<Output = bool> + Send;

    /// List every marker in the namespace.
    fn list_markers(
        &self,
        namespace: &str,
    ) -> impl Future<Output = Result<Vec<OverlayMarker>, OverlayError>> + Send;

    /// Add a new marker to the namespace.
    ///
    /// Fails with [`OverlayError::MarkerExists`] if the ID is taken.
    fn create_marker(
        &self,
        namespace: &str,
        marker: OverlayMarker,
    ) -> impl Future<Output = Result<OverlayMarker, OverlayError>> + Send;

    /// Move and relabel an existing marker. Setting identical values is a
    /// no-op.
    fn update_marker(
        &self,
        namespace: &str,
        marker_id: &MarkerId,
        label: &str,
        position: &Position,
    ) -> impl Future<Output = Result<(), OverlayError>> + Send;

    /// Remove a marker from the namespace.
    fn delete_marker(
        &self,
        namespace: &str,
        marker_id: &MarkerId,
    ) -> impl Future<Output = Result<(), OverlayError>> + Send;

    /// Remove the namespace and every marker in it.
    fn delete_namespace(&self, namespace: &str)
    -> impl Future<Output = Result<(), OverlayError>> + Send;

    /// Register an image as a new icon asset and return its handle.
    ///
    /// Registering an ID that already exists replaces the image and returns
    /// the same handle.
    fn register_icon(
        &self,
        icon_id: &str,
        label: &str,
        image: Vec<u8>,
    ) -> impl Future<Output = Result<IconHandle, OverlayError>> + Send;

    /// Handle of the icon every service ships with.
    fn default_icon(&self) -> IconHandle;
}
