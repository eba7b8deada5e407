//! Namespace-scoped adapter over an [`OverlayService`].
//!
//! The reconciliation engine never talks to the service directly. It holds a
//! [`MarkerSet`] bound to one namespace, and every call comes back as a
//! [`MarkerError`] naming the marker and the operation that failed.

use std::sync::Arc;

use markersync_types::{IconHandle, MarkerId, OverlayMarker, Position};

use crate::error::{MarkerError, OverlayError};
use crate::service::{NamespaceSpec, OverlayService};

/// One overlay namespace on a shared rendering service.
#[derive(Debug)]
pub struct MarkerSet<O> {
    service: Arc<O>,
    spec: NamespaceSpec,
}

impl<O> Clone for MarkerSet<O> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            spec: self.spec.clone(),
        }
    }
}

impl<O: OverlayService> MarkerSet<O> {
    /// Bind `spec` on `service`. Nothing is created until [`Self::ensure`].
    pub const fn new(service: Arc<O>, spec: NamespaceSpec) -> Self {
        Self { service, spec }
    }

    /// The namespace ID.
    pub fn namespace(&self) -> &str {
        &self.spec.id
    }

    /// The namespace ID and label.
    pub const fn spec(&self) -> &NamespaceSpec {
        &self.spec
    }

    /// The underlying service.
    pub const fn service(&self) -> &Arc<O> {
        &self.service
    }

    /// Whether the namespace currently exists on the service.
    pub async fn exists(&self) -> bool {
        self.service.namespace_exists(&self.spec.id).await
    }

    /// Create the namespace if absent. Returns `true` if it was created.
    ///
    /// # Errors
    ///
    /// Returns [`MarkerError::NamespaceFailed`] if the service refuses.
    pub async fn ensure(&self) -> Result<bool, MarkerError> {
        self.service
            .ensure_namespace(&self.spec)
            .await
            .map_err(|source| self.namespace_failed(source))
    }

    /// Every marker currently in the namespace.
    ///
    /// # Errors
    ///
    /// Returns [`MarkerError::ListFailed`] if the namespace cannot be listed.
    pub async fn list_markers(&self) -> Result<Vec<OverlayMarker>, MarkerError> {
        self.service
            .list_markers(&self.spec.id)
            .await
            .map_err(|source| MarkerError::ListFailed {
                namespace: self.spec.id.clone(),
                source,
            })
    }

    /// Create a marker.
    ///
    /// # Errors
    ///
    /// Returns [`MarkerError::CreateFailed`] if the service refuses,
    /// including when the ID is already taken.
    pub async fn create_marker(
        &self,
        marker_id: MarkerId,
        label: &str,
        position: Position,
        icon: IconHandle,
    ) -> Result<OverlayMarker, MarkerError> {
        let marker = OverlayMarker {
            marker_id: marker_id.clone(),
            label: label.to_owned(),
            position,
            icon,
        };
        self.service
            .create_marker(&self.spec.id, marker)
            .await
            .map_err(|source| MarkerError::CreateFailed { marker_id, source })
    }

    /// Move and relabel an existing marker.
    ///
    /// # Errors
    ///
    /// Returns [`MarkerError::NotFound`] if the marker is gone, otherwise
    /// [`MarkerError::UpdateFailed`].
    pub async fn update_marker(
        &self,
        marker_id: &MarkerId,
        label: &str,
        position: &Position,
    ) -> Result<(), MarkerError> {
        self.service
            .update_marker(&self.spec.id, marker_id, label, position)
            .await
            .map_err(|source| match source {
                OverlayError::MarkerNotFound { marker_id } => MarkerError::NotFound { marker_id },
                source => MarkerError::UpdateFailed {
                    marker_id: marker_id.clone(),
                    source,
                },
            })
    }

    /// Remove a marker.
    ///
    /// # Errors
    ///
    /// Returns [`MarkerError::NotFound`] if the marker is already gone,
    /// otherwise [`MarkerError::DeleteFailed`].
    pub async fn delete_marker(&self, marker_id: &MarkerId) -> Result<(), MarkerError> {
        self.service
            .delete_marker(&self.spec.id, marker_id)
            .await
            .map_err(|source| match source {
                OverlayError::MarkerNotFound { marker_id } => MarkerError::NotFound { marker_id },
                source => MarkerError::DeleteFailed {
                    marker_id: marker_id.clone(),
                    source,
                },
            })
    }

    /// Remove the namespace and all its markers.
    ///
    /// # Errors
    ///
    /// Returns [`MarkerError::NamespaceFailed`] if the service refuses,
    /// including when the namespace does not exist.
    pub async fn delete_namespace(&self) -> Result<(), MarkerError> {
        self.service
            .delete_namespace(&self.spec.id)
            .await
            .map_err(|source| self.namespace_failed(source))
    }

    fn namespace_failed(&self, source: OverlayError) -> MarkerError {
        MarkerError::NamespaceFailed {
            namespace: self.spec.id.clone(),
            source,
        }
    }
}
