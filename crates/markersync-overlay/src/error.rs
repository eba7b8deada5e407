//! Error types for the overlay boundary.
//!
//! [`OverlayError`] is what a rendering service reports. [`MarkerError`] is
//! the adapter-level taxonomy the reconciliation engine sees; each variant
//! names the operation that failed and the marker it failed for, so one
//! failure can be logged and skipped without touching its siblings.

use markersync_types::MarkerId;

/// Errors reported by a rendering service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OverlayError {
    /// The namespace does not exist.
    #[error("namespace not found: {namespace}")]
    NamespaceNotFound {
        /// The namespace that was looked up.
        namespace: String,
    },

    /// The marker does not exist in the namespace.
    #[error("marker not found: {marker_id}")]
    MarkerNotFound {
        /// The marker that was looked up.
        marker_id: MarkerId,
    },

    /// A marker with this ID already exists in the namespace.
    #[error("marker already exists: {marker_id}")]
    MarkerExists {
        /// The conflicting marker ID.
        marker_id: MarkerId,
    },

    /// The service refused an icon asset.
    #[error("icon {icon_id} rejected: {reason}")]
    IconRejected {
        /// The icon ID that was being registered.
        icon_id: String,
        /// Why the asset was refused.
        reason: String,
    },

    /// The service could not be reached or failed internally.
    #[error("rendering service unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by the [`MarkerSet`](crate::MarkerSet) adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarkerError {
    /// The marker does not exist (update or delete of a missing marker).
    #[error("marker {marker_id} not found")]
    NotFound {
        /// The missing marker.
        marker_id: MarkerId,
    },

    /// Creating the marker failed.
    #[error("failed to create marker {marker_id}: {source}")]
    CreateFailed {
        /// The marker being created.
        marker_id: MarkerId,
        /// The underlying service error.
        source: OverlayError,
    },

    /// Updating the marker failed.
    #[error("failed to update marker {marker_id}: {source}")]
    UpdateFailed {
        /// The marker being updated.
        marker_id: MarkerId,
        /// The underlying service error.
        source: OverlayError,
    },

    /// Deleting the marker failed.
    #[error("failed to delete marker {marker_id}: {source}")]
    DeleteFailed {
        /// The marker being deleted.
        marker_id: MarkerId,
        /// The underlying service error.
        source: OverlayError,
    },

    /// Listing the namespace failed.
    #[error("failed to list markers in {namespace}: {source}")]
    ListFailed {
        /// The namespace being listed.
        namespace: String,
        /// The underlying service error.
        source: OverlayError,
    },

    /// Creating or deleting the namespace itself failed.
    #[error("namespace operation on {namespace} failed: {source}")]
    NamespaceFailed {
        /// The namespace involved.
        namespace: String,
        /// The underlying service error.
        source: OverlayError,
    },
}

impl MarkerError {
    /// The marker this error concerns, if it concerns a single marker.
    pub const fn marker_id(&self) -> Option<&MarkerId> {
        match self {
            Self::NotFound { marker_id }
            | Self::CreateFailed { marker_id, .. }
            | Self::UpdateFailed { marker_id, .. }
            | Self::DeleteFailed { marker_id, .. } => Some(marker_id),
            Self::ListFailed { .. } | Self::NamespaceFailed { .. } => None,
        }
    }
}
