//! In-process rendering service.
//!
//! [`InMemoryOverlay`] keeps namespaces, markers, and icon assets in memory
//! behind a single [`RwLock`]. It is the service the engine binary runs
//! against (the observer API publishes its contents) and the fixture the
//! reconciliation tests run against.
//!
//! Icon assets must be PNG images, matching what map renderers accept;
//! anything else is rejected at registration.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use markersync_types::{DEFAULT_ICON_ID, IconHandle, MarkerId, OverlayMarker, Position};

use crate::error::OverlayError;
use crate::service::{NamespaceSpec, OverlayService};

/// Eight-byte signature every PNG file starts with.
const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// An icon asset held by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredIcon {
    /// Label supplied at registration.
    pub label: String,
    /// Raw PNG bytes.
    pub image: Vec<u8>,
}

#[derive(Debug)]
struct Namespace {
    label: String,
    markers: BTreeMap<MarkerId, OverlayMarker>,
}

#[derive(Debug, Default)]
struct OverlayState {
    namespaces: BTreeMap<String, Namespace>,
    icons: BTreeMap<String, RegisteredIcon>,
}

impl OverlayState {
    fn namespace_mut(&mut self, namespace: &str) -> Result<&mut Namespace, OverlayError> {
        self.namespaces
            .get_mut(namespace)
            .ok_or_else(|| OverlayError::NamespaceNotFound {
                namespace: namespace.to_owned(),
            })
    }
}

/// Thread-safe, in-process [`OverlayService`].
#[derive(Debug, Default)]
pub struct InMemoryOverlay {
    state: RwLock<OverlayState>,
}

impl InMemoryOverlay {
    /// Create an empty service.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, OverlayState> {
        // Every mutation below leaves the state consistent before it can
        // panic, so a poisoned lock still guards valid data.
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, OverlayState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current markers in `namespace`, ordered by marker ID.
    ///
    /// Returns an empty list if the namespace does not exist.
    pub fn markers_in(&self, namespace: &str) -> Vec<OverlayMarker> {
        self.read()
            .namespaces
            .get(namespace)
            .map(|ns| ns.markers.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Label of `namespace`, if it exists.
    pub fn namespace_label(&self, namespace: &str) -> Option<String> {
        self.read()
            .namespaces
            .get(namespace)
            .map(|ns| ns.label.clone())
    }

    /// The registered icon behind `handle`, if any.
    pub fn icon(&self, handle: &IconHandle) -> Option<RegisteredIcon> {
        self.read().icons.get(handle.as_str()).cloned()
    }

    /// Number of registered icons, not counting the built-in default.
    pub fn icon_count(&self) -> usize {
        self.read().icons.len()
    }
}

impl OverlayService for InMemoryOverlay {
    async fn ensure_namespace(&self, spec: &NamespaceSpec) -> Result<bool, OverlayError> {
        let mut state = self.write();
        if state.namespaces.contains_key(&spec.id) {
            return Ok(false);
        }
        state.namespaces.insert(
            spec.id.clone(),
            Namespace {
                label: spec.label.clone(),
                markers: BTreeMap::new(),
            },
        );
        tracing::debug!(namespace = spec.id, label = spec.label, "Created namespace");
        Ok(true)
    }

    async fn namespace_exists(&self, namespace: &str) -> bool {
        self.read().namespaces.contains_key(namespace)
    }

    async fn list_markers(&self, namespace: &str) -> Result<Vec<OverlayMarker>, OverlayError> {
        self.read()
            .namespaces
            .get(namespace)
            .map(|ns| ns.markers.values().cloned().collect())
            .ok_or_else(|| OverlayError::NamespaceNotFound {
                namespace: namespace.to_owned(),
            })
    }

    async fn create_marker(
        &self,
        namespace: &str,
        marker: OverlayMarker,
    ) -> Result<OverlayMarker, OverlayError> {
        let mut state = self.write();
        let ns = state.namespace_mut(namespace)?;
        if ns.markers.contains_key(&marker.marker_id) {
            return Err(OverlayError::MarkerExists {
                marker_id: marker.marker_id,
            });
        }
        ns.markers.insert(marker.marker_id.clone(), marker.clone());
        Ok(marker)
    }

    async fn update_marker(
        &self,
        namespace: &str,
        marker_id: &MarkerId,
        label: &str,
        position: &Position,
    ) -> Result<(), OverlayError> {
        let mut state = self.write();
        let ns = state.namespace_mut(namespace)?;
        let marker = ns
            .markers
            .get_mut(marker_id)
            .ok_or_else(|| OverlayError::MarkerNotFound {
                marker_id: marker_id.clone(),
            })?;
        label.clone_into(&mut marker.label);
        marker.position.clone_from(position);
        Ok(())
    }

    async fn delete_marker(&self, namespace: &str, marker_id: &MarkerId) -> Result<(), OverlayError> {
        let mut state = self.write();
        let ns = state.namespace_mut(namespace)?;
        ns.markers
            .remove(marker_id)
            .map(|_removed| ())
            .ok_or_else(|| OverlayError::MarkerNotFound {
                marker_id: marker_id.clone(),
            })
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<(), OverlayError> {
        let removed = self.write().namespaces.remove(namespace);
        removed
            .map(|ns| {
                tracing::debug!(namespace, markers = ns.markers.len(), "Deleted namespace");
            })
            .ok_or_else(|| OverlayError::NamespaceNotFound {
                namespace: namespace.to_owned(),
            })
    }

    async fn register_icon(
        &self,
        icon_id: &str,
        label: &str,
        image: Vec<u8>,
    ) -> Result<IconHandle, OverlayError> {
        if icon_id == DEFAULT_ICON_ID {
            return Err(OverlayError::IconRejected {
                icon_id: icon_id.to_owned(),
                reason: "the default icon cannot be replaced".to_owned(),
            });
        }
        if !image.starts_with(&PNG_SIGNATURE) {
            return Err(OverlayError::IconRejected {
                icon_id: icon_id.to_owned(),
                reason: "image is not a PNG".to_owned(),
            });
        }
        self.write().icons.insert(
            icon_id.to_owned(),
            RegisteredIcon {
                label: label.to_owned(),
                image,
            },
        );
        Ok(IconHandle::new(icon_id))
    }

    fn default_icon(&self) -> IconHandle {
        IconHandle::default_icon()
    }
}
