//! Shared fixtures for engine integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::arithmetic_side_effects)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use markersync_core::engine::{EngineSettings, ReconciliationEngine};
use markersync_icons::{IconProvisioner, ProvisionerConfig};
use markersync_overlay::{
    InMemoryOverlay, MarkerSet, NamespaceSpec, OverlayError, OverlayService,
};
use markersync_store::{SnapshotReader, StoreError};
use markersync_types::{IconHandle, LiveEntity, MarkerId, OverlayMarker, Position};

pub const NS: &str = "live_map_players";
pub const PREFIX: &str = "plr_";

pub fn entity(id: &str, name: &str, x: f64, y: f64, z: f64) -> LiveEntity {
    LiveEntity::new(id, name, Position::new("w", x, y, z))
}

pub fn spec() -> NamespaceSpec {
    NamespaceSpec::new(NS, "Live Map Players")
}

// ---------------------------------------------------------------------------
// Recording overlay
// ---------------------------------------------------------------------------

/// One call made against the overlay.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Ensure,
    List,
    Create {
        marker_id: MarkerId,
        label: String,
        position: Position,
        icon: IconHandle,
    },
    Update {
        marker_id: MarkerId,
        label: String,
        position: Position,
    },
    Delete(MarkerId),
    DeleteNamespace,
    RegisterIcon(String),
}

impl Call {
    pub const fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::Create { .. } | Self::Update { .. } | Self::Delete(_)
        )
    }
}

/// An [`InMemoryOverlay`] that records every call and fails on request.
#[derive(Debug, Default)]
pub struct RecordingOverlay {
    inner: InMemoryOverlay,
    calls: Mutex<Vec<Call>>,
    fail_markers: Mutex<HashSet<MarkerId>>,
    fail_list: AtomicBool,
    fail_ensure: AtomicBool,
    create_delay: Mutex<Option<Duration>>,
    creates_in_flight: AtomicUsize,
    max_creates_in_flight: AtomicUsize,
}

impl RecordingOverlay {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn markers(&self) -> Vec<OverlayMarker> {
        self.inner.markers_in(NS)
    }

    pub fn marker_ids(&self) -> Vec<String> {
        self.markers()
            .into_iter()
            .map(|m| m.marker_id.into_inner())
            .collect()
    }

    /// Make every mutation of `marker_id` fail with `Unavailable`.
    pub fn fail_marker(&self, marker_id: &str) {
        self.fail_markers
            .lock()
            .unwrap()
            .insert(MarkerId::new(marker_id));
    }

    pub fn heal(&self) {
        self.fail_markers.lock().unwrap().clear();
        self.fail_list.store(false, Ordering::SeqCst);
        self.fail_ensure.store(false, Ordering::SeqCst);
    }

    pub fn fail_list(&self) {
        self.fail_list.store(true, Ordering::SeqCst);
    }

    pub fn fail_ensure(&self) {
        self.fail_ensure.store(true, Ordering::SeqCst);
    }

    pub fn set_create_delay(&self, delay: Duration) {
        *self.create_delay.lock().unwrap() = Some(delay);
    }

    pub fn max_creates_in_flight(&self) -> usize {
        self.max_creates_in_flight.load(Ordering::SeqCst)
    }

    /// Put a marker straight into the namespace, bypassing the log.
    pub async fn seed(&self, marker: OverlayMarker) {
        self.inner.ensure_namespace(&spec()).await.unwrap();
        self.inner.create_marker(NS, marker).await.unwrap();
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn injected_failure(&self, marker_id: &MarkerId) -> Result<(), OverlayError> {
        if self.fail_markers.lock().unwrap().contains(marker_id) {
            Err(OverlayError::Unavailable(format!("injected failure for {marker_id}")))
        } else {
            Ok(())
        }
    }
}

impl OverlayService for RecordingOverlay {
    async fn ensure_namespace(&self, spec: &NamespaceSpec) -> Result<bool, OverlayError> {
        self.record(Call::Ensure);
        if self.fail_ensure.load(Ordering::SeqCst) {
            return Err(OverlayError::Unavailable("injected ensure failure".to_owned()));
        }
        self.inner.ensure_namespace(spec).await
    }

    async fn namespace_exists(&self, namespace: &str) -> bool {
        self.inner.namespace_exists(namespace).await
    }

    async fn list_markers(&self, namespace: &str) -> Result<Vec<OverlayMarker>, OverlayError> {
        self.record(Call::List);
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(OverlayError::Unavailable("injected list failure".to_owned()));
        }
        self.inner.list_markers(namespace).await
    }

    async fn create_marker(
        &self,
        namespace: &str,
        marker: OverlayMarker,
    ) -> Result<OverlayMarker, OverlayError> {
        self.record(Call::Create {
            marker_id: marker.marker_id.clone(),
            label: marker.label.clone(),
            position: marker.position.clone(),
            icon: marker.icon.clone(),
        });

        let now = self.creates_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_creates_in_flight.fetch_max(now, Ordering::SeqCst);
        let delay = *self.create_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.creates_in_flight.fetch_sub(1, Ordering::SeqCst);

        self.injected_failure(&marker.marker_id)?;
        self.inner.create_marker(namespace, marker).await
    }

    async fn update_marker(
        &self,
        namespace: &str,
        marker_id: &MarkerId,
        label: &str,
        position: &Position,
    ) -> Result<(), OverlayError> {
        self.record(Call::Update {
            marker_id: marker_id.clone(),
            label: label.to_owned(),
            position: position.clone(),
        });
        self.injected_failure(marker_id)?;
        self.inner
            .update_marker(namespace, marker_id, label, position)
            .await
    }

    async fn delete_marker(&self, namespace: &str, marker_id: &MarkerId) -> Result<(), OverlayError> {
        self.record(Call::Delete(marker_id.clone()));
        self.injected_failure(marker_id)?;
        self.inner.delete_marker(namespace, marker_id).await
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<(), OverlayError> {
        self.record(Call::DeleteNamespace);
        self.inner.delete_namespace(namespace).await
    }

    async fn register_icon(
        &self,
        icon_id: &str,
        label: &str,
        image: Vec<u8>,
    ) -> Result<IconHandle, OverlayError> {
        self.record(Call::RegisterIcon(icon_id.to_owned()));
        self.inner.register_icon(icon_id, label, image).await
    }

    fn default_icon(&self) -> IconHandle {
        self.inner.default_icon()
    }
}

// ---------------------------------------------------------------------------
// Scripted snapshot reader
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Script {
    entities: Vec<LiveEntity>,
    fail_next: Option<String>,
    closed: bool,
    close_calls: usize,
    reads: usize,
}

/// A [`SnapshotReader`] whose snapshot the test sets directly.
///
/// Clones share state, so a test keeps one handle while the engine owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSnapshotReader {
    script: Arc<Mutex<Script>>,
}

impl ScriptedSnapshotReader {
    pub fn new(entities: Vec<LiveEntity>) -> Self {
        let reader = Self::default();
        reader.set(entities);
        reader
    }

    pub fn set(&self, entities: Vec<LiveEntity>) {
        self.script.lock().unwrap().entities = entities;
    }

    pub fn fail_next(&self, message: &str) {
        self.script.lock().unwrap().fail_next = Some(message.to_owned());
    }

    pub fn close_now(&self) {
        self.script.lock().unwrap().closed = true;
    }

    pub fn close_calls(&self) -> usize {
        self.script.lock().unwrap().close_calls
    }

    pub fn reads(&self) -> usize {
        self.script.lock().unwrap().reads
    }
}

impl SnapshotReader for ScriptedSnapshotReader {
    fn is_open(&self) -> bool {
        !self.script.lock().unwrap().closed
    }

    async fn read_snapshot(&self) -> Result<Vec<LiveEntity>, StoreError> {
        let mut script = self.script.lock().unwrap();
        script.reads += 1;
        if script.closed {
            return Err(StoreError::Unavailable("connection closed".to_owned()));
        }
        match script.fail_next.take() {
            Some(message) => Err(StoreError::Unavailable(message)),
            None => Ok(script.entities.clone()),
        }
    }

    async fn close(&self) {
        let mut script = self.script.lock().unwrap();
        script.closed = true;
        script.close_calls += 1;
    }
}

// ---------------------------------------------------------------------------
// Engine assembly
// ---------------------------------------------------------------------------

pub fn settings() -> EngineSettings {
    EngineSettings {
        marker_prefix: PREFIX.to_owned(),
        max_concurrent_creates: 4,
    }
}

pub fn icons_disabled(overlay: &Arc<RecordingOverlay>) -> IconProvisioner<RecordingOverlay> {
    let config = ProvisionerConfig {
        enabled: false,
        ..ProvisionerConfig::default()
    };
    IconProvisioner::new(Arc::clone(overlay), &config).unwrap()
}

pub fn engine_with(
    overlay: &Arc<RecordingOverlay>,
    reader: &ScriptedSnapshotReader,
    icons: IconProvisioner<RecordingOverlay>,
    settings: EngineSettings,
) -> ReconciliationEngine<ScriptedSnapshotReader, RecordingOverlay> {
    ReconciliationEngine::new(
        reader.clone(),
        MarkerSet::new(Arc::clone(overlay), spec()),
        icons,
        settings,
    )
}

/// Engine over `overlay` with icons disabled. The namespace is not created.
pub fn engine(
    overlay: &Arc<RecordingOverlay>,
    reader: &ScriptedSnapshotReader,
) -> ReconciliationEngine<ScriptedSnapshotReader, RecordingOverlay> {
    engine_with(overlay, reader, icons_disabled(overlay), settings())
}

/// Engine over a fresh overlay whose namespace already exists.
pub async fn bootstrapped(
    reader: &ScriptedSnapshotReader,
) -> (
    Arc<RecordingOverlay>,
    ReconciliationEngine<ScriptedSnapshotReader, RecordingOverlay>,
) {
    let overlay = RecordingOverlay::new();
    let engine = engine(&overlay, reader);
    engine.markers().ensure().await.unwrap();
    overlay.clear_calls();
    (overlay, engine)
}
