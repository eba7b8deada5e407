//! Tick callback that updates the Observer API state.
//!
//! After each tick, this callback records the outcome and the namespace's
//! markers in the [`OverlaySnapshot`] and broadcasts a [`TickBroadcast`] to
//! connected `WebSocket` clients.
//!
//! [`OverlaySnapshot`]: markersync_observer::state::OverlaySnapshot

use std::sync::Arc;

use markersync_core::engine::TickOutcome;
use markersync_core::scheduler::TickCallback;
use markersync_observer::state::{AppState, TickBroadcast};
use markersync_overlay::InMemoryOverlay;
use tracing::debug;

/// Callback that bridges the scheduler to the Observer API.
pub struct ObserverCallback {
    state: Arc<AppState>,
    overlay: Arc<InMemoryOverlay>,
    namespace: String,
}

impl ObserverCallback {
    /// Create a callback reading markers of `namespace` from `overlay`.
    pub const fn new(
        state: Arc<AppState>,
        overlay: Arc<InMemoryOverlay>,
        namespace: String,
    ) -> Self {
        Self {
            state,
            overlay,
            namespace,
        }
    }
}

impl TickCallback for ObserverCallback {
    fn on_tick(&mut self, outcome: &TickOutcome) {
        let broadcast = TickBroadcast::from(outcome);

        let receivers = self.state.broadcast(&broadcast);
        debug!(tick = broadcast.tick, receivers, "Tick broadcast sent");

        // Markers only move on completed ticks.
        let markers = outcome
            .summary()
            .map(|_| self.overlay.markers_in(&self.namespace));

        if !self.state.try_record(&broadcast, markers) {
            debug!(tick = broadcast.tick, "Snapshot busy, skipping update");
        }
    }
}
