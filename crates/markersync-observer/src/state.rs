//! Shared application state for the Observer API server.
//!
//! [`AppState`] holds the broadcast channel for tick outcomes and an
//! in-memory [`OverlaySnapshot`] the REST endpoints serve.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use markersync_core::control::SchedulerControl;
use markersync_core::engine::TickOutcome;
use markersync_types::{OverlayMarker, TickSummary};
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, broadcast};

/// Capacity of the broadcast channel for tick outcomes.
///
/// If a subscriber falls behind by more than this many messages it will
/// receive a [`broadcast::error::RecvError::Lagged`] and skip to the
/// newest message.
const BROADCAST_CAPACITY: usize = 256;

/// Number of recent ticks kept for `GET /api/ticks`.
pub const MAX_TICK_HISTORY: usize = 100;

/// How a tick ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickStatus {
    /// The pass ran to the end.
    Completed,
    /// The pass stopped before mutating anything.
    Aborted,
    /// A precondition did not hold.
    Skipped,
}

/// JSON-serializable tick outcome pushed over the `WebSocket`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickBroadcast {
    /// The tick number.
    pub tick: u64,
    /// How the tick ended.
    pub status: TickStatus,
    /// Counts, for completed ticks.
    pub summary: Option<TickSummary>,
    /// Error or skip reason, for ticks that did not complete.
    pub detail: Option<String>,
    /// When the outcome was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl From<&TickOutcome> for TickBroadcast {
    fn from(outcome: &TickOutcome) -> Self {
        let (status, summary, detail) = match outcome {
            TickOutcome::Completed(summary) => (TickStatus::Completed, Some(summary.clone()), None),
            TickOutcome::Aborted { error, .. } => {
                (TickStatus::Aborted, None, Some(error.to_string()))
            }
            TickOutcome::Skipped { reason, .. } => {
                (TickStatus::Skipped, None, Some(reason.to_string()))
            }
        };
        Self {
            tick: outcome.tick(),
            status,
            summary,
            detail,
            recorded_at: Utc::now(),
        }
    }
}

/// In-memory view of the overlay served by REST endpoints.
///
/// Updated each tick by the engine.
#[derive(Debug, Clone, Default)]
pub struct OverlaySnapshot {
    /// Namespace the markers belong to.
    pub namespace: String,
    /// Markers after the latest tick, ordered by marker ID.
    pub markers: Vec<OverlayMarker>,
    /// Most recent ticks, oldest first, capped at [`MAX_TICK_HISTORY`].
    pub ticks: VecDeque<TickBroadcast>,
}

impl OverlaySnapshot {
    /// Append a tick, dropping the oldest past the cap.
    pub fn push_tick(&mut self, tick: TickBroadcast) {
        if self.ticks.len() >= MAX_TICK_HISTORY {
            self.ticks.pop_front();
        }
        self.ticks.push_back(tick);
    }

    /// The latest tick, if any.
    pub fn latest_tick(&self) -> Option<&TickBroadcast> {
        self.ticks.back()
    }
}

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Broadcast sender for tick outcome messages.
    pub tx: broadcast::Sender<TickBroadcast>,
    /// The current overlay snapshot (updated each tick).
    pub snapshot: Arc<RwLock<OverlaySnapshot>>,
    /// Shared scheduler control (present when the engine is running).
    pub control: Option<Arc<SchedulerControl>>,
}

impl AppState {
    /// Create application state for `namespace` with an empty snapshot.
    pub fn new(namespace: &str) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            tx,
            snapshot: Arc::new(RwLock::new(OverlaySnapshot {
                namespace: namespace.to_owned(),
                ..OverlaySnapshot::default()
            })),
            control: None,
        }
    }

    /// Create application state with scheduler control attached.
    pub fn with_control(namespace: &str, control: Arc<SchedulerControl>) -> Self {
        Self {
            control: Some(control),
            ..Self::new(namespace)
        }
    }

    /// Subscribe to the tick broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<TickBroadcast> {
        self.tx.subscribe()
    }

    /// Publish a tick outcome to all connected clients.
    ///
    /// Returns the number of receivers that received the message.
    /// Returns 0 if no clients are connected (this is not an error).
    pub fn broadcast(&self, tick: &TickBroadcast) -> usize {
        // send returns Err only when there are zero receivers,
        // which is normal when no WebSocket clients are connected.
        self.tx.send(tick.clone()).unwrap_or(0)
    }

    /// Record a tick and, if given, the markers after it, without waiting.
    ///
    /// Returns `false` if a reader holds the snapshot; the update is then
    /// dropped and the next tick replaces it.
    pub fn try_record(&self, tick: &TickBroadcast, markers: Option<Vec<OverlayMarker>>) -> bool {
        let Ok(mut snapshot) = self.snapshot.try_write() else {
            return false;
        };
        snapshot.push_tick(tick.clone());
        if let Some(markers) = markers {
            snapshot.markers = markers;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use markersync_core::engine::SkipReason;

    use super::*;

    fn skipped(tick: u64) -> TickBroadcast {
        TickBroadcast::from(&TickOutcome::Skipped {
            tick,
            reason: SkipReason::StoreClosed,
        })
    }

    #[test]
    fn history_is_capped() {
        let mut snapshot = OverlaySnapshot::default();
        for tick in 1..=150 {
            snapshot.push_tick(skipped(tick));
        }
        assert_eq!(snapshot.ticks.len(), MAX_TICK_HISTORY);
        assert_eq!(snapshot.ticks.front().map(|t| t.tick), Some(51));
        assert_eq!(snapshot.latest_tick().map(|t| t.tick), Some(150));
    }

    #[test]
    fn skipped_outcome_carries_reason() {
        let tick = skipped(3);
        assert_eq!(tick.status, TickStatus::Skipped);
        assert_eq!(tick.detail.as_deref(), Some("record store closed"));
        assert!(tick.summary.is_none());
    }

    #[test]
    fn broadcast_without_receivers_is_fine() {
        let state = AppState::new("ns");
        assert_eq!(state.broadcast(&skipped(1)), 0);
        let mut rx = state.subscribe();
        assert_eq!(state.broadcast(&skipped(2)), 1);
        assert_eq!(rx.try_recv().map(|t| t.tick).ok(), Some(2));
    }

    #[tokio::test]
    async fn try_record_yields_to_readers() {
        let state = AppState::new("ns");
        {
            let _reader = state.snapshot.read().await;
            assert!(!state.try_record(&skipped(1), None));
        }
        assert!(state.try_record(&skipped(2), Some(Vec::new())));
        assert_eq!(state.snapshot.read().await.ticks.len(), 1);
    }
}
