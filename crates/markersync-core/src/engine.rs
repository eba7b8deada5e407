//! The reconciliation engine.
//!
//! One call to [`ReconciliationEngine::run_tick`] performs one pass:
//!
//! 1. Check preconditions (namespace exists, store open). If either fails
//!    the tick is skipped without touching anything.
//! 2. Read the snapshot. A failure aborts the tick before any mutation.
//! 3. List the namespace. A failure aborts the tick before any mutation.
//! 4. Plan with [`plan_reconciliation`] and apply: creates (each waiting on
//!    its own icon) with bounded concurrency, then updates, then deletes.
//!    A failed operation is logged and counted; its siblings still run.
//!
//! The engine holds no locks. Ticks never overlap because `run_tick`
//! takes `&mut self`.

use std::fmt;
use std::time::Instant;

use chrono::Utc;
use futures::StreamExt;
use markersync_icons::IconProvisioner;
use markersync_overlay::{MarkerError, MarkerSet, OverlayService};
use markersync_store::{SnapshotReader, StoreError};
use markersync_types::{LiveEntity, MarkerId, OverlayMarker, TickSummary};
use tracing::{debug, info, warn};

use crate::diff::plan_reconciliation;

/// Tunables for the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Prefix joined to an identity to form its marker ID.
    pub marker_prefix: String,
    /// Marker creations in flight at once.
    pub max_concurrent_creates: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            marker_prefix: "plr_".to_owned(),
            max_concurrent_creates: 4,
        }
    }
}

/// Why a tick did nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The overlay namespace does not exist.
    NamespaceMissing {
        /// The namespace that was checked.
        namespace: String,
    },
    /// The record-store connection is closed.
    StoreClosed,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NamespaceMissing { namespace } => write!(f, "namespace {namespace} missing"),
            Self::StoreClosed => f.write_str("record store closed"),
        }
    }
}

/// Why a tick was abandoned before mutating anything.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// The snapshot read failed.
    #[error("snapshot read failed: {0}")]
    Snapshot(#[source] StoreError),

    /// Listing the namespace failed.
    #[error("marker listing failed: {0}")]
    Listing(#[source] MarkerError),
}

/// Result of one tick. Never an `Err`: every failure mode is a value.
#[derive(Debug)]
pub enum TickOutcome {
    /// The pass ran to the end; per-marker failures are in the summary.
    Completed(TickSummary),

    /// The pass stopped before any mutation.
    Aborted {
        /// Tick sequence number.
        tick: u64,
        /// What failed.
        error: TickError,
    },

    /// A precondition did not hold.
    Skipped {
        /// Tick sequence number.
        tick: u64,
        /// Which precondition.
        reason: SkipReason,
    },
}

impl TickOutcome {
    /// The tick sequence number.
    pub const fn tick(&self) -> u64 {
        match self {
            Self::Completed(summary) => summary.tick,
            Self::Aborted { tick, .. } | Self::Skipped { tick, .. } => *tick,
        }
    }

    /// The summary of a completed tick.
    pub const fn summary(&self) -> Option<&TickSummary> {
        match self {
            Self::Completed(summary) => Some(summary),
            Self::Aborted { .. } | Self::Skipped { .. } => None,
        }
    }

    /// Short lowercase name of the variant.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Completed(_) => "completed",
            Self::Aborted { .. } => "aborted",
            Self::Skipped { .. } => "skipped",
        }
    }
}

/// Converges one overlay namespace onto the record store's live entities.
pub struct ReconciliationEngine<R, O> {
    reader: R,
    markers: MarkerSet<O>,
    icons: IconProvisioner<O>,
    settings: EngineSettings,
    tick: u64,
    last_skip: Option<SkipReason>,
}

impl<R: SnapshotReader, O: OverlayService> ReconciliationEngine<R, O> {
    /// Assemble an engine from its collaborators.
    pub const fn new(
        reader: R,
        markers: MarkerSet<O>,
        icons: IconProvisioner<O>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            reader,
            markers,
            icons,
            settings,
            tick: 0,
            last_skip: None,
        }
    }

    /// The namespace adapter.
    pub const fn markers(&self) -> &MarkerSet<O> {
        &self.markers
    }

    /// The snapshot reader.
    pub const fn reader(&self) -> &R {
        &self.reader
    }

    /// The icon provisioner.
    pub const fn icons(&self) -> &IconProvisioner<O> {
        &self.icons
    }

    /// The engine settings.
    pub const fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Number of ticks started so far.
    pub const fn ticks_run(&self) -> u64 {
        self.tick
    }

    /// Run one reconciliation pass.
    pub async fn run_tick(&mut self) -> TickOutcome {
        self.tick = self.tick.saturating_add(1);
        let tick = self.tick;

        if let Some(reason) = self.unmet_precondition().await {
            if self.last_skip.as_ref() == Some(&reason) {
                debug!(tick, %reason, "Tick skipped");
            } else {
                warn!(tick, %reason, "Tick skipped");
            }
            self.last_skip = Some(reason.clone());
            return TickOutcome::Skipped { tick, reason };
        }
        if self.last_skip.take().is_some() {
            info!(tick, "Tick preconditions restored");
        }

        let started_at = Utc::now();
        let clock = Instant::now();

        let entities = match self.reader.read_snapshot().await {
            Ok(entities) => entities,
            Err(e) => {
                warn!(tick, error = %e, "Snapshot read failed, tick aborted");
                return TickOutcome::Aborted {
                    tick,
                    error: TickError::Snapshot(e),
                };
            }
        };

        let existing = match self.markers.list_markers().await {
            Ok(existing) => existing,
            Err(e) => {
                warn!(tick, error = %e, "Marker listing failed, tick aborted");
                return TickOutcome::Aborted {
                    tick,
                    error: TickError::Listing(e),
                };
            }
        };

        let plan = plan_reconciliation(&self.settings.marker_prefix, &entities, existing);
        debug!(
            tick,
            creates = plan.creates.len(),
            updates = plan.updates.len(),
            deletes = plan.deletes.len(),
            unchanged = plan.unchanged,
            "Reconciliation planned"
        );

        let (created, create_failures) = self.apply_creates(plan.creates).await;
        let (updated, update_failures) = self.apply_updates(&plan.updates).await;
        let (deleted, delete_failures) = self.apply_deletes(&plan.deletes).await;

        let summary = TickSummary {
            tick,
            started_at,
            duration_ms: u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX),
            entities: plan.entities,
            created,
            updated,
            deleted,
            unchanged: plan.unchanged,
            failures: create_failures
                .saturating_add(update_failures)
                .saturating_add(delete_failures),
        };

        info!(
            tick,
            entities = summary.entities,
            created = summary.created,
            updated = summary.updated,
            deleted = summary.deleted,
            failures = summary.failures,
            duration_ms = summary.duration_ms,
            "Reconciliation tick complete"
        );

        TickOutcome::Completed(summary)
    }

    /// Delete the namespace, then close the store. Both steps always run;
    /// failures are logged.
    pub async fn teardown(self) {
        let namespace = self.markers.namespace().to_owned();
        match self.markers.delete_namespace().await {
            Ok(()) => info!(namespace, "Overlay namespace deleted"),
            Err(e) => warn!(namespace, error = %e, "Failed to delete overlay namespace"),
        }
        self.close().await;
    }

    /// Close the store without touching the overlay. Used when the
    /// rendering service never became ready.
    pub async fn close(self) {
        self.reader.close().await;
        info!(ticks = self.tick, "Record store closed");
    }

    async fn unmet_precondition(&self) -> Option<SkipReason> {
        if !self.reader.is_open() {
            return Some(SkipReason::StoreClosed);
        }
        if !self.markers.exists().await {
            return Some(SkipReason::NamespaceMissing {
                namespace: self.markers.namespace().to_owned(),
            });
        }
        None
    }

    async fn create_one(&self, entity: LiveEntity) -> Result<OverlayMarker, MarkerError> {
        let icon = self.icons.get_icon(&entity).await;
        self.markers
            .create_marker(
                entity.marker_id(&self.settings.marker_prefix),
                &entity.display_name,
                entity.position,
                icon,
            )
            .await
    }

    async fn apply_creates(&self, creates: Vec<LiveEntity>) -> (usize, usize) {
        let limit = self.settings.max_concurrent_creates.max(1);
        let results: Vec<Result<OverlayMarker, MarkerError>> =
            futures::stream::iter(creates.into_iter().map(|entity| self.create_one(entity)))
                .buffer_unordered(limit)
                .collect()
                .await;

        tally(results.iter().map(|result| match result {
            Ok(marker) => {
                debug!(marker_id = %marker.marker_id, icon = %marker.icon, "Marker created");
                true
            }
            Err(e) => {
                warn!(marker_id = ?e.marker_id(), error = %e, "Marker create failed");
                false
            }
        }))
    }

    async fn apply_updates(&self, updates: &[LiveEntity]) -> (usize, usize) {
        let mut outcomes = Vec::with_capacity(updates.len());
        for entity in updates {
            let marker_id = entity.marker_id(&self.settings.marker_prefix);
            let result = self
                .markers
                .update_marker(&marker_id, &entity.display_name, &entity.position)
                .await;
            if let Err(e) = &result {
                warn!(%marker_id, error = %e, "Marker update failed");
            }
            outcomes.push(result.is_ok());
        }
        tally(outcomes)
    }

    async fn apply_deletes(&self, deletes: &[MarkerId]) -> (usize, usize) {
        let mut outcomes = Vec::with_capacity(deletes.len());
        for marker_id in deletes {
            let result = self.markers.delete_marker(marker_id).await;
            if let Err(e) = &result {
                warn!(%marker_id, error = %e, "Marker delete failed");
            }
            outcomes.push(result.is_ok());
        }
        tally(outcomes)
    }
}

/// Count `(successes, failures)`.
fn tally(outcomes: impl IntoIterator<Item = bool>) -> (usize, usize) {
    outcomes
        .into_iter()
        .fold((0_usize, 0_usize), |(ok, failed), success| {
            if success {
                (ok.saturating_add(1), failed)
            } else {
                (ok, failed.saturating_add(1))
            }
        })
}
