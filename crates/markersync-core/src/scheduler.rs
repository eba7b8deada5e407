//! Tick scheduler with operator controls.
//!
//! [`run_scheduler`] drives [`ReconciliationEngine::run_tick`] on a fixed
//! cadence with support for:
//!
//! - **No overlap**: one tick at a time; a tick that overruns its slot
//!   causes the missed slots to be skipped, not queued
//! - **Pause/resume**: the operator can halt and continue ticking
//! - **Variable tick interval**: adjustable at runtime, applied at once
//! - **Clean stop**: returns after the tick in flight finishes

use std::sync::Arc;

use markersync_overlay::OverlayService;
use markersync_store::SnapshotReader;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::control::{SchedulerControl, StopReason};
use crate::engine::{ReconciliationEngine, TickOutcome};

/// Result of a scheduler run.
#[derive(Debug)]
pub struct SchedulerResult {
    /// Why the scheduler stopped.
    pub stop_reason: StopReason,
    /// The last tick outcome, if any tick ran.
    pub last_outcome: Option<TickOutcome>,
    /// Total number of ticks run.
    pub total_ticks: u64,
}

/// Callback invoked after every tick, whatever its outcome.
///
/// Implementations can use this to update the observer snapshot,
/// broadcast tick summaries, etc.
pub trait TickCallback: Send {
    /// Called after a tick finishes.
    fn on_tick(&mut self, outcome: &TickOutcome);
}

/// A no-op tick callback for testing.
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _outcome: &TickOutcome) {}
}

fn new_interval(control: &SchedulerControl) -> Interval {
    let period = control.tick_interval();
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

/// Run ticks until a stop is requested.
///
/// The first tick runs immediately; later ticks start one interval after
/// the previous start, or as soon as the previous tick ends if it overran.
pub async fn run_scheduler<R, O>(
    engine: &mut ReconciliationEngine<R, O>,
    control: &Arc<SchedulerControl>,
    callback: &mut dyn TickCallback,
) -> SchedulerResult
where
    R: SnapshotReader,
    O: OverlayService,
{
    let mut last_outcome: Option<TickOutcome> = None;
    let mut total_ticks: u64 = 0;
    let mut ticker = new_interval(control);
    let mut changes = control.subscribe();

    info!(
        tick_interval_ms = control.tick_interval_ms(),
        namespace = engine.markers().namespace(),
        "Scheduler starting"
    );

    let stop_reason = loop {
        // --- Check stop request ---
        if control.is_stop_requested() {
            info!("Scheduler stop requested");
            break StopReason::Requested;
        }

        // --- Check pause ---
        if control.is_paused() {
            info!("Scheduler paused, waiting for resume...");
            control.wait_if_paused().await;
            changes.mark_unchanged();
            if !control.is_stop_requested() {
                info!("Scheduler resumed");
                ticker.reset_immediately();
            }
            continue;
        }

        // --- Wait for the next slot or a control change ---
        tokio::select! {
            _ = ticker.tick() => {}
            changed = changes.changed() => {
                if changed.is_err() {
                    warn!("Scheduler control closed");
                    break StopReason::ControlClosed;
                }
                if control.tick_interval() != ticker.period() {
                    info!(
                        tick_interval_ms = control.tick_interval_ms(),
                        "Tick interval changed"
                    );
                    ticker = new_interval(control);
                    ticker.reset();
                }
                continue;
            }
        }

        // --- Execute tick ---
        let outcome = engine.run_tick().await;
        total_ticks = total_ticks.saturating_add(1);
        control.record_tick();

        // --- Notify callback ---
        callback.on_tick(&outcome);
        last_outcome = Some(outcome);
    };

    control.set_stop_reason(stop_reason.clone()).await;
    SchedulerResult {
        stop_reason,
        last_outcome,
        total_ticks,
    }
}

/// Log the end of a scheduler run.
pub fn log_scheduler_end(result: &SchedulerResult) {
    info!(
        reason = ?result.stop_reason,
        total_ticks = result.total_ticks,
        last_tick = result.last_outcome.as_ref().map(TickOutcome::tick),
        last_outcome = result.last_outcome.as_ref().map(TickOutcome::kind),
        "Scheduler stopped"
    );

    if let Some(summary) = result.last_outcome.as_ref().and_then(TickOutcome::summary) {
        info!(
            tick = summary.tick,
            entities = summary.entities,
            failures = summary.failures,
            "Final tick summary"
        );
    }
}
