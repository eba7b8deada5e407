//! Start-up and shutdown around the scheduler.
//!
//! [`Lifecycle::run`] owns the engine for the life of the process:
//!
//! 1. Wait for the rendering service's ready signal (or an early stop).
//! 2. Ensure the overlay namespace exists, once, behind a [`RunOnce`].
//! 3. Run the scheduler until a stop is requested.
//! 4. Tear down: delete the namespace, then close the store.
//!
//! Step 4 runs on every return path, including a failed bootstrap. Stop the
//! lifecycle with [`SchedulerControl::request_stop`]; dropping the future
//! skips teardown.

use std::sync::Arc;

use markersync_overlay::{MarkerError, MarkerSet, OverlayService, ReadySignal};
use markersync_store::SnapshotReader;
use tracing::{debug, info, warn};

use crate::control::{SchedulerControl, StopReason};
use crate::engine::ReconciliationEngine;
use crate::once::{OnceOutcome, RunOnce};
use crate::scheduler::{SchedulerResult, TickCallback, run_scheduler};

/// Errors that end a lifecycle run early.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// The overlay namespace could not be created.
    #[error("namespace bootstrap failed: {0}")]
    Bootstrap(#[source] MarkerError),
}

/// Start-up and shutdown sequencing for one engine.
#[derive(Debug)]
pub struct Lifecycle {
    ready: ReadySignal,
    control: Arc<SchedulerControl>,
    bootstrap: RunOnce,
}

impl Lifecycle {
    /// Create a lifecycle gated on `ready` and controlled by `control`.
    pub const fn new(ready: ReadySignal, control: Arc<SchedulerControl>) -> Self {
        Self {
            ready,
            control,
            bootstrap: RunOnce::new(),
        }
    }

    /// The shared scheduler control.
    pub const fn control(&self) -> &Arc<SchedulerControl> {
        &self.control
    }

    /// Whether the namespace bootstrap has completed.
    pub fn is_bootstrapped(&self) -> bool {
        self.bootstrap.is_done()
    }

    /// Run the engine to completion and tear it down.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Bootstrap`] if the namespace cannot be
    /// created. Teardown has still run when this returns.
    pub async fn run<R, O>(
        &self,
        mut engine: ReconciliationEngine<R, O>,
        callback: &mut dyn TickCallback,
    ) -> Result<SchedulerResult, LifecycleError>
    where
        R: SnapshotReader,
        O: OverlayService,
    {
        if !self.await_ready().await {
            info!("Stop requested before the rendering service was ready");
            engine.close().await;
            self.control.set_stop_reason(StopReason::Requested).await;
            return Ok(SchedulerResult {
                stop_reason: StopReason::Requested,
                last_outcome: None,
                total_ticks: 0,
            });
        }

        let result = match self.bootstrap(engine.markers()).await {
            Ok(()) => Ok(run_scheduler(&mut engine, &self.control, callback).await),
            Err(e) => {
                warn!(error = %e, "Namespace bootstrap failed");
                Err(e)
            }
        };

        engine.teardown().await;
        result
    }

    /// Ensure the namespace exists. Only the first successful call does any
    /// work; a failed call may be retried.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Bootstrap`] if the service refuses.
    pub async fn bootstrap<O: OverlayService>(
        &self,
        markers: &MarkerSet<O>,
    ) -> Result<(), LifecycleError> {
        let outcome = self
            .bootstrap
            .run(|| markers.ensure())
            .await
            .map_err(LifecycleError::Bootstrap)?;

        let namespace = markers.namespace();
        match outcome {
            OnceOutcome::Ran(true) => info!(namespace, "Overlay namespace created"),
            OnceOutcome::Ran(false) => info!(namespace, "Overlay namespace already present"),
            OnceOutcome::InProgress | OnceOutcome::AlreadyDone => {
                debug!(namespace, "Namespace bootstrap already handled");
            }
        }
        Ok(())
    }

    /// `true` once ready, `false` if a stop came first.
    async fn await_ready(&self) -> bool {
        if !self.ready.is_ready() {
            info!("Waiting for the rendering service to become ready");
        }
        tokio::select! {
            () = self.ready.wait_ready() => true,
            () = self.control.stopped() => self.ready.is_ready(),
        }
    }
}
