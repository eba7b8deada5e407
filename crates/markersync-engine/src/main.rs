//! Sync binary for the live map markers.
//!
//! Wires the record store, the rendering service, the icon provisioner and
//! the reconciliation engine together, then runs the tick loop until a
//! stop is requested (Ctrl-C or `POST /api/operator/stop`).
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `markersync.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Open the record store and build the snapshot reader
//! 4. Create the rendering service and its marker namespace adapter
//! 5. Build the icon provisioner and the reconciliation engine
//! 6. Start the Observer API server
//! 7. Run the lifecycle: await readiness, bootstrap, tick, tear down
//! 8. Log the result

mod error;
mod observer_callback;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use markersync_core::config::{LoggingConfig, SyncConfig};
use markersync_core::control::SchedulerControl;
use markersync_core::engine::ReconciliationEngine;
use markersync_core::lifecycle::Lifecycle;
use markersync_core::scheduler;
use markersync_icons::IconProvisioner;
use markersync_observer::server::ServerConfig;
use markersync_observer::startup::spawn_observer;
use markersync_observer::state::AppState;
use markersync_overlay::{InMemoryOverlay, MarkerSet, ReadySignal};
use markersync_store::{PlayerSnapshotReader, StorePool};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::observer_callback::ObserverCallback;

/// Configuration file, relative to the working directory.
const CONFIG_PATH: &str = "markersync.yaml";

/// How long open observer connections get to finish after a stop.
const OBSERVER_DRAIN: Duration = Duration::from_secs(5);

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any initialization step or the namespace bootstrap
/// fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    run().await?;
    Ok(())
}

async fn run() -> Result<(), EngineError> {
    // 1. Load configuration. Logging is not up yet, so this runs first.
    let config = SyncConfig::load(Path::new(CONFIG_PATH))?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!("markersync-engine starting");
    info!(
        tick_interval_ms = config.sync.tick_interval_ms,
        namespace = config.sync.namespace_id,
        marker_prefix = config.sync.marker_prefix,
        icons_enabled = config.icons.enabled,
        "Configuration loaded"
    );

    // 3. Open the record store.
    let store = StorePool::connect(&config.store.store_config()).await?;
    let reader = PlayerSnapshotReader::new(store, &config.store.table)?;
    info!(table = config.store.table, "Record store opened");

    // 4. Rendering service. The in-process overlay is ready at once.
    let overlay = Arc::new(InMemoryOverlay::new());
    let ready = ReadySignal::ready();
    let spec = config.sync.namespace_spec();
    let markers = MarkerSet::new(Arc::clone(&overlay), spec.clone());

    // 5. Icons and engine.
    let icons = IconProvisioner::new(Arc::clone(&overlay), &config.icons.provisioner_config())?;
    let engine = ReconciliationEngine::new(reader, markers, icons, config.sync.engine_settings());

    // 6. Operator control and Observer API.
    let control = Arc::new(SchedulerControl::new(config.sync.tick_interval()));
    let app_state = Arc::new(AppState::with_control(&spec.id, Arc::clone(&control)));

    let observer = if config.observer.enabled {
        let addr = config.observer.bind_addr()?;
        let server_config = ServerConfig {
            host: addr.ip().to_string(),
            port: addr.port(),
        };
        let handle = spawn_observer(&server_config, Arc::clone(&app_state)).await?;
        info!(addr = %handle.local_addr, "Observer API server started");
        Some(handle)
    } else {
        info!("Observer API disabled");
        None
    };

    spawn_ctrl_c(Arc::clone(&control));

    // 7. Run until stopped.
    let mut callback = ObserverCallback::new(app_state, overlay, spec.id);
    let lifecycle = Lifecycle::new(ready, Arc::clone(&control));
    let result = lifecycle.run(engine, &mut callback).await;

    // A bootstrap failure never sets the stop flag; release the observer.
    control.request_stop();
    if let Some(handle) = observer {
        match tokio::time::timeout(OBSERVER_DRAIN, handle.task).await {
            Ok(Ok(())) => info!("Observer API server stopped"),
            Ok(Err(e)) => warn!(error = %e, "Observer task ended abnormally"),
            Err(_) => warn!("Observer API server did not drain in time"),
        }
    }

    // 8. Log the result.
    let result = result?;
    scheduler::log_scheduler_end(&result);
    info!(
        stop_reason = ?result.stop_reason,
        total_ticks = result.total_ticks,
        "markersync-engine shutdown complete"
    );

    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over `logging.level`.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

/// Request a clean stop on Ctrl-C.
fn spawn_ctrl_c(control: Arc<SchedulerControl>) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, stopping after the current tick");
                control.request_stop();
            }
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
        }
    });
}
