//! Operator REST API handlers for runtime scheduler control.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/operator/pause` | Pause ticking |
//! | `POST` | `/api/operator/resume` | Resume ticking |
//! | `POST` | `/api/operator/speed` | Set tick interval (ms) |
//! | `GET` | `/api/operator/status` | Current scheduler status |
//! | `POST` | `/api/operator/stop` | Stop, tear down the namespace, exit |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use markersync_core::control::SchedulerControl;

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /api/operator/speed`.
#[derive(Debug, serde::Deserialize)]
pub struct SetSpeedRequest {
    /// New tick interval in milliseconds (minimum 100).
    pub tick_interval_ms: u64,
}

/// Generic success response.
#[derive(Debug, serde::Serialize)]
struct OperatorResponse {
    /// Whether the operation succeeded.
    ok: bool,
    /// Human-readable message.
    message: String,
}

impl OperatorResponse {
    fn ok(message: &str) -> Json<Self> {
        Json(Self {
            ok: true,
            message: message.to_owned(),
        })
    }
}

fn control(state: &AppState) -> Result<&Arc<SchedulerControl>, ObserverError> {
    state
        .control
        .as_ref()
        .ok_or(ObserverError::ControlUnavailable)
}

// ---------------------------------------------------------------------------
// POST /api/operator/pause
// ---------------------------------------------------------------------------

/// Pause ticking. The tick in flight, if any, finishes first.
pub async fn pause(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    control(&state)?.pause();
    Ok(OperatorResponse::ok("Sync paused"))
}

// ---------------------------------------------------------------------------
// POST /api/operator/resume
// ---------------------------------------------------------------------------

/// Resume ticking after a pause. The next tick runs at once.
pub async fn resume(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    control(&state)?.resume();
    Ok(OperatorResponse::ok("Sync resumed"))
}

// ---------------------------------------------------------------------------
// POST /api/operator/speed
// ---------------------------------------------------------------------------

/// Change the tick interval at runtime. Minimum 100ms.
pub async fn set_speed(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetSpeedRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let Some(prev) = control(&state)?.set_tick_interval_ms(body.tick_interval_ms) else {
        return Err(ObserverError::InvalidQuery(
            "tick_interval_ms must be at least 100".to_owned(),
        ));
    };

    Ok(Json(serde_json::json!({
        "ok": true,
        "message": format!(
            "Tick interval changed from {prev}ms to {}ms",
            body.tick_interval_ms
        ),
        "previous_interval_ms": prev,
        "new_interval_ms": body.tick_interval_ms,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/operator/status
// ---------------------------------------------------------------------------

/// Current scheduler status.
pub async fn status(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let status = control(&state)?.status().await;
    Ok(Json(status))
}

// ---------------------------------------------------------------------------
// POST /api/operator/stop
// ---------------------------------------------------------------------------

/// Request a clean stop.
///
/// The scheduler finishes its current tick, the namespace is deleted, and
/// the store connection is closed.
pub async fn stop(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    control(&state)?.request_stop();
    Ok(OperatorResponse::ok(
        "Stop requested -- sync will end after the current tick",
    ))
}
