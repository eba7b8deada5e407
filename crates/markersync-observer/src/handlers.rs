//! REST API endpoint handlers for the Observer server.
//!
//! All handlers read from the in-memory [`OverlaySnapshot`] via the shared
//! [`AppState`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness and last tick |
//! | `GET` | `/api/markers` | Markers after the latest tick |
//! | `GET` | `/api/ticks` | Recent tick history (newest first) |
//! | `GET` | `/api/ticks/latest` | The latest tick |
//!
//! [`OverlaySnapshot`]: crate::state::OverlaySnapshot

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::response::IntoResponse;

use crate::error::ObserverError;
use crate::state::{AppState, MAX_TICK_HISTORY, TickBroadcast};

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

/// Query parameters for the `GET /api/markers` endpoint.
#[derive(Debug, serde::Deserialize)]
pub struct MarkersQuery {
    /// Only markers in this world.
    pub world: Option<String>,
}

/// Query parameters for the `GET /api/ticks` endpoint.
#[derive(Debug, serde::Deserialize)]
pub struct TicksQuery {
    /// Maximum number of ticks to return (default and cap 100).
    pub limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Report liveness, the namespace, and the latest tick number.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot.read().await;
    Json(serde_json::json!({
        "status": "ok",
        "namespace": snapshot.namespace,
        "markers": snapshot.markers.len(),
        "last_tick": snapshot.latest_tick().map(|t| t.tick),
    }))
}

// ---------------------------------------------------------------------------
// GET /api/markers
// ---------------------------------------------------------------------------

/// List the markers as of the latest tick, optionally filtered by world.
pub async fn list_markers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MarkersQuery>,
) -> Result<impl IntoResponse, ObserverError> {
    if query.world.as_deref().is_some_and(str::is_empty) {
        return Err(ObserverError::InvalidQuery(
            "world must not be empty".to_owned(),
        ));
    }

    let snapshot = state.snapshot.read().await;
    let markers: Vec<_> = snapshot
        .markers
        .iter()
        .filter(|m| {
            query
                .world
                .as_deref()
                .is_none_or(|world| m.position.world == world)
        })
        .cloned()
        .collect();

    Ok(Json(serde_json::json!({
        "namespace": snapshot.namespace,
        "count": markers.len(),
        "markers": markers,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/ticks
// ---------------------------------------------------------------------------

/// Recent ticks, newest first.
pub async fn list_ticks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TicksQuery>,
) -> Result<impl IntoResponse, ObserverError> {
    let limit = query.limit.unwrap_or(MAX_TICK_HISTORY);
    if limit == 0 {
        return Err(ObserverError::InvalidQuery(
            "limit must be at least 1".to_owned(),
        ));
    }

    let snapshot = state.snapshot.read().await;
    let ticks: Vec<TickBroadcast> = snapshot.ticks.iter().rev().take(limit).cloned().collect();
    Ok(Json(ticks))
}

// ---------------------------------------------------------------------------
// GET /api/ticks/latest
// ---------------------------------------------------------------------------

/// The most recent tick.
pub async fn latest_tick(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let snapshot = state.snapshot.read().await;
    snapshot
        .latest_tick()
        .cloned()
        .map(Json)
        .ok_or_else(|| ObserverError::NotFound("no tick has run yet".to_owned()))
}
