//! Integration tests for the Observer API endpoints.
//!
//! Tests drive the Axum `Router` directly via `tower::ServiceExt` without
//! starting a TCP server, except where the server lifecycle itself is
//! under test.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use markersync_core::control::SchedulerControl;
use markersync_core::engine::{SkipReason, TickOutcome};
use markersync_observer::router::build_router;
use markersync_observer::server::ServerConfig;
use markersync_observer::startup::spawn_observer;
use markersync_observer::state::{AppState, TickBroadcast, TickStatus};
use markersync_types::{IconHandle, MarkerId, OverlayMarker, Position, TickSummary};
use serde_json::Value;
use tower::ServiceExt;

fn marker(identity: &str, world: &str) -> OverlayMarker {
    OverlayMarker {
        marker_id: MarkerId::for_identity("plr_", identity),
        label: identity.to_owned(),
        position: Position::new(world, 1.0, 64.0, -3.0),
        icon: IconHandle::default_icon(),
    }
}

fn completed(tick: u64) -> TickBroadcast {
    TickBroadcast::from(&TickOutcome::Completed(TickSummary {
        tick,
        started_at: Utc::now(),
        duration_ms: 4,
        entities: 2,
        created: 2,
        updated: 0,
        deleted: 0,
        unchanged: 0,
        failures: 0,
    }))
}

fn populated_state(control: Option<Arc<SchedulerControl>>) -> Arc<AppState> {
    let state = control.map_or_else(
        || AppState::new("live_players"),
        |control| AppState::with_control("live_players", control),
    );
    let recorded = state.try_record(
        &completed(1),
        Some(vec![marker("alice", "world"), marker("bob", "nether")]),
    );
    assert!(recorded);
    Arc::new(state)
}

async fn get(state: Arc<AppState>, uri: &str) -> (StatusCode, Value) {
    send(state, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post(state: Arc<AppState>, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = match body {
        Some(body) => Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => Request::post(uri).body(Body::empty()).unwrap(),
    };
    send(state, request).await
}

async fn send(state: Arc<AppState>, request: Request<Body>) -> (StatusCode, Value) {
    let response = build_router(state).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

// ---------------------------------------------------------------------------
// Read endpoints
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_namespace_and_last_tick() {
    let (status, json) = get(populated_state(None), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["namespace"], "live_players");
    assert_eq!(json["markers"], 2);
    assert_eq!(json["last_tick"], 1);
}

#[tokio::test]
async fn markers_are_listed_and_filtered_by_world() {
    let state = populated_state(None);

    let (status, json) = get(Arc::clone(&state), "/api/markers").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 2);
    assert_eq!(json["markers"][0]["marker_id"], "plr_alice");

    let (status, json) = get(Arc::clone(&state), "/api/markers?world=nether").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 1);
    assert_eq!(json["markers"][0]["label"], "bob");

    let (status, _) = get(state, "/api/markers?world=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ticks_are_newest_first_and_limited() {
    let state = populated_state(None);
    for tick in 2..=5 {
        assert!(state.try_record(&completed(tick), None));
    }
    let skipped = TickBroadcast::from(&TickOutcome::Skipped {
        tick: 6,
        reason: SkipReason::StoreClosed,
    });
    assert!(state.try_record(&skipped, None));

    let (status, json) = get(Arc::clone(&state), "/api/ticks?limit=3").await;
    assert_eq!(status, StatusCode::OK);
    let ticks = json.as_array().unwrap();
    assert_eq!(ticks.len(), 3);
    assert_eq!(ticks[0]["tick"], 6);
    assert_eq!(ticks[0]["status"], "skipped");
    assert_eq!(ticks[2]["tick"], 4);

    let (status, _) = get(Arc::clone(&state), "/api/ticks?limit=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = get(state, "/api/ticks/latest").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["tick"], 6);
    assert_eq!(json["detail"], "record store closed");
}

#[tokio::test]
async fn latest_tick_is_not_found_before_first_tick() {
    let state = Arc::new(AppState::new("live_players"));
    let (status, json) = get(state, "/api/ticks/latest").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["status"], 404);
}

// ---------------------------------------------------------------------------
// Operator endpoints
// ---------------------------------------------------------------------------

#[tokio::test]
async fn operator_requires_control() {
    let state = populated_state(None);
    let (status, _) = post(Arc::clone(&state), "/api/operator/pause", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let (status, _) = get(state, "/api/operator/status").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn pause_resume_and_status() {
    let control = Arc::new(SchedulerControl::new(Duration::from_secs(1)));
    let state = populated_state(Some(Arc::clone(&control)));

    let (status, json) = post(Arc::clone(&state), "/api/operator/pause", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ok"], true);
    assert!(control.is_paused());

    let (_, json) = get(Arc::clone(&state), "/api/operator/status").await;
    assert_eq!(json["paused"], true);
    assert_eq!(json["tick_interval_ms"], 1000);

    let (status, _) = post(state, "/api/operator/resume", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!control.is_paused());
}

#[tokio::test]
async fn speed_change_validates_minimum() {
    let control = Arc::new(SchedulerControl::new(Duration::from_secs(1)));
    let state = populated_state(Some(Arc::clone(&control)));

    let body = serde_json::json!({ "tick_interval_ms": 250 });
    let (status, json) = post(Arc::clone(&state), "/api/operator/speed", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["previous_interval_ms"], 1000);
    assert_eq!(control.tick_interval_ms(), 250);

    let body = serde_json::json!({ "tick_interval_ms": 10 });
    let (status, _) = post(state, "/api/operator/speed", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(control.tick_interval_ms(), 250);
}

#[tokio::test]
async fn stop_shuts_down_spawned_server() {
    let control = Arc::new(SchedulerControl::new(Duration::from_secs(1)));
    let state = populated_state(Some(Arc::clone(&control)));
    let config = ServerConfig {
        host: String::from("127.0.0.1"),
        port: 0,
    };
    let handle = spawn_observer(&config, Arc::clone(&state)).await.unwrap();
    assert_ne!(handle.local_addr.port(), 0);

    let (status, _) = post(state, "/api/operator/stop", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(control.is_stop_requested());

    tokio::time::timeout(Duration::from_secs(5), handle.task)
        .await
        .unwrap()
        .unwrap();
}

// ---------------------------------------------------------------------------
// Broadcast
// ---------------------------------------------------------------------------

#[tokio::test]
async fn broadcast_reaches_subscribers() {
    let state = AppState::new("live_players");
    assert_eq!(state.broadcast(&completed(1)), 0);

    let mut rx = state.subscribe();
    assert_eq!(state.broadcast(&completed(2)), 1);
    let received = rx.recv().await.unwrap();
    assert_eq!(received.tick, 2);
    assert_eq!(received.status, TickStatus::Completed);
}
