//! Live tick stream over `WebSocket`.
//!
//! `GET /ws/ticks` pushes one JSON [`TickBroadcast`] text frame per tick,
//! aborted and skipped ticks included. The subscription is taken before the
//! upgrade completes, so a client sees every tick from its handshake on. A
//! client that falls behind the broadcast buffer skips ahead to the newest
//! tick. Frames sent by the client are ignored; a close frame ends the
//! stream.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use crate::state::{AppState, TickBroadcast};

/// Upgrade to a `WebSocket` and stream tick outcomes.
pub async fn ws_ticks(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let rx = state.subscribe();
    ws.on_upgrade(move |socket| stream_ticks(socket, rx))
}

async fn stream_ticks(mut socket: WebSocket, mut rx: broadcast::Receiver<TickBroadcast>) {
    debug!("Tick stream opened");
    loop {
        let frame = tokio::select! {
            tick = rx.recv() => match tick {
                Ok(tick) => tick_frame(&tick),
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Tick stream lagged");
                    None
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => None,
            },
        };

        if let Some(frame) = frame
            && socket.send(frame).await.is_err()
        {
            break;
        }
    }
    debug!("Tick stream closed");
}

/// Encode one tick as a text frame.
fn tick_frame(tick: &TickBroadcast) -> Option<Message> {
    match serde_json::to_string(tick) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            warn!(tick = tick.tick, error = %e, "Failed to encode tick");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use markersync_core::engine::{SkipReason, TickOutcome};

    use super::*;

    #[test]
    fn tick_frame_is_json_text() {
        let tick = TickBroadcast::from(&TickOutcome::Skipped {
            tick: 7,
            reason: SkipReason::StoreClosed,
        });

        let Some(Message::Text(text)) = tick_frame(&tick) else {
            panic!("expected a text frame");
        };
        let decoded: TickBroadcast = serde_json::from_str(text.as_str()).unwrap();
        assert_eq!(decoded, tick);
        assert!(text.as_str().contains(r#""status":"skipped""#));
    }
}
