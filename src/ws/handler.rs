//! Axum WebSocket upgrade handler.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::IntoResponse;

use super::connection::{ConnectionContext, run_connection};
use crate::app_state::AppState;

/// `GET /ws` — Upgrade HTTP connection to WebSocket.
///
/// The receiver is taken before the upgrade completes, so the connection
/// sees every event published from this point on and nothing earlier.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let event_rx = state.event_bus.subscribe();
    let ctx = ConnectionContext {
        users: Arc::clone(&state.users),
        signer: Arc::clone(&state.signer),
        idle_timeout: state.ws_idle_timeout,
    };

    ws.on_upgrade(move |socket| run_connection(socket, event_rx, ctx))
}
