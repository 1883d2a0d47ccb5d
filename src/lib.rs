//! # diner-gateway
//!
//! REST API and WebSocket gateway for restaurant waitlists, loyalty
//! rewards and QR code redemptions.
//!
//! Customers join a restaurant's virtual queue and follow their position
//! and estimated wait live. Staff call and seat parties, award points and
//! scan signed single-use codes that apply points rewards, lightning deals
//! or discounts exactly once. Every committed change is fanned out to
//! named realtime channels.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket, client::RealtimeClient)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── QueueService, RedemptionService (service/)
//!     ├── EventBus (domain/)
//!     │
//!     ├── QueueRegistry, RewardsLedger, UserDirectory (domain/)
//!     │
//!     └── PostgreSQL event log (persistence/, optional)
//! ```

pub mod api;
pub mod app_state;
pub mod client;
pub mod config;
pub mod crypto;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod ws;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

/// Builds the full HTTP application: REST routes, `/ws` and the tracing
/// and CORS layers.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws::handler::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
