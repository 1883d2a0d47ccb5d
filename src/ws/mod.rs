//! WebSocket layer: connection handling, message routing, subscriptions.
//!
//! The endpoint at `/ws` is the server side of the realtime channel
//! broker. A client authenticates with its session token, subscribes to
//! named channels and then receives every domain event published on them
//! until it disconnects. Missed events are never replayed.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;

pub use messages::{ClientMessage, ServerMessage, WsEnvelope};
