//! Realtime channel client.
//!
//! A WebSocket client for the `/ws` endpoint that holds a set of channel
//! subscriptions across disconnects. It retries with bounded exponential
//! backoff, re-authenticates and re-subscribes after every reconnect, and
//! detects dead connections with an application-level ping.

pub mod error;
pub mod policy;
pub mod realtime;
pub mod state;

pub use error::ClientError;
pub use policy::{ClientConfig, ReconnectPolicy};
pub use realtime::RealtimeClient;
pub use state::ConnectionState;
