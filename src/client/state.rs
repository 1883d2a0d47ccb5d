//! Connection lifecycle of the realtime client.

use std::fmt;

/// Observable state of a [`super::RealtimeClient`].
///
/// ```text
/// Disconnected ─▶ Connecting ─▶ Connected ─┬─▶ Disconnected   (manual)
///                    │              ▲      └─▶ Reconnecting
///                    ▼              │               │
///               Reconnecting ───────┘               ▼
///                    │                           Failed    (budget spent)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected and not trying to.
    Disconnected,
    /// First connection attempt in progress.
    Connecting,
    /// Authenticated with every held channel re-subscribed.
    Connected,
    /// Waiting for or performing retry number `attempt`.
    Reconnecting {
        /// 1-based retry counter.
        attempt: u32,
    },
    /// Retry budget exhausted. Persistent until a new client is created.
    Failed,
}

impl ConnectionState {
    /// Returns `true` for the states the client never leaves on its own.
    #[must_use]
    pub const fn is_final(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Failed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connecting => f.write_str("connecting"),
            Self::Connected => f.write_str("connected"),
            Self::Reconnecting { attempt } => write!(f, "reconnecting ({attempt})"),
            Self::Failed => f.write_str("failed"),
        }
    }
}
