//! Reconnect policy and client settings.

use std::time::Duration;

use crate::domain::{Channel, UserId};

/// Bounded exponential backoff.
///
/// Attempt `n` (1-based) waits `base_delay * 2^(n-1)`, capped at
/// `max_delay`. After `max_attempts` consecutive failures the client
/// gives up and reports `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Consecutive failed attempts before giving up.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound on any delay.
    pub max_delay: Duration,
}

impl ReconnectPolicy {
    /// Delay before retry number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1_u32 << shift)
            .min(self.max_delay)
    }

    /// Returns `true` once `attempt` exceeds the budget.
    #[must_use]
    pub const fn exhausted(&self, attempt: u32) -> bool {
        attempt > self.max_attempts
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Everything a [`super::RealtimeClient`] needs to connect.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket URL, e.g. `ws://localhost:3000/ws`.
    pub url: String,
    /// User to authenticate as.
    pub user_id: UserId,
    /// Session token issued at registration.
    pub token: String,
    /// Channels held from the first connect on.
    pub channels: Vec<Channel>,
    /// Retry policy for unexpected disconnects.
    pub reconnect: ReconnectPolicy,
    /// Interval between keepalive pings.
    pub ping_interval: Duration,
    /// How long to wait for a `pong` before declaring the connection lost.
    pub pong_timeout: Duration,
    /// Limit on opening the socket and completing `auth`.
    pub connect_timeout: Duration,
}

impl ClientConfig {
    /// Settings with default timings.
    #[must_use]
    pub fn new(url: impl Into<String>, user_id: UserId, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user_id,
            token: token.into(),
            channels: Vec::new(),
            reconnect: ReconnectPolicy::default(),
            ping_interval: Duration::from_secs(30),
            pong_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Adds channels to hold from the first connect on.
    #[must_use]
    pub fn with_channels(mut self, channels: impl IntoIterator<Item = Channel>) -> Self {
        self.channels.extend(channels);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_until_capped() {
        let policy = ReconnectPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(3),
        };
        let delays: Vec<u128> = (1..=5).map(|n| policy.delay_for(n).as_millis()).collect();
        assert_eq!(delays, vec![500, 1_000, 2_000, 3_000, 3_000]);
    }

    #[test]
    fn huge_attempt_counts_do_not_overflow() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(u32::MAX), policy.max_delay);
    }

    #[test]
    fn budget_is_inclusive() {
        let policy = ReconnectPolicy {
            max_attempts: 3,
            ..ReconnectPolicy::default()
        };
        assert!(!policy.exhausted(3));
        assert!(policy.exhausted(4));
    }
}
