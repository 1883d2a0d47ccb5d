//! Per-connection subscription manager.
//!
//! Tracks the authenticated user and the set of channels a WebSocket
//! client is subscribed to, and filters outgoing events. The set is
//! private to its connection and needs no locking.

use std::collections::BTreeSet;

use crate::domain::{Channel, DomainEvent, Role, UserId};
use crate::error::GatewayError;

/// Authenticated identity of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    /// User id.
    pub user_id: UserId,
    /// User role.
    pub role: Role,
}

/// Manages the channel subscriptions for a single WebSocket connection.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    principal: Option<Principal>,
    channels: BTreeSet<Channel>,
}

impl SubscriptionManager {
    /// Creates a new unauthenticated manager with no subscriptions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the connection to a user. Switching users drops the
    /// previous user's subscriptions.
    pub fn authenticate(&mut self, principal: Principal) {
        if self
            .principal
            .is_some_and(|p| p.user_id != principal.user_id)
        {
            self.channels.clear();
        }
        self.principal = Some(principal);
    }

    /// Returns the authenticated user, if any.
    #[must_use]
    pub const fn principal(&self) -> Option<Principal> {
        self.principal
    }

    /// Checks that the connection may listen on `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Unauthorized`] before authentication, or
    /// when a customer asks for another user's channel.
    pub fn authorize(&self, channel: Channel) -> Result<(), GatewayError> {
        let principal = self.principal.ok_or(GatewayError::Unauthorized)?;
        match channel.owner() {
            Some(owner) if owner != principal.user_id && !principal.role.is_staff() => {
                Err(GatewayError::Unauthorized)
            }
            _ => Ok(()),
        }
    }

    /// Adds a channel after authorizing it.
    ///
    /// # Errors
    ///
    /// See [`Self::authorize`].
    pub fn subscribe(&mut self, channel: Channel) -> Result<(), GatewayError> {
        self.authorize(channel)?;
        self.channels.insert(channel);
        Ok(())
    }

    /// Removes a channel. Returns `true` if it was subscribed.
    pub fn unsubscribe(&mut self, channel: Channel) -> bool {
        self.channels.remove(&channel)
    }

    /// Channels of `event` this connection listens on.
    #[must_use]
    pub fn matching(&self, event: &DomainEvent) -> Vec<Channel> {
        event
            .channels()
            .into_iter()
            .filter(|c| self.channels.contains(c))
            .collect()
    }

    /// Returns the number of subscribed channels.
    #[must_use]
    pub fn count(&self) -> usize {
        self.channels.len()
    }
}
