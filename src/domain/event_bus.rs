//! Broadcast channel for domain events.
//!
//! [`EventBus`] wraps a [`tokio::sync::broadcast`] channel. Services
//! publish a [`DomainEvent`] after each committed mutation, and every
//! WebSocket connection holds its own receiver, filtering by the channels
//! it subscribed to.

use tokio::sync::broadcast;

use super::DomainEvent;

/// Broadcast bus for [`DomainEvent`]s.
///
/// Backed by a `tokio::broadcast` channel with a configurable capacity
/// (default 10 000). When the ring buffer is full, the oldest events are
/// dropped for lagging receivers. A receiver only sees events published
/// after it subscribed, so reconnecting clients never get a replay.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    /// Creates a new `EventBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of receivers that received the event.
    /// If there are no active receivers, the event is silently dropped.
    pub fn publish(&self, event: DomainEvent) -> usize {
        tracing::trace!(event_type = event.event_type_str(), "publishing event");
        self.sender.send(event).unwrap_or(0)
    }

    /// Publishes each event in order.
    pub fn publish_all(&self, events: impl IntoIterator<Item = DomainEvent>) {
        for event in events {
            let _ = self.publish(event);
        }
    }

    /// Creates a new receiver that will receive all future events.
    ///
    /// Each WebSocket connection should call this once on connect.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{DealId, LightningDeal};
    use chrono::{Duration, Utc};

    fn make_event(id: i64) -> DomainEvent {
        let now = Utc::now();
        DomainEvent::DealUpdated(LightningDeal {
            id: DealId(id),
            title: "Taco Tuesday".to_string(),
            original_price_cents: 900,
            deal_price_cents: 450,
            total_available: 10,
            claimed: 0,
            start_time: now,
            end_time: now + Duration::hours(1),
        })
    }

    #[test]
    fn publish_without_receivers_returns_zero() {
        let bus = EventBus::new(100);
        let count = bus.publish(make_event(1));
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn subscriber_receives_event() {
        let bus = EventBus::new(100);
        let mut rx = bus.subscribe();

        bus.publish(make_event(7));

        let Ok(event) = rx.recv().await else {
            panic!("expected to receive event");
        };
        assert_eq!(event.event_type_str(), "deal_updated");
    }

    #[tokio::test]
    async fn late_subscriber_gets_no_replay() {
        let bus = EventBus::new(100);
        let _keepalive = bus.subscribe();
        bus.publish(make_event(1));

        let mut late = bus.subscribe();
        bus.publish(make_event(2));

        let Ok(DomainEvent::DealUpdated(deal)) = late.recv().await else {
            panic!("expected deal event");
        };
        assert_eq!(deal.id, DealId(2));
    }

    #[tokio::test]
    async fn publish_all_preserves_order() {
        let bus = EventBus::new(100);
        let mut rx = bus.subscribe();
        bus.publish_all([make_event(1), make_event(2)]);

        for expected in [1, 2] {
            let Ok(DomainEvent::DealUpdated(deal)) = rx.recv().await else {
                panic!("expected deal event");
            };
            assert_eq!(deal.id, DealId(expected));
        }
    }

    #[test]
    fn receiver_count_tracks_subscribers() {
        let bus = EventBus::new(100);
        assert_eq!(bus.receiver_count(), 0);

        let rx1 = bus.subscribe();
        assert_eq!(bus.receiver_count(), 1);

        let _rx2 = bus.subscribe();
        assert_eq!(bus.receiver_count(), 2);

        drop(rx1);
        assert_eq!(bus.receiver_count(), 1);
    }
}
