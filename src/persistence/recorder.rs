//! Background task that copies every published event into PostgreSQL.

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::postgres::PostgresPersistence;
use crate::domain::{Channel, DomainEvent};

/// User and restaurant an event concerns, for indexing the log.
#[must_use]
pub fn event_scope(event: &DomainEvent) -> (Option<i64>, Option<i64>) {
    let mut user = None;
    let mut restaurant = None;
    for channel in event.channels() {
        match channel {
            Channel::RestaurantQueue(id) | Channel::RestaurantReservations(id) => {
                restaurant = Some(id.get());
            }
            other => {
                if let Some(owner) = other.owner() {
                    user = Some(owner.get());
                }
            }
        }
    }
    (user, restaurant)
}

/// Spawns the recorder. It runs until the event bus closes.
///
/// Write failures are logged and skipped; in-memory state stays
/// authoritative.
pub fn spawn_event_recorder(
    persistence: PostgresPersistence,
    mut rx: broadcast::Receiver<DomainEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => record(&persistence, &event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "event recorder dropped events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        tracing::debug!("event recorder stopped");
    })
}

async fn record(persistence: &PostgresPersistence, event: &DomainEvent) {
    let (user_id, restaurant_id) = event_scope(event);
    if let Err(e) = persistence
        .save_event(event.event_type_str(), user_id, restaurant_id, &event.payload())
        .await
    {
        tracing::error!(error = %e, event_type = event.event_type_str(), "failed to record event");
    }
    if let DomainEvent::RedemptionCompleted(record) = event {
        match persistence.save_redemption(record).await {
            Ok(0) => {
                tracing::warn!(
                    redemption_id = %record.id,
                    token = %record.token,
                    "redemption token was already on record"
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(error = %e, redemption_id = %record.id, "failed to record redemption");
            }
        }
    }
}
