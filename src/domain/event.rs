//! Domain events reflecting committed state changes.
//!
//! Every mutation emits a [`DomainEvent`] through the [`super::EventBus`]
//! after it has been applied. Events are fanned out to WebSocket
//! subscribers of each channel the event belongs to and optionally
//! recorded to the PostgreSQL event log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::channel::Channel;
use super::lightning_deal::LightningDeal;
use super::loyalty::LoyaltyAccount;
use super::queue_entry::QueueEntry;
use super::rewards_ledger::RedemptionRecord;
use super::{RestaurantId, UserId};

/// Order status change reported by the order-management collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdate {
    /// Order id in the external store.
    pub order_id: i64,
    /// Customer who placed the order.
    pub user_id: UserId,
    /// Restaurant preparing the order.
    pub restaurant_id: RestaurantId,
    /// New status (e.g. `preparing`, `ready`).
    pub status: String,
    /// Time of the change.
    pub updated_at: DateTime<Utc>,
}

/// Reservation status change reported by the reservations collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationUpdate {
    /// Reservation id in the external store.
    pub reservation_id: i64,
    /// Customer holding the reservation.
    pub user_id: UserId,
    /// Restaurant the reservation is for.
    pub restaurant_id: RestaurantId,
    /// New status (e.g. `confirmed`, `cancelled`).
    pub status: String,
    /// Time of the change.
    pub updated_at: DateTime<Utc>,
}

/// Domain event emitted after every committed mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum DomainEvent {
    /// A queue entry's status, position or wait changed.
    QueueUpdated(QueueEntry),
    /// An order changed status.
    OrderUpdated(OrderUpdate),
    /// A reservation changed status.
    ReservationUpdated(ReservationUpdate),
    /// A code was redeemed.
    RedemptionCompleted(RedemptionRecord),
    /// A loyalty balance changed.
    PointsUpdated(LoyaltyAccount),
    /// A lightning deal was created or claimed.
    DealUpdated(LightningDeal),
}

impl DomainEvent {
    /// Returns the wire `type` of this event.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::QueueUpdated(_) => "queue_updated",
            Self::OrderUpdated(_) => "order_updated",
            Self::ReservationUpdated(_) => "reservation_updated",
            Self::RedemptionCompleted(_) => "redemption_completed",
            Self::PointsUpdated(_) => "points_updated",
            Self::DealUpdated(_) => "deal_updated",
        }
    }

    /// Channels this event is delivered on.
    #[must_use]
    pub fn channels(&self) -> Vec<Channel> {
        match self {
            Self::QueueUpdated(entry) => vec![
                Channel::UserQueue(entry.user_id),
                Channel::RestaurantQueue(entry.restaurant_id),
            ],
            Self::OrderUpdated(order) => vec![Channel::UserOrders(order.user_id)],
            Self::ReservationUpdated(reservation) => vec![
                Channel::UserReservations(reservation.user_id),
                Channel::RestaurantReservations(reservation.restaurant_id),
            ],
            Self::RedemptionCompleted(record) => vec![Channel::UserRewards(record.user_id)],
            Self::PointsUpdated(account) => vec![Channel::UserRewards(account.user_id)],
            Self::DealUpdated(_) => vec![Channel::Deals],
        }
    }

    /// Event payload as JSON, without the type tag.
    #[must_use]
    pub fn payload(&self) -> serde_json::Value {
        let value = match self {
            Self::QueueUpdated(entry) => serde_json::to_value(entry),
            Self::OrderUpdated(order) => serde_json::to_value(order),
            Self::ReservationUpdated(reservation) => serde_json::to_value(reservation),
            Self::RedemptionCompleted(record) => serde_json::to_value(record),
            Self::PointsUpdated(account) => serde_json::to_value(account),
            Self::DealUpdated(deal) => serde_json::to_value(deal),
        };
        value.unwrap_or_else(|e| {
            tracing::warn!(error = %e, event_type = self.event_type_str(), "event payload serialization failed");
            serde_json::Value::Null
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::queue_entry::JoinDetails;

    fn queue_event() -> DomainEvent {
        DomainEvent::QueueUpdated(QueueEntry::new(
            UserId(5),
            RestaurantId(2),
            3,
            JoinDetails::default(),
            Utc::now(),
        ))
    }

    #[test]
    fn queue_update_goes_to_user_and_restaurant() {
        let channels = queue_event().channels();
        assert_eq!(
            channels,
            vec![
                Channel::UserQueue(UserId(5)),
                Channel::RestaurantQueue(RestaurantId(2))
            ]
        );
    }

    #[test]
    fn serializes_as_type_and_payload() {
        let Ok(json) = serde_json::to_value(queue_event()) else {
            panic!("serialization failed");
        };
        assert_eq!(json.get("type").and_then(|v| v.as_str()), Some("queue_updated"));
        assert_eq!(
            json.get("payload")
                .and_then(|p| p.get("partySize"))
                .and_then(|v| v.as_u64()),
            Some(3)
        );
    }

    #[test]
    fn payload_omits_tag() {
        let event = queue_event();
        assert_eq!(event.event_type_str(), "queue_updated");
        assert!(event.payload().get("type").is_none());
        assert_eq!(event.payload().get("userId").and_then(|v| v.as_i64()), Some(5));
    }
}
