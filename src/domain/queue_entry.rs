//! Waitlist entries and their lifecycle.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{EntryId, RestaurantId, UserId};
use crate::error::GatewayError;

/// Lifecycle state of a queue entry.
///
/// `waiting → ready → completed`, `waiting → cancelled` and
/// `ready → cancelled`. `completed` and `cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    /// In line, holding a position.
    Waiting,
    /// Called by staff; table is ready.
    #[serde(alias = "called")]
    Ready,
    /// Seated.
    #[serde(alias = "seated")]
    Completed,
    /// Left the queue or removed by staff.
    Cancelled,
}

impl QueueStatus {
    /// Returns `true` for `completed` and `cancelled`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Returns `true` for `waiting` and `ready`.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !self.is_terminal()
    }

    /// Returns `true` if the state machine allows `self → next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Waiting, Self::Ready)
                | (Self::Waiting, Self::Cancelled)
                | (Self::Ready, Self::Completed)
                | (Self::Ready, Self::Cancelled)
        )
    }

    /// Returns the wire name of this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Ready => "ready",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a transition requested on an entry that does not exist.
///
/// Reported as a rejected transition from `missing`, the same way a move
/// out of a terminal state is.
#[must_use]
pub fn missing_entry_transition(next: QueueStatus) -> GatewayError {
    GatewayError::InvalidTransition {
        from: "missing".to_string(),
        to: next.to_string(),
    }
}

impl FromStr for QueueStatus {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(Self::Waiting),
            "ready" | "called" => Ok(Self::Ready),
            "completed" | "seated" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(GatewayError::InvalidRequest(format!(
                "unknown queue status: {other}"
            ))),
        }
    }
}

/// Optional details supplied when joining.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinDetails {
    /// Contact phone number for SMS notification.
    pub phone: Option<String>,
    /// Free-form notes (high chair, allergies).
    pub notes: Option<String>,
    /// Requested seating area.
    pub seating_preference: Option<String>,
}

/// One party's place in a restaurant's virtual waitlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    /// Entry identifier.
    pub id: EntryId,
    /// Customer who joined.
    pub user_id: UserId,
    /// Restaurant whose queue this is.
    pub restaurant_id: RestaurantId,
    /// Number of guests.
    pub party_size: u32,
    /// Lifecycle state.
    pub status: QueueStatus,
    /// 1-based rank among waiting entries; 0 once the entry left `waiting`.
    pub position: u32,
    /// Estimated minutes until called; 0 once the entry left `waiting`.
    pub estimated_wait_time: u32,
    /// Join timestamp. Immutable.
    pub joined_at: DateTime<Utc>,
    /// When staff called the party.
    pub called_at: Option<DateTime<Utc>>,
    /// When the party was seated.
    pub completed_at: Option<DateTime<Utc>>,
    /// When the entry was cancelled.
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Optional join details.
    #[serde(flatten)]
    pub details: JoinDetails,
}

impl QueueEntry {
    /// Creates a `waiting` entry. Position and wait are assigned by the
    /// owning queue.
    #[must_use]
    pub fn new(
        user_id: UserId,
        restaurant_id: RestaurantId,
        party_size: u32,
        details: JoinDetails,
        joined_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EntryId::new(),
            user_id,
            restaurant_id,
            party_size,
            status: QueueStatus::Waiting,
            position: 0,
            estimated_wait_time: 0,
            joined_at,
            called_at: None,
            completed_at: None,
            cancelled_at: None,
            details,
        }
    }

    /// Moves the entry to `next`, stamping the matching timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidTransition`] without mutating the
    /// entry if the state machine forbids the move.
    pub fn transition(&mut self, next: QueueStatus, now: DateTime<Utc>) -> Result<(), GatewayError> {
        if !self.status.can_transition_to(next) {
            return Err(GatewayError::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        match next {
            QueueStatus::Ready => self.called_at = Some(now),
            QueueStatus::Completed => self.completed_at = Some(now),
            QueueStatus::Cancelled => self.cancelled_at = Some(now),
            QueueStatus::Waiting => {}
        }
        if next != QueueStatus::Waiting {
            self.position = 0;
            self.estimated_wait_time = 0;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn entry() -> QueueEntry {
        QueueEntry::new(
            UserId(1),
            RestaurantId(1),
            2,
            JoinDetails::default(),
            Utc::now(),
        )
    }

    #[test]
    fn allowed_transitions() {
        use QueueStatus::*;
        assert!(Waiting.can_transition_to(Ready));
        assert!(Waiting.can_transition_to(Cancelled));
        assert!(Ready.can_transition_to(Completed));
        assert!(Ready.can_transition_to(Cancelled));
        assert!(!Waiting.can_transition_to(Completed));
        assert!(!Waiting.can_transition_to(Waiting));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Ready));
    }

    #[test]
    fn terminal_transition_fails_without_mutation() {
        let mut e = entry();
        let now = Utc::now();
        assert!(e.transition(QueueStatus::Cancelled, now).is_ok());
        let before = e.clone();
        let result = e.transition(QueueStatus::Ready, now);
        assert!(matches!(
            result,
            Err(GatewayError::InvalidTransition { .. })
        ));
        assert_eq!(e, before);
    }

    #[test]
    fn transition_stamps_timestamps_and_clears_position() {
        let mut e = entry();
        e.position = 3;
        e.estimated_wait_time = 50;
        let now = Utc::now();
        assert!(e.transition(QueueStatus::Ready, now).is_ok());
        assert_eq!(e.called_at, Some(now));
        assert_eq!(e.position, 0);
        assert_eq!(e.estimated_wait_time, 0);
        assert!(e.transition(QueueStatus::Completed, now).is_ok());
        assert_eq!(e.completed_at, Some(now));
    }

    #[test]
    fn status_aliases_parse() {
        let Ok(called) = serde_json::from_str::<QueueStatus>("\"called\"") else {
            panic!("alias should parse");
        };
        assert_eq!(called, QueueStatus::Ready);
        assert_eq!("seated".parse::<QueueStatus>().ok(), Some(QueueStatus::Completed));
        assert!("gone".parse::<QueueStatus>().is_err());
    }

    #[test]
    fn entry_serializes_camel_case() {
        let Ok(json) = serde_json::to_value(entry()) else {
            panic!("serialization failed");
        };
        assert!(json.get("partySize").is_some());
        assert!(json.get("estimatedWaitTime").is_some());
        assert_eq!(json.get("status").and_then(|v| v.as_str()), Some("waiting"));
    }
}
