//! Waitlist DTOs: join, status change, listing and turnover updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{QueueEntry, QueueStatus};

/// Request body for `POST /queue-entries`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinQueueRequest {
    /// Customer joining.
    pub user_id: i64,
    /// Restaurant whose queue to join.
    pub restaurant_id: i64,
    /// Number of guests (positive).
    pub party_size: u32,
    /// Contact phone number.
    #[serde(default)]
    pub phone: Option<String>,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Requested seating area.
    #[serde(default)]
    pub seating_preference: Option<String>,
}

/// Request body for `PATCH /queue-entries/{id}`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateEntryStatusRequest {
    /// Target status. `called` and `seated` are accepted as aliases.
    pub status: QueueStatus,
}

/// A queue entry as returned by the API.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntryDto {
    /// Entry identifier.
    pub id: uuid::Uuid,
    /// Customer.
    pub user_id: i64,
    /// Restaurant.
    pub restaurant_id: i64,
    /// Number of guests.
    pub party_size: u32,
    /// Lifecycle state.
    pub status: QueueStatus,
    /// 1-based rank among waiting parties, 0 when not waiting.
    pub position: u32,
    /// Estimated wait in minutes.
    pub estimated_wait_time: u32,
    /// Join time.
    pub joined_at: DateTime<Utc>,
    /// When the party was called.
    pub called_at: Option<DateTime<Utc>>,
    /// When the party was seated.
    pub completed_at: Option<DateTime<Utc>>,
    /// When the entry was cancelled.
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Contact phone number.
    pub phone: Option<String>,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Requested seating area.
    pub seating_preference: Option<String>,
}

impl From<QueueEntry> for QueueEntryDto {
    fn from(entry: QueueEntry) -> Self {
        Self {
            id: *entry.id.as_uuid(),
            user_id: entry.user_id.get(),
            restaurant_id: entry.restaurant_id.get(),
            party_size: entry.party_size,
            status: entry.status,
            position: entry.position,
            estimated_wait_time: entry.estimated_wait_time,
            joined_at: entry.joined_at,
            called_at: entry.called_at,
            completed_at: entry.completed_at,
            cancelled_at: entry.cancelled_at,
            phone: entry.details.phone,
            notes: entry.details.notes,
            seating_preference: entry.details.seating_preference,
        }
    }
}

/// Response body for `GET /restaurants/{id}/queue`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantQueueResponse {
    /// Restaurant.
    pub restaurant_id: i64,
    /// Average table turnover in minutes.
    pub average_table_turnover: u32,
    /// Tables turning over in parallel.
    pub concurrent_tables: u32,
    /// Parties currently waiting.
    pub waiting: usize,
    /// Waiting parties by position, then called parties.
    pub entries: Vec<QueueEntryDto>,
}

/// Request body for `POST /waitlist/{restaurantId}/update-times`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTimesRequest {
    /// Average table turnover in minutes (positive).
    pub average_table_turnover: u32,
    /// Tables turning over in parallel. Unchanged when omitted.
    #[serde(default)]
    pub concurrent_tables: Option<u32>,
}

/// Response body for `POST /waitlist/{restaurantId}/update-times`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTimesResponse {
    /// Human-readable summary.
    pub message: String,
    /// Restaurant.
    pub restaurant_id: i64,
    /// Entries whose estimate changed.
    pub updated_entries: usize,
}
