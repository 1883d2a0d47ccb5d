//! Shared DTO types used across multiple endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Status change pushed by the order or reservation CRUD collaborator.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    /// Customer the record belongs to.
    pub user_id: i64,
    /// Restaurant the record belongs to.
    pub restaurant_id: i64,
    /// New status string, passed through verbatim.
    pub status: String,
}

/// Acknowledgement with a human-readable message.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    /// Summary for the caller.
    pub message: String,
    /// Number of live connections the event reached.
    pub delivered_to: usize,
}
