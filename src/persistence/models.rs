//! Database models for the redemption audit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::rewards_ledger::RedemptionRecord;
use crate::error::GatewayError;

/// Column tuple read from the `redemptions` table.
pub(crate) type RedemptionRow = (Uuid, Uuid, i64, i64, String, serde_json::Value, DateTime<Utc>);

/// A redemption row from the `redemptions` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRedemption {
    /// Redemption id.
    pub id: Uuid,
    /// Consumed uniqueness token.
    pub token: Uuid,
    /// Customer.
    pub user_id: i64,
    /// Staff member who scanned.
    pub staff_user_id: i64,
    /// `loyalty`, `discount`, `lightning` or `tier`.
    pub redemption_type: String,
    /// Type-specific details as JSONB.
    pub details: serde_json::Value,
    /// Commit time.
    pub redeemed_at: DateTime<Utc>,
}

impl TryFrom<&RedemptionRecord> for StoredRedemption {
    type Error = GatewayError;

    fn try_from(record: &RedemptionRecord) -> Result<Self, Self::Error> {
        let details = serde_json::to_value(&record.details)
            .map_err(|e| GatewayError::Internal(e.to_string()))?;
        Ok(Self {
            id: record.id,
            token: record.token,
            user_id: record.user_id.get(),
            staff_user_id: record.staff_user_id.get(),
            redemption_type: record.details.type_str().to_string(),
            details,
            redeemed_at: record.redeemed_at,
        })
    }
}

impl From<RedemptionRow> for StoredRedemption {
    fn from(
        (id, token, user_id, staff_user_id, redemption_type, details, redeemed_at): RedemptionRow,
    ) -> Self {
        Self {
            id,
            token,
            user_id,
            staff_user_id,
            redemption_type,
            details,
            redeemed_at,
        }
    }
}
