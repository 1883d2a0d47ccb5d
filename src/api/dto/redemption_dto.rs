//! Redemption DTOs: code issuance, staff scans and history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::redemption_code::DiscountKind;
use crate::domain::rewards_ledger::{RedemptionContext, RedemptionRecord};
use crate::domain::{DealId, LoyaltyTier, RedemptionCode, RedemptionKind, RewardId};
use crate::error::GatewayError;

/// Reward type a code carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CodeType {
    /// Catalog reward paid with points.
    Loyalty,
    /// Percentage or fixed discount.
    Discount,
    /// One lightning deal unit.
    Lightning,
    /// Tier perk.
    Tier,
}

/// Request body for `POST /redemption-codes`.
///
/// Which optional fields are required depends on `type`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueCodeRequest {
    /// Customer the code is for.
    pub user_id: i64,
    /// Reward type.
    #[serde(rename = "type")]
    pub code_type: CodeType,
    /// `loyalty`: reward to redeem.
    #[serde(default)]
    pub reward_id: Option<i64>,
    /// `discount`: percentage or fixed.
    #[serde(default)]
    pub discount_kind: Option<DiscountKind>,
    /// `discount`: percent or cents.
    #[serde(default)]
    pub amount: Option<u64>,
    /// `discount`: minimum order in cents.
    #[serde(default)]
    pub min_order_amount_cents: Option<u64>,
    /// `discount`: restricted menu category.
    #[serde(default)]
    pub category: Option<String>,
    /// `lightning`: deal to claim.
    #[serde(default)]
    pub deal_id: Option<i64>,
    /// `tier`: minimum tier.
    #[serde(default)]
    pub required_tier: Option<LoyaltyTier>,
    /// `tier`: benefit text.
    #[serde(default)]
    pub benefit: Option<String>,
}

impl IssueCodeRequest {
    /// Builds the typed reward payload.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] when a field the type
    /// needs is missing.
    pub fn to_kind(&self) -> Result<RedemptionKind, GatewayError> {
        let missing = |field: &str| {
            GatewayError::InvalidRequest(format!(
                "{field} is required for {} codes",
                match self.code_type {
                    CodeType::Loyalty => "loyalty",
                    CodeType::Discount => "discount",
                    CodeType::Lightning => "lightning",
                    CodeType::Tier => "tier",
                }
            ))
        };
        Ok(match self.code_type {
            CodeType::Loyalty => RedemptionKind::Loyalty {
                reward_id: RewardId(self.reward_id.ok_or_else(|| missing("rewardId"))?),
            },
            CodeType::Discount => RedemptionKind::Discount {
                kind: self.discount_kind.ok_or_else(|| missing("discountKind"))?,
                amount: self.amount.ok_or_else(|| missing("amount"))?,
                min_order_amount_cents: self.min_order_amount_cents,
                category: self.category.clone(),
            },
            CodeType::Lightning => RedemptionKind::Lightning {
                deal_id: DealId(self.deal_id.ok_or_else(|| missing("dealId"))?),
            },
            CodeType::Tier => RedemptionKind::Tier {
                required_tier: self.required_tier.ok_or_else(|| missing("requiredTier"))?,
                benefit: self.benefit.clone().ok_or_else(|| missing("benefit"))?,
            },
        })
    }
}

/// Response body for `POST /redemption-codes` (201 Created).
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueCodeResponse {
    /// Signed string to render as a QR code.
    pub qr_code_value: String,
    /// Uniqueness token.
    pub token: uuid::Uuid,
    /// Customer.
    pub user_id: i64,
    /// Reward type.
    #[serde(rename = "type")]
    pub code_type: String,
    /// Issue time.
    pub issued_at: DateTime<Utc>,
    /// Expiry time.
    pub expires_at: DateTime<Utc>,
}

impl IssueCodeResponse {
    /// Builds the response from an issued code.
    #[must_use]
    pub fn new(code: &RedemptionCode, qr_code_value: String) -> Self {
        Self {
            qr_code_value,
            token: code.token,
            user_id: code.user_id.get(),
            code_type: code.kind.type_str().to_string(),
            issued_at: code.issued_at,
            expires_at: code.expires_at,
        }
    }
}

/// Request body for `POST /scan-qr`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScanQrRequest {
    /// Scanned or typed code.
    pub qr_code_value: String,
    /// Staff member scanning.
    pub staff_user_id: i64,
    /// Order total in cents, for discount validation.
    #[serde(default)]
    pub order_amount_cents: Option<u64>,
    /// Menu category, for discount validation.
    #[serde(default)]
    pub category: Option<String>,
}

impl ScanQrRequest {
    /// Checkout context for the ledger.
    #[must_use]
    pub fn context(&self) -> RedemptionContext {
        RedemptionContext {
            order_amount_cents: self.order_amount_cents,
            category: self.category.clone(),
        }
    }
}

/// A completed redemption.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionDto {
    /// Redemption id.
    pub id: uuid::Uuid,
    /// Consumed token.
    pub token: uuid::Uuid,
    /// Customer.
    pub user_id: i64,
    /// Staff member who scanned.
    pub staff_user_id: i64,
    /// Commit time.
    pub redeemed_at: DateTime<Utc>,
    /// Reward type.
    #[serde(rename = "type")]
    pub redemption_type: String,
    /// Type-specific details (remaining points, discount, savings, benefit).
    #[schema(value_type = Object)]
    pub details: serde_json::Value,
}

impl From<RedemptionRecord> for RedemptionDto {
    fn from(record: RedemptionRecord) -> Self {
        Self {
            id: record.id,
            token: record.token,
            user_id: record.user_id.get(),
            staff_user_id: record.staff_user_id.get(),
            redeemed_at: record.redeemed_at,
            redemption_type: record.details.type_str().to_string(),
            details: serde_json::to_value(&record.details).unwrap_or_default(),
        }
    }
}

/// Response body for `POST /scan-qr`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ScanQrResponse {
    /// Staff-facing summary.
    pub message: String,
    /// The committed redemption.
    pub redemption: RedemptionDto,
}

/// Query parameters for `GET /redemptions`.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct HistoryParams {
    /// Only this customer's redemptions.
    #[serde(default)]
    pub user_id: Option<i64>,
}
