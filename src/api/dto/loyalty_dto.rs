//! Loyalty, reward catalog and lightning deal DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::rewards_ledger::NewDeal;
use crate::domain::{LightningDeal, LoyaltyAccount, LoyaltyTier, Reward};

/// A customer's loyalty balance.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyAccountDto {
    /// Owner.
    pub user_id: i64,
    /// Spendable points.
    pub points: u64,
    /// Points ever awarded.
    pub lifetime_points: u64,
    /// Current tier.
    pub tier: LoyaltyTier,
}

impl From<LoyaltyAccount> for LoyaltyAccountDto {
    fn from(account: LoyaltyAccount) -> Self {
        Self {
            user_id: account.user_id.get(),
            points: account.points,
            lifetime_points: account.lifetime_points,
            tier: account.tier,
        }
    }
}

/// Request body for `POST /loyalty/{userId}/award`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AwardPointsRequest {
    /// Points to add (positive).
    pub points: u64,
    /// Staff member granting them.
    pub staff_user_id: i64,
}

/// Request body for `POST /rewards`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRewardRequest {
    /// Staff member or owner creating it.
    pub staff_user_id: i64,
    /// Display name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Cost in points.
    pub points_required: u64,
}

/// A catalog reward.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RewardDto {
    /// Reward id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Cost in points.
    pub points_required: u64,
    /// Whether it can be redeemed.
    pub active: bool,
}

impl From<Reward> for RewardDto {
    fn from(reward: Reward) -> Self {
        Self {
            id: reward.id.get(),
            name: reward.name,
            description: reward.description,
            points_required: reward.points_required,
            active: reward.active,
        }
    }
}

/// Request body for `POST /lightning-deals`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDealRequest {
    /// Staff member or owner creating it.
    pub staff_user_id: i64,
    /// Display title.
    pub title: String,
    /// Regular price in cents.
    pub original_price_cents: u64,
    /// Deal price in cents.
    pub deal_price_cents: u64,
    /// Claimable units.
    pub total_available: u32,
    /// Window start.
    pub start_time: DateTime<Utc>,
    /// Window end.
    pub end_time: DateTime<Utc>,
}

impl CreateDealRequest {
    /// Ledger input for this request.
    #[must_use]
    pub fn to_new_deal(&self) -> NewDeal {
        NewDeal {
            title: self.title.clone(),
            original_price_cents: self.original_price_cents,
            deal_price_cents: self.deal_price_cents,
            total_available: self.total_available,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

/// A lightning deal and its live availability.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LightningDealDto {
    /// Deal id.
    pub id: i64,
    /// Display title.
    pub title: String,
    /// Regular price in cents.
    pub original_price_cents: u64,
    /// Deal price in cents.
    pub deal_price_cents: u64,
    /// Claimable units.
    pub total_available: u32,
    /// Units claimed.
    pub claimed: u32,
    /// Units left.
    pub remaining: u32,
    /// Window start.
    pub start_time: DateTime<Utc>,
    /// Window end.
    pub end_time: DateTime<Utc>,
    /// Whether the deal can be claimed right now.
    pub live: bool,
}

impl From<LightningDeal> for LightningDealDto {
    fn from(deal: LightningDeal) -> Self {
        let live = deal.is_live(Utc::now());
        Self {
            id: deal.id.get(),
            remaining: deal.remaining(),
            title: deal.title,
            original_price_cents: deal.original_price_cents,
            deal_price_cents: deal.deal_price_cents,
            total_available: deal.total_available,
            claimed: deal.claimed,
            start_time: deal.start_time,
            end_time: deal.end_time,
            live,
        }
    }
}
