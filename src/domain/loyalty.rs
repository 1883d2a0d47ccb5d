//! Loyalty balances, tiers and the reward catalog.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{RewardId, UserId};
use crate::error::GatewayError;

/// Loyalty tier, ordered from lowest to highest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum LoyaltyTier {
    /// Entry tier.
    Bronze,
    /// 500 lifetime points.
    Silver,
    /// 1 500 lifetime points.
    Gold,
    /// 5 000 lifetime points.
    Vip,
}

impl LoyaltyTier {
    /// Tier earned by the given lifetime points.
    #[must_use]
    pub const fn for_lifetime_points(points: u64) -> Self {
        match points {
            0..500 => Self::Bronze,
            500..1_500 => Self::Silver,
            1_500..5_000 => Self::Gold,
            _ => Self::Vip,
        }
    }

    /// Returns the wire name of this tier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bronze => "bronze",
            Self::Silver => "silver",
            Self::Gold => "gold",
            Self::Vip => "vip",
        }
    }
}

impl fmt::Display for LoyaltyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoyaltyTier {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bronze" => Ok(Self::Bronze),
            "silver" => Ok(Self::Silver),
            "gold" => Ok(Self::Gold),
            "vip" | "platinum" => Ok(Self::Vip),
            other => Err(GatewayError::InvalidRequest(format!("unknown tier: {other}"))),
        }
    }
}

/// A user's point balance.
///
/// `points` never goes negative: [`LoyaltyAccount::deduct`] either takes
/// the full amount or nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyAccount {
    /// Owner.
    pub user_id: UserId,
    /// Spendable points.
    pub points: u64,
    /// Points ever awarded. Drives the tier.
    pub lifetime_points: u64,
    /// Current tier.
    pub tier: LoyaltyTier,
}

impl LoyaltyAccount {
    /// Opens an empty bronze account.
    #[must_use]
    pub const fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            points: 0,
            lifetime_points: 0,
            tier: LoyaltyTier::Bronze,
        }
    }

    /// Adds points and re-evaluates the tier.
    pub fn award(&mut self, points: u64) {
        self.points = self.points.saturating_add(points);
        self.lifetime_points = self.lifetime_points.saturating_add(points);
        self.tier = self.tier.max(LoyaltyTier::for_lifetime_points(self.lifetime_points));
    }

    /// Removes `points` from the balance.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InsufficientPoints`] and leaves the balance
    /// untouched if it holds fewer than `points`.
    pub fn deduct(&mut self, points: u64) -> Result<u64, GatewayError> {
        let remaining =
            self.points
                .checked_sub(points)
                .ok_or(GatewayError::InsufficientPoints {
                    required: points,
                    available: self.points,
                })?;
        self.points = remaining;
        Ok(remaining)
    }
}

/// A catalog reward purchasable with points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    /// Reward id.
    pub id: RewardId,
    /// Display name.
    pub name: String,
    /// Description shown to the customer.
    pub description: Option<String>,
    /// Points deducted on redemption.
    pub points_required: u64,
    /// Inactive rewards cannot be redeemed.
    pub active: bool,
}
