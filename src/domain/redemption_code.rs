//! Signed QR redemption codes.
//!
//! A code is the payload a customer's QR encodes and staff scan:
//!
//! ```text
//! base64url(json) "." hex(hmac_sha256(secret, json))
//! ```
//!
//! The JSON carries the reward type and its payload, the owning user, an
//! expiry and a uniqueness token that may be consumed at most once.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::loyalty::LoyaltyTier;
use super::{DealId, RewardId, UserId};
use crate::crypto::Signer;
use crate::error::GatewayError;

/// How a discount amount is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// `amount` is a percentage (1–100).
    Percentage,
    /// `amount` is a fixed value in cents.
    Fixed,
}

/// Reward type and payload carried by a code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum RedemptionKind {
    /// Spend points on a catalog reward.
    Loyalty {
        /// Reward to redeem.
        reward_id: RewardId,
    },
    /// Percentage or fixed discount applied by staff at checkout.
    Discount {
        /// Percentage or fixed.
        kind: DiscountKind,
        /// Percent or cents, depending on `kind`.
        amount: u64,
        /// Minimum order value in cents.
        #[serde(default)]
        min_order_amount_cents: Option<u64>,
        /// Menu category the discount is restricted to.
        #[serde(default)]
        category: Option<String>,
    },
    /// Claim one unit of a lightning deal.
    Lightning {
        /// Deal to claim.
        deal_id: DealId,
    },
    /// Perk unlocked by a loyalty tier.
    Tier {
        /// Minimum tier.
        required_tier: LoyaltyTier,
        /// Benefit text shown to staff.
        benefit: String,
    },
}

impl RedemptionKind {
    /// Returns the type discriminator.
    #[must_use]
    pub const fn type_str(&self) -> &'static str {
        match self {
            Self::Loyalty { .. } => "loyalty",
            Self::Discount { .. } => "discount",
            Self::Lightning { .. } => "lightning",
            Self::Tier { .. } => "tier",
        }
    }

    /// Checks payload shape independent of any stored state.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] for out-of-range discounts
    /// or empty benefit text.
    pub fn validate(&self) -> Result<(), GatewayError> {
        match self {
            Self::Discount {
                kind: DiscountKind::Percentage,
                amount,
                ..
            } if *amount == 0 || *amount > 100 => Err(GatewayError::InvalidRequest(
                "percentage discount must be between 1 and 100".to_string(),
            )),
            Self::Discount {
                kind: DiscountKind::Fixed,
                amount: 0,
                ..
            } => Err(GatewayError::InvalidRequest(
                "fixed discount must be positive".to_string(),
            )),
            Self::Tier { benefit, .. } if benefit.trim().is_empty() => Err(
                GatewayError::InvalidRequest("tier benefit must not be empty".to_string()),
            ),
            _ => Ok(()),
        }
    }
}

/// Discount in cents for an order of `order_amount_cents`, capped at the
/// order value.
#[must_use]
pub fn discount_value(kind: DiscountKind, amount: u64, order_amount_cents: u64) -> u64 {
    let raw = match kind {
        DiscountKind::Percentage => order_amount_cents.saturating_mul(amount.min(100)) / 100,
        DiscountKind::Fixed => amount,
    };
    raw.min(order_amount_cents)
}

/// Decoded redemption code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionCode {
    /// Uniqueness token; consumed on first successful redemption.
    pub token: uuid::Uuid,
    /// Customer the code belongs to.
    pub user_id: UserId,
    /// Reward type and payload.
    #[serde(flatten)]
    pub kind: RedemptionKind,
    /// Issue time.
    pub issued_at: DateTime<Utc>,
    /// Expiry time.
    pub expires_at: DateTime<Utc>,
}

impl RedemptionCode {
    /// Creates a code with a fresh uniqueness token.
    #[must_use]
    pub fn new(
        user_id: UserId,
        kind: RedemptionKind,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            token: uuid::Uuid::new_v4(),
            user_id,
            kind,
            issued_at,
            expires_at,
        }
    }

    /// Returns `true` once `now` is past the expiry.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Serializes and signs the code into its QR string form.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if serialization fails.
    pub fn encode(&self, signer: &Signer) -> Result<String, GatewayError> {
        let json = serde_json::to_vec(self)
            .map_err(|e| GatewayError::Internal(format!("code serialization: {e}")))?;
        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&json),
            signer.sign(&json)
        ))
    }

    /// Parses and verifies a scanned QR string.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidCode`] if the value is malformed, the
    /// signature does not verify or the payload has the wrong shape.
    pub fn decode(value: &str, signer: &Signer) -> Result<Self, GatewayError> {
        let (body, signature) = value
            .trim()
            .split_once('.')
            .ok_or_else(|| GatewayError::InvalidCode("malformed code".to_string()))?;
        let json = URL_SAFE_NO_PAD
            .decode(body)
            .map_err(|_| GatewayError::InvalidCode("malformed code".to_string()))?;
        if !signer.verify(&json, signature) {
            return Err(GatewayError::InvalidCode("signature mismatch".to_string()));
        }
        let code: Self = serde_json::from_slice(&json)
            .map_err(|e| GatewayError::InvalidCode(format!("unreadable payload: {e}")))?;
        code.kind
            .validate()
            .map_err(|e| GatewayError::InvalidCode(e.to_string()))?;
        Ok(code)
    }
}
