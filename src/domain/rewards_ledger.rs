//! Loyalty balances, reward catalog, lightning deals and consumed codes.
//!
//! All shared redemption state lives in one [`LedgerState`] behind a
//! single [`tokio::sync::Mutex`]. A redemption validates, mutates the
//! balance or deal counter, and marks its token consumed inside one
//! critical section: either every effect lands or none does. Two
//! concurrent claims on the last unit of a deal serialize on the lock and
//! the second observes `SoldOut`.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

use super::lightning_deal::LightningDeal;
use super::loyalty::{LoyaltyAccount, LoyaltyTier, Reward};
use super::redemption_code::{DiscountKind, RedemptionCode, RedemptionKind, discount_value};
use super::{DealId, RewardId, UserId};
use crate::error::GatewayError;

/// Checkout details staff may attach to a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedemptionContext {
    /// Order total in cents.
    pub order_amount_cents: Option<u64>,
    /// Menu category being discounted.
    pub category: Option<String>,
}

/// Type-specific outcome of a redemption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum RedemptionDetails {
    /// Points spent on a reward.
    Loyalty {
        /// Redeemed reward.
        reward_id: RewardId,
        /// Reward name.
        reward_name: String,
        /// Points taken from the balance.
        points_deducted: u64,
        /// Balance after deduction.
        remaining_points: u64,
    },
    /// Discount for staff to apply at checkout.
    Discount {
        /// Percentage or fixed.
        kind: DiscountKind,
        /// Percent or cents.
        amount: u64,
        /// Discount in cents when an order amount was supplied.
        discount_cents: Option<u64>,
    },
    /// One lightning deal unit claimed.
    Lightning {
        /// Claimed deal.
        deal_id: DealId,
        /// Deal title.
        title: String,
        /// Savings in cents.
        savings_cents: u64,
        /// Units left after this claim.
        remaining: u32,
    },
    /// Tier perk granted.
    Tier {
        /// User's tier at redemption.
        tier: LoyaltyTier,
        /// Benefit text.
        benefit: String,
    },
}

impl RedemptionDetails {
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

    /// Staff-facing summary.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Loyalty {
                reward_name,
                points_deducted,
                ..
            } => format!("Redeemed {reward_name} for {points_deducted} points"),
            Self::Discount {
                kind: DiscountKind::Percentage,
                amount,
                ..
            } => format!("Apply {amount}% discount"),
            Self::Discount {
                kind: DiscountKind::Fixed,
                amount,
                ..
            } => format!("Apply {} discount", format_cents(*amount)),
            Self::Lightning {
                title,
                savings_cents,
                ..
            } => format!("Lightning deal claimed: {title} (save {})", format_cents(*savings_cents)),
            Self::Tier { tier, benefit } => format!("{tier} benefit: {benefit}"),
        }
    }
}

fn format_cents(cents: u64) -> String {
    format!("${}.{:02}", cents / 100, cents % 100)
}

/// A completed redemption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionRecord {
    /// Redemption id.
    pub id: uuid::Uuid,
    /// Consumed uniqueness token.
    pub token: uuid::Uuid,
    /// Customer.
    pub user_id: UserId,
    /// Staff member who scanned.
    pub staff_user_id: UserId,
    /// Commit time.
    pub redeemed_at: DateTime<Utc>,
    /// Type-specific outcome.
    pub details: RedemptionDetails,
}

/// Effects of a committed redemption, for event fan-out.
#[derive(Debug, Clone)]
pub struct RedemptionOutcome {
    /// The record appended to history.
    pub record: RedemptionRecord,
    /// Balance after a loyalty deduction.
    pub account: Option<LoyaltyAccount>,
    /// Deal after a lightning claim.
    pub deal: Option<LightningDeal>,
}

/// New lightning deal parameters.
#[derive(Debug, Clone)]
pub struct NewDeal {
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

#[derive(Debug, Default)]
struct LedgerState {
    accounts: HashMap<UserId, LoyaltyAccount>,
    rewards: HashMap<RewardId, Reward>,
    deals: HashMap<DealId, LightningDeal>,
    consumed: HashSet<uuid::Uuid>,
    history: Vec<RedemptionRecord>,
}

/// Lock-guarded store for all redemption state.
#[derive(Debug)]
pub struct RewardsLedger {
    state: Mutex<LedgerState>,
    next_reward_id: AtomicI64,
    next_deal_id: AtomicI64,
}

impl RewardsLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            next_reward_id: AtomicI64::new(1),
            next_deal_id: AtomicI64::new(1),
        }
    }

    /// Opens a zero balance for a user. Existing accounts are kept.
    pub async fn open_account(&self, user_id: UserId) -> LoyaltyAccount {
        self.state
            .lock()
            .await
            .accounts
            .entry(user_id)
            .or_insert_with(|| LoyaltyAccount::new(user_id))
            .clone()
    }

    /// Returns a user's balance.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UserNotFound`] if no account is open.
    pub async fn account(&self, user_id: UserId) -> Result<LoyaltyAccount, GatewayError> {
        self.state
            .lock()
            .await
            .accounts
            .get(&user_id)
            .cloned()
            .ok_or(GatewayError::UserNotFound(user_id.get()))
    }

    /// Awards points.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UserNotFound`] if no account is open and
    /// [`GatewayError::InvalidRequest`] for zero points.
    pub async fn award(&self, user_id: UserId, points: u64) -> Result<LoyaltyAccount, GatewayError> {
        if points == 0 {
            return Err(GatewayError::InvalidRequest(
                "points must be positive".to_string(),
            ));
        }
        let mut state = self.state.lock().await;
        let account = state
            .accounts
            .get_mut(&user_id)
            .ok_or(GatewayError::UserNotFound(user_id.get()))?;
        account.award(points);
        Ok(account.clone())
    }

    /// Adds a reward to the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] for a blank name or a zero
    /// cost.
    pub async fn add_reward(
        &self,
        name: &str,
        description: Option<String>,
        points_required: u64,
    ) -> Result<Reward, GatewayError> {
        if name.trim().is_empty() || points_required == 0 {
            return Err(GatewayError::InvalidRequest(
                "reward needs a name and a positive cost".to_string(),
            ));
        }
        let reward = Reward {
            id: RewardId(self.next_reward_id.fetch_add(1, Ordering::Relaxed)),
            name: name.trim().to_string(),
            description,
            points_required,
            active: true,
        };
        self.state
            .lock()
            .await
            .rewards
            .insert(reward.id, reward.clone());
        Ok(reward)
    }

    /// Returns a catalog reward.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RewardNotFound`] for an unknown id.
    pub async fn reward(&self, id: RewardId) -> Result<Reward, GatewayError> {
        self.state
            .lock()
            .await
            .rewards
            .get(&id)
            .cloned()
            .ok_or(GatewayError::RewardNotFound(id.get()))
    }

    /// Returns the catalog ordered by cost.
    pub async fn rewards(&self) -> Vec<Reward> {
        let mut rewards: Vec<Reward> = self.state.lock().await.rewards.values().cloned().collect();
        rewards.sort_by_key(|r| (r.points_required, r.id));
        rewards
    }

    /// Creates a lightning deal.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] for an empty window or zero
    /// quantity.
    pub async fn add_deal(&self, new: NewDeal) -> Result<LightningDeal, GatewayError> {
        if new.total_available == 0 {
            return Err(GatewayError::InvalidRequest(
                "totalAvailable must be positive".to_string(),
            ));
        }
        if new.end_time <= new.start_time {
            return Err(GatewayError::InvalidRequest(
                "endTime must be after startTime".to_string(),
            ));
        }
        let deal = LightningDeal {
            id: DealId(self.next_deal_id.fetch_add(1, Ordering::Relaxed)),
            title: new.title,
            original_price_cents: new.original_price_cents,
            deal_price_cents: new.deal_price_cents,
            total_available: new.total_available,
            claimed: 0,
            start_time: new.start_time,
            end_time: new.end_time,
        };
        self.state.lock().await.deals.insert(deal.id, deal.clone());
        Ok(deal)
    }

    /// Returns a deal.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::DealNotFound`] for an unknown id.
    pub async fn deal(&self, id: DealId) -> Result<LightningDeal, GatewayError> {
        self.state
            .lock()
            .await
            .deals
            .get(&id)
            .cloned()
            .ok_or(GatewayError::DealNotFound(id.get()))
    }

    /// Returns all deals ordered by start time.
    pub async fn deals(&self) -> Vec<LightningDeal> {
        let mut deals: Vec<LightningDeal> = self.state.lock().await.deals.values().cloned().collect();
        deals.sort_by_key(|d| (d.start_time, d.id));
        deals
    }

    /// Returns redemptions, newest first, optionally for one user.
    pub async fn history(&self, user_id: Option<UserId>) -> Vec<RedemptionRecord> {
        self.state
            .lock()
            .await
            .history
            .iter()
            .rev()
            .filter(|r| user_id.is_none_or(|u| r.user_id == u))
            .cloned()
            .collect()
    }

    /// Returns `true` if the token was already consumed.
    pub async fn is_consumed(&self, token: uuid::Uuid) -> bool {
        self.state.lock().await.consumed.contains(&token)
    }

    /// Records tokens consumed by an earlier process so they cannot be
    /// redeemed again. Returns how many were not already known.
    pub async fn mark_consumed(&self, tokens: impl IntoIterator<Item = uuid::Uuid>) -> usize {
        let mut state = self.state.lock().await;
        tokens
            .into_iter()
            .filter(|token| state.consumed.insert(*token))
            .count()
    }

    /// Consumes a decoded, unexpired code.
    ///
    /// # Errors
    ///
    /// [`GatewayError::AlreadyRedeemed`] for a consumed token, plus the
    /// type-specific failures: `RewardNotFound`, `InsufficientPoints`,
    /// `DiscountNotApplicable`, `DealNotFound`, `SoldOut`, `Expired`,
    /// `DealNotStarted`, `TierNotEligible`, `UserNotFound`. On any error no
    /// state changes.
    pub async fn redeem(
        &self,
        code: &RedemptionCode,
        staff_user_id: UserId,
        ctx: &RedemptionContext,
        now: DateTime<Utc>,
    ) -> Result<RedemptionOutcome, GatewayError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        if state.consumed.contains(&code.token) {
            return Err(GatewayError::AlreadyRedeemed);
        }

        let mut account_after = None;
        let mut deal_after = None;
        let details = match &code.kind {
            RedemptionKind::Loyalty { reward_id } => {
                let reward = state
                    .rewards
                    .get(reward_id)
                    .filter(|r| r.active)
                    .ok_or(GatewayError::RewardNotFound(reward_id.get()))?;
                let account = state
                    .accounts
                    .get_mut(&code.user_id)
                    .ok_or(GatewayError::UserNotFound(code.user_id.get()))?;
                let remaining = account.deduct(reward.points_required)?;
                account_after = Some(account.clone());
                RedemptionDetails::Loyalty {
                    reward_id: reward.id,
                    reward_name: reward.name.clone(),
                    points_deducted: reward.points_required,
                    remaining_points: remaining,
                }
            }
            RedemptionKind::Discount {
                kind,
                amount,
                min_order_amount_cents,
                category,
            } => {
                check_discount(*min_order_amount_cents, category.as_deref(), ctx)?;
                RedemptionDetails::Discount {
                    kind: *kind,
                    amount: *amount,
                    discount_cents: ctx
                        .order_amount_cents
                        .map(|order| discount_value(*kind, *amount, order)),
                }
            }
            RedemptionKind::Lightning { deal_id } => {
                let deal = state
                    .deals
                    .get_mut(deal_id)
                    .ok_or(GatewayError::DealNotFound(deal_id.get()))?;
                let remaining = deal.claim(now)?;
                deal_after = Some(deal.clone());
                RedemptionDetails::Lightning {
                    deal_id: deal.id,
                    title: deal.title.clone(),
                    savings_cents: deal.savings_cents(),
                    remaining,
                }
            }
            RedemptionKind::Tier {
                required_tier,
                benefit,
            } => {
                let account = state
                    .accounts
                    .get(&code.user_id)
                    .ok_or(GatewayError::UserNotFound(code.user_id.get()))?;
                if account.tier < *required_tier {
                    return Err(GatewayError::TierNotEligible {
                        required: required_tier.to_string(),
                        actual: account.tier.to_string(),
                    });
                }
                RedemptionDetails::Tier {
                    tier: account.tier,
                    benefit: benefit.clone(),
                }
            }
        };

        // The mutation above was the last fallible step.
        state.consumed.insert(code.token);
        let record = RedemptionRecord {
            id: uuid::Uuid::new_v4(),
            token: code.token,
            user_id: code.user_id,
            staff_user_id,
            redeemed_at: now,
            details,
        };
        state.history.push(record.clone());

        Ok(RedemptionOutcome {
            record,
            account: account_after,
            deal: deal_after,
        })
    }
}

impl Default for RewardsLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn check_discount(
    min_order_amount_cents: Option<u64>,
    category: Option<&str>,
    ctx: &RedemptionContext,
) -> Result<(), GatewayError> {
    if let Some(min) = min_order_amount_cents {
        match ctx.order_amount_cents {
            None => {
                return Err(GatewayError::DiscountNotApplicable(
                    "order amount required".to_string(),
                ));
            }
            Some(order) if order < min => {
                return Err(GatewayError::DiscountNotApplicable(format!(
                    "order {} below minimum {}",
                    format_cents(order),
                    format_cents(min)
                )));
            }
            Some(_) => {}
        }
    }
    if let Some(required) = category {
        match ctx.category.as_deref() {
            None => {
                return Err(GatewayError::DiscountNotApplicable(
                    "category required".to_string(),
                ));
            }
            Some(actual) if !required.eq_ignore_ascii_case(actual) => {
                return Err(GatewayError::DiscountNotApplicable(format!(
                    "only valid for {required}"
                )));
            }
            Some(_) => {}
        }
    }
    Ok(())
}
