//! Redemption service: code issuance, staff scans and loyalty management.

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::crypto::Signer;
use crate::domain::rewards_ledger::{NewDeal, RedemptionContext, RedemptionRecord};
use crate::domain::{
    DomainEvent, EventBus, LightningDeal, LoyaltyAccount, RedemptionCode, RedemptionKind, Reward,
    RewardsLedger, UserDirectory, UserId,
};
use crate::error::GatewayError;

/// A freshly issued code together with its QR string.
#[derive(Debug, Clone)]
pub struct IssuedCode {
    /// Decoded form.
    pub code: RedemptionCode,
    /// Signed string the QR encodes.
    pub value: String,
}

/// Orchestration layer for the redemption engine.
///
/// Authorization and signature checks run before the ledger is touched.
/// The ledger commits balance, deal and token effects atomically, and
/// events are published only after it returns.
#[derive(Debug, Clone)]
pub struct RedemptionService {
    ledger: Arc<RewardsLedger>,
    users: Arc<UserDirectory>,
    signer: Arc<Signer>,
    event_bus: EventBus,
    code_ttl: Duration,
}

impl RedemptionService {
    /// Creates a new `RedemptionService`.
    #[must_use]
    pub fn new(
        ledger: Arc<RewardsLedger>,
        users: Arc<UserDirectory>,
        signer: Arc<Signer>,
        event_bus: EventBus,
        code_ttl: Duration,
    ) -> Self {
        Self {
            ledger,
            users,
            signer,
            event_bus,
            code_ttl,
        }
    }

    /// Returns the ledger.
    #[must_use]
    pub fn ledger(&self) -> &Arc<RewardsLedger> {
        &self.ledger
    }

    /// Opens a zero balance for a newly registered user.
    pub async fn open_account(&self, user_id: UserId) -> LoyaltyAccount {
        self.ledger.open_account(user_id).await
    }

    /// Returns a user's loyalty balance and tier.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UserNotFound`] for an unknown user.
    pub async fn account(&self, user_id: UserId) -> Result<LoyaltyAccount, GatewayError> {
        self.ledger.account(user_id).await
    }

    /// Issues a signed code for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UserNotFound`], [`GatewayError::RewardNotFound`]
    /// or [`GatewayError::DealNotFound`] when the code would reference
    /// missing state, and [`GatewayError::InvalidRequest`] for a malformed
    /// payload.
    pub async fn issue_code(
        &self,
        user_id: UserId,
        kind: RedemptionKind,
    ) -> Result<IssuedCode, GatewayError> {
        self.users.get(user_id).await?;
        kind.validate()?;
        match &kind {
            RedemptionKind::Loyalty { reward_id } => {
                self.ledger.reward(*reward_id).await?;
            }
            RedemptionKind::Lightning { deal_id } => {
                self.ledger.deal(*deal_id).await?;
            }
            RedemptionKind::Discount { .. } | RedemptionKind::Tier { .. } => {}
        }

        let now = Utc::now();
        let code = RedemptionCode::new(user_id, kind, now, now + self.code_ttl);
        let value = code.encode(&self.signer)?;
        tracing::info!(
            %user_id,
            token = %code.token,
            code_type = code.kind.type_str(),
            expires_at = %code.expires_at,
            "redemption code issued"
        );
        Ok(IssuedCode { code, value })
    }

    /// Redeems a scanned code on behalf of a staff member.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Unauthorized`] if the caller is not staff,
    /// [`GatewayError::InvalidCode`] for a bad signature or shape,
    /// [`GatewayError::Expired`] past the code's expiry, then the
    /// ledger's own failures. No state changes on any error.
    pub async fn redeem(
        &self,
        value: &str,
        staff_user_id: UserId,
        ctx: &RedemptionContext,
    ) -> Result<RedemptionRecord, GatewayError> {
        self.users.require_staff(staff_user_id).await?;

        let code = RedemptionCode::decode(value, &self.signer)?;
        let now = Utc::now();
        if code.is_expired(now) {
            tracing::debug!(token = %code.token, "expired code scanned");
            return Err(GatewayError::Expired);
        }

        let outcome = self.ledger.redeem(&code, staff_user_id, ctx, now).await?;

        tracing::info!(
            redemption_id = %outcome.record.id,
            user_id = %outcome.record.user_id,
            %staff_user_id,
            code_type = outcome.record.details.type_str(),
            "code redeemed"
        );
        self.event_bus
            .publish(DomainEvent::RedemptionCompleted(outcome.record.clone()));
        if let Some(account) = outcome.account {
            self.event_bus.publish(DomainEvent::PointsUpdated(account));
        }
        if let Some(deal) = outcome.deal {
            self.event_bus.publish(DomainEvent::DealUpdated(deal));
        }
        Ok(outcome.record)
    }

    /// Awards loyalty points.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Unauthorized`] if the caller is not staff, then
    /// [`GatewayError::UserNotFound`] or [`GatewayError::InvalidRequest`].
    pub async fn award_points(
        &self,
        user_id: UserId,
        points: u64,
        staff_user_id: UserId,
    ) -> Result<LoyaltyAccount, GatewayError> {
        self.users.require_staff(staff_user_id).await?;
        let account = self.ledger.award(user_id, points).await?;
        tracing::info!(%user_id, points, balance = account.points, tier = %account.tier, "points awarded");
        self.event_bus
            .publish(DomainEvent::PointsUpdated(account.clone()));
        Ok(account)
    }

    /// Adds a catalog reward.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Unauthorized`] or [`GatewayError::InvalidRequest`].
    pub async fn create_reward(
        &self,
        staff_user_id: UserId,
        name: &str,
        description: Option<String>,
        points_required: u64,
    ) -> Result<Reward, GatewayError> {
        self.users.require_staff(staff_user_id).await?;
        let reward = self
            .ledger
            .add_reward(name, description, points_required)
            .await?;
        tracing::info!(reward_id = %reward.id, points_required, "reward created");
        Ok(reward)
    }

    /// Returns the reward catalog.
    pub async fn rewards(&self) -> Vec<Reward> {
        self.ledger.rewards().await
    }

    /// Creates a lightning deal and announces it on the deals channel.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Unauthorized`] or [`GatewayError::InvalidRequest`].
    pub async fn create_deal(
        &self,
        staff_user_id: UserId,
        new: NewDeal,
    ) -> Result<LightningDeal, GatewayError> {
        self.users.require_staff(staff_user_id).await?;
        let deal = self.ledger.add_deal(new).await?;
        tracing::info!(deal_id = %deal.id, total = deal.total_available, "lightning deal created");
        self.event_bus.publish(DomainEvent::DealUpdated(deal.clone()));
        Ok(deal)
    }

    /// Returns all lightning deals.
    pub async fn deals(&self) -> Vec<LightningDeal> {
        self.ledger.deals().await
    }

    /// Returns redemption history, newest first.
    pub async fn history(&self, user_id: Option<UserId>) -> Vec<RedemptionRecord> {
        self.ledger.history(user_id).await
    }
}
