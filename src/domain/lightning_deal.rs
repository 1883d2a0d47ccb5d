//! Time- and quantity-limited lightning deals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DealId;
use crate::error::GatewayError;

/// A discounted offer with a fixed number of claims inside a time window.
///
/// `claimed` only grows and never exceeds `total_available`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LightningDeal {
    /// Deal id.
    pub id: DealId,
    /// Display title.
    pub title: String,
    /// Regular price in cents.
    pub original_price_cents: u64,
    /// Deal price in cents.
    pub deal_price_cents: u64,
    /// Total claimable units.
    pub total_available: u32,
    /// Units claimed so far.
    pub claimed: u32,
    /// Window start (inclusive).
    pub start_time: DateTime<Utc>,
    /// Window end (inclusive).
    pub end_time: DateTime<Utc>,
}

impl LightningDeal {
    /// Units still claimable.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.total_available.saturating_sub(self.claimed)
    }

    /// Savings per claim in cents.
    #[must_use]
    pub const fn savings_cents(&self) -> u64 {
        self.original_price_cents
            .saturating_sub(self.deal_price_cents)
    }

    /// Returns `true` if `now` lies inside the deal window.
    #[must_use]
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.start_time <= now && now <= self.end_time
    }

    /// Checks that a claim at `now` would succeed, without claiming.
    ///
    /// # Errors
    ///
    /// [`GatewayError::DealNotStarted`] before the window,
    /// [`GatewayError::Expired`] after it and [`GatewayError::SoldOut`] at
    /// capacity.
    pub fn check_claimable(&self, now: DateTime<Utc>) -> Result<(), GatewayError> {
        if now < self.start_time {
            return Err(GatewayError::DealNotStarted);
        }
        if now > self.end_time {
            return Err(GatewayError::Expired);
        }
        if self.claimed >= self.total_available {
            return Err(GatewayError::SoldOut);
        }
        Ok(())
    }

    /// Claims one unit, returning the units left.
    ///
    /// # Errors
    ///
    /// Same as [`Self::check_claimable`]; on error `claimed` is unchanged.
    pub fn claim(&mut self, now: DateTime<Utc>) -> Result<u32, GatewayError> {
        self.check_claimable(now)?;
        self.claimed = self.claimed.saturating_add(1);
        Ok(self.remaining())
    }
}
