//! Domain layer: core types, waitlists, rewards ledger and event system.
//!
//! This module contains the server-side domain model: typed identifiers,
//! queue entries and the per-restaurant waitlist with its wait-time
//! estimator, users and loyalty balances, lightning deals, signed
//! redemption codes, the rewards ledger that applies them, realtime
//! channels and the event bus that fans state changes out to them.

pub mod channel;
pub mod event;
pub mod event_bus;
pub mod ids;
pub mod lightning_deal;
pub mod loyalty;
pub mod queue_entry;
pub mod queue_registry;
pub mod redemption_code;
pub mod restaurant_queue;
pub mod rewards_ledger;
pub mod user;
pub mod wait_time;

pub use channel::Channel;
pub use event::DomainEvent;
pub use event_bus::EventBus;
pub use ids::{DealId, EntryId, RestaurantId, RewardId, UserId};
pub use lightning_deal::LightningDeal;
pub use loyalty::{LoyaltyAccount, LoyaltyTier, Reward};
pub use queue_entry::{QueueEntry, QueueStatus};
pub use queue_registry::QueueRegistry;
pub use redemption_code::{RedemptionCode, RedemptionKind};
pub use restaurant_queue::RestaurantQueue;
pub use rewards_ledger::RewardsLedger;
pub use user::{Role, UserDirectory};
pub use wait_time::TurnoverSettings;
