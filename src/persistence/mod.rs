//! Persistence layer: PostgreSQL event log and redemption audit.
//!
//! Optional and write-behind. When `PERSISTENCE_ENABLED` is set, a
//! recorder task subscribes to the event bus and appends every domain
//! event to `events` and every redemption to `redemptions`. At startup
//! the recorded redemption tokens are loaded back so a code consumed
//! before a restart stays consumed. Otherwise in-memory lock-guarded
//! state remains the source of truth.

pub mod models;
pub mod postgres;
pub mod recorder;

pub use postgres::PostgresPersistence;
pub use recorder::spawn_event_recorder;
