//! Service layer: business logic orchestration.
//!
//! [`QueueService`] drives the waitlist state machine and estimator;
//! [`RedemptionService`] drives code issuance, scans and loyalty. Both
//! publish [`super::domain::DomainEvent`]s through the shared
//! [`super::domain::EventBus`] after their mutation has committed.

pub mod queue_service;
pub mod redemption_service;

pub use queue_service::QueueService;
pub use redemption_service::{IssuedCode, RedemptionService};
