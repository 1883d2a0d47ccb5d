//! Data Transfer Objects for REST request/response serialization.
//!
//! Field names are camelCase on the wire. Ids are plain integers or UUIDs
//! and money is integer cents.

pub mod common_dto;
pub mod loyalty_dto;
pub mod queue_dto;
pub mod redemption_dto;
pub mod user_dto;

pub use common_dto::*;
pub use loyalty_dto::*;
pub use queue_dto::*;
pub use redemption_dto::*;
pub use user_dto::*;
