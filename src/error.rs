//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Each variant
//! maps to a specific HTTP status code, a numeric code and a stable reason
//! string, and renders as a structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "message": "code already redeemed",
///   "error": {
///     "code": 2101,
///     "reason": "already_redeemed"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable message, shown verbatim to staff.
    pub message: String,
    /// Machine-readable error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and reason discriminator.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges on [`GatewayError`]).
    pub code: u32,
    /// Stable snake_case reason string.
    pub reason: String,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category          | HTTP Status                    |
/// |-----------|-------------------|--------------------------------|
/// | 1000–1999 | Validation        | 400 Bad Request                |
/// | 2000–2099 | Not Found / State | 404 Not Found / 409 Conflict   |
/// | 2100–2199 | Redemption        | 400 / 403 / 409 / 410 / 422    |
/// | 3000–3999 | Server            | 500 Internal Server Error      |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Queue entry with the given ID was not found.
    #[error("queue entry not found: {0}")]
    EntryNotFound(uuid::Uuid),

    /// User with the given ID was not found.
    #[error("user not found: {0}")]
    UserNotFound(i64),

    /// Loyalty reward with the given ID was not found.
    #[error("reward not found: {0}")]
    RewardNotFound(i64),

    /// Lightning deal with the given ID was not found.
    #[error("lightning deal not found: {0}")]
    DealNotFound(i64),

    /// Queue status transition not allowed from the entry's current state.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        /// Current status of the entry.
        from: String,
        /// Requested target status.
        to: String,
    },

    /// Redemption code failed to decode or its signature did not verify.
    #[error("invalid code: {0}")]
    InvalidCode(String),

    /// Redemption code or deal window has expired.
    #[error("expired")]
    Expired,

    /// Redemption code uniqueness token was already consumed.
    #[error("code already redeemed")]
    AlreadyRedeemed,

    /// User balance is below the reward cost.
    #[error("insufficient points: required {required}, available {available}")]
    InsufficientPoints {
        /// Points the reward costs.
        required: u64,
        /// Points the user currently holds.
        available: u64,
    },

    /// Lightning deal has no remaining quantity.
    #[error("sold out")]
    SoldOut,

    /// Lightning deal window has not opened yet.
    #[error("deal has not started")]
    DealNotStarted,

    /// User's loyalty tier is below the benefit's required tier.
    #[error("tier {actual} does not meet required tier {required}")]
    TierNotEligible {
        /// Tier the benefit requires.
        required: String,
        /// Tier the user holds.
        actual: String,
    },

    /// Discount constraints (minimum order, category) not satisfied.
    #[error("discount not applicable: {0}")]
    DiscountNotApplicable(String),

    /// Caller lacks the role required for the operation.
    #[error("unauthorized")]
    Unauthorized,

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::EntryNotFound(_) => 2001,
            Self::UserNotFound(_) => 2002,
            Self::RewardNotFound(_) => 2003,
            Self::DealNotFound(_) => 2004,
            Self::InvalidTransition { .. } => 2010,
            Self::InvalidCode(_) => 2101,
            Self::Expired => 2102,
            Self::AlreadyRedeemed => 2103,
            Self::InsufficientPoints { .. } => 2104,
            Self::SoldOut => 2105,
            Self::DealNotStarted => 2106,
            Self::TierNotEligible { .. } => 2107,
            Self::DiscountNotApplicable(_) => 2108,
            Self::Unauthorized => 2109,
            Self::PersistenceError(_) => 3001,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the stable reason discriminator for this variant.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::EntryNotFound(_) => "entry_not_found",
            Self::UserNotFound(_) => "user_not_found",
            Self::RewardNotFound(_) => "reward_not_found",
            Self::DealNotFound(_) => "deal_not_found",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::InvalidCode(_) => "invalid_code",
            Self::Expired => "expired",
            Self::AlreadyRedeemed => "already_redeemed",
            Self::InsufficientPoints { .. } => "insufficient_points",
            Self::SoldOut => "sold_out",
            Self::DealNotStarted => "deal_not_started",
            Self::TierNotEligible { .. } => "tier_not_eligible",
            Self::DiscountNotApplicable(_) => "discount_not_applicable",
            Self::Unauthorized => "unauthorized",
            Self::PersistenceError(_) => "persistence_error",
            Self::Internal(_) => "internal",
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidCode(_) => StatusCode::BAD_REQUEST,
            Self::EntryNotFound(_)
            | Self::UserNotFound(_)
            | Self::RewardNotFound(_)
            | Self::DealNotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidTransition { .. } | Self::AlreadyRedeemed | Self::SoldOut => {
                StatusCode::CONFLICT
            }
            Self::Expired => StatusCode::GONE,
            Self::InsufficientPoints { .. }
            | Self::DealNotStarted
            | Self::TierNotEligible { .. }
            | Self::DiscountNotApplicable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthorized => StatusCode::FORBIDDEN,
            Self::PersistenceError(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for GatewayError {
    fn from(err: sqlx::Error) -> Self {
        Self::PersistenceError(err.to_string())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, reason = self.reason(), "request rejected");
        }
        let body = ErrorResponse {
            message: self.to_string(),
            error: ErrorBody {
                code: self.error_code(),
                reason: self.reason().to_string(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
