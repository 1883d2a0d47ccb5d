//! Loyalty balance, reward catalog and lightning deal handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    AwardPointsRequest, CreateDealRequest, CreateRewardRequest, LightningDealDto,
    LoyaltyAccountDto, RewardDto,
};
use crate::app_state::AppState;
use crate::domain::UserId;
use crate::error::{ErrorResponse, GatewayError};

/// `GET /loyalty/{userId}` — Points balance and tier.
///
/// # Errors
///
/// Returns [`GatewayError::UserNotFound`] for an unknown user.
#[utoipa::path(
    get,
    path = "/api/loyalty/{userId}",
    tag = "Loyalty",
    summary = "Loyalty balance",
    params(("userId" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Balance", body = LoyaltyAccountDto),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
pub async fn get_account(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, GatewayError> {
    let account = state.redemption_service.account(UserId(user_id)).await?;
    Ok(Json(LoyaltyAccountDto::from(account)))
}

/// `POST /loyalty/{userId}/award` — Grant points.
///
/// # Errors
///
/// Returns [`GatewayError::Unauthorized`] unless the caller is staff.
#[utoipa::path(
    post,
    path = "/api/loyalty/{userId}/award",
    tag = "Loyalty",
    summary = "Award points",
    params(("userId" = i64, Path, description = "User ID")),
    request_body = AwardPointsRequest,
    responses(
        (status = 200, description = "New balance", body = LoyaltyAccountDto),
        (status = 403, description = "Caller is not staff", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
pub async fn award_points(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(req): Json<AwardPointsRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let account = state
        .redemption_service
        .award_points(UserId(user_id), req.points, UserId(req.staff_user_id))
        .await?;
    Ok(Json(LoyaltyAccountDto::from(account)))
}

/// `POST /rewards` — Add a catalog reward.
///
/// # Errors
///
/// Returns [`GatewayError`] for non-staff callers or invalid input.
#[utoipa::path(
    post,
    path = "/api/rewards",
    tag = "Loyalty",
    summary = "Create reward",
    request_body = CreateRewardRequest,
    responses(
        (status = 201, description = "Reward created", body = RewardDto),
        (status = 400, description = "Invalid reward", body = ErrorResponse),
        (status = 403, description = "Caller is not staff", body = ErrorResponse),
    )
)]
pub async fn create_reward(
    State(state): State<AppState>,
    Json(req): Json<CreateRewardRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let reward = state
        .redemption_service
        .create_reward(
            UserId(req.staff_user_id),
            &req.name,
            req.description,
            req.points_required,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(RewardDto::from(reward))))
}

/// `GET /rewards` — Reward catalog ordered by cost.
#[utoipa::path(
    get,
    path = "/api/rewards",
    tag = "Loyalty",
    summary = "List rewards",
    responses(
        (status = 200, description = "Catalog", body = Vec<RewardDto>),
    )
)]
pub async fn list_rewards(State(state): State<AppState>) -> impl IntoResponse {
    let rewards = state.redemption_service.rewards().await;
    Json(rewards.into_iter().map(RewardDto::from).collect::<Vec<_>>())
}

/// `POST /lightning-deals` — Create a time-boxed deal.
///
/// # Errors
///
/// Returns [`GatewayError`] for non-staff callers, an empty window or a
/// zero quantity.
#[utoipa::path(
    post,
    path = "/api/lightning-deals",
    tag = "Loyalty",
    summary = "Create lightning deal",
    request_body = CreateDealRequest,
    responses(
        (status = 201, description = "Deal created", body = LightningDealDto),
        (status = 400, description = "Invalid deal", body = ErrorResponse),
        (status = 403, description = "Caller is not staff", body = ErrorResponse),
    )
)]
pub async fn create_deal(
    State(state): State<AppState>,
    Json(req): Json<CreateDealRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let deal = state
        .redemption_service
        .create_deal(UserId(req.staff_user_id), req.to_new_deal())
        .await?;
    Ok((StatusCode::CREATED, Json(LightningDealDto::from(deal))))
}

/// `GET /lightning-deals` — All deals with live availability.
#[utoipa::path(
    get,
    path = "/api/lightning-deals",
    tag = "Loyalty",
    summary = "List lightning deals",
    responses(
        (status = 200, description = "Deals", body = Vec<LightningDealDto>),
    )
)]
pub async fn list_deals(State(state): State<AppState>) -> impl IntoResponse {
    let deals = state.redemption_service.deals().await;
    Json(
        deals
            .into_iter()
            .map(LightningDealDto::from)
            .collect::<Vec<_>>(),
    )
}

/// Loyalty and catalog routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/loyalty/{user_id}", get(get_account))
        .route("/loyalty/{user_id}/award", post(award_points))
        .route("/rewards", get(list_rewards).post(create_reward))
        .route("/lightning-deals", get(list_deals).post(create_deal))
}
