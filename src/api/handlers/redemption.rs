//! Redemption handlers: code issuance, staff scans and history.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    HistoryParams, IssueCodeRequest, IssueCodeResponse, RedemptionDto, ScanQrRequest,
    ScanQrResponse,
};
use crate::app_state::AppState;
use crate::domain::UserId;
use crate::error::{ErrorResponse, GatewayError};

/// `POST /redemption-codes` — Issue a signed QR code.
///
/// # Errors
///
/// Returns [`GatewayError`] for a malformed payload or when the code
/// would reference a missing user, reward or deal.
#[utoipa::path(
    post,
    path = "/api/redemption-codes",
    tag = "Redemption",
    summary = "Issue a redemption code",
    description = "Signs a single-use code carrying the reward type and payload. The code expires after the configured TTL.",
    request_body = IssueCodeRequest,
    responses(
        (status = 201, description = "Code issued", body = IssueCodeResponse),
        (status = 400, description = "Invalid payload", body = ErrorResponse),
        (status = 404, description = "User, reward or deal not found", body = ErrorResponse),
    )
)]
pub async fn issue_code(
    State(state): State<AppState>,
    Json(req): Json<IssueCodeRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let kind = req.to_kind()?;
    let issued = state
        .redemption_service
        .issue_code(UserId(req.user_id), kind)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(IssueCodeResponse::new(&issued.code, issued.value)),
    ))
}

/// `POST /scan-qr` — Redeem a scanned code.
///
/// # Errors
///
/// Returns the typed redemption failure (`invalid_code`, `expired`,
/// `already_redeemed`, `insufficient_points`, `sold_out`, `unauthorized`
/// and so on) with a `message` for the staff UI.
#[utoipa::path(
    post,
    path = "/api/scan-qr",
    tag = "Redemption",
    summary = "Scan and redeem a code",
    description = "Staff-only. Verifies the code, checks expiry and single use, then applies the reward atomically.",
    request_body = ScanQrRequest,
    responses(
        (status = 200, description = "Redeemed", body = ScanQrResponse),
        (status = 400, description = "Invalid code", body = ErrorResponse),
        (status = 403, description = "Caller is not staff", body = ErrorResponse),
        (status = 409, description = "Already redeemed or sold out", body = ErrorResponse),
        (status = 410, description = "Code or deal expired", body = ErrorResponse),
        (status = 422, description = "Insufficient points or not applicable", body = ErrorResponse),
    )
)]
pub async fn scan_qr(
    State(state): State<AppState>,
    Json(req): Json<ScanQrRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let record = state
        .redemption_service
        .redeem(&req.qr_code_value, UserId(req.staff_user_id), &req.context())
        .await?;
    Ok(Json(ScanQrResponse {
        message: record.details.message(),
        redemption: RedemptionDto::from(record),
    }))
}

/// `GET /redemptions` — Redemption history, newest first.
#[utoipa::path(
    get,
    path = "/api/redemptions",
    tag = "Redemption",
    summary = "Redemption history",
    params(HistoryParams),
    responses(
        (status = 200, description = "Redemptions, newest first", body = Vec<RedemptionDto>),
    )
)]
pub async fn history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> impl IntoResponse {
    let records = state
        .redemption_service
        .history(params.user_id.map(UserId))
        .await;
    Json(
        records
            .into_iter()
            .map(RedemptionDto::from)
            .collect::<Vec<_>>(),
    )
}

/// Redemption routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/redemption-codes", post(issue_code))
        .route("/scan-qr", post(scan_qr))
        .route("/redemptions", get(history))
}
