//! User registration handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{CreateUserRequest, CreateUserResponse, UserDto};
use crate::app_state::AppState;
use crate::domain::UserId;
use crate::error::{ErrorResponse, GatewayError};

/// `POST /users` — Register a user and open their loyalty balance.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] for a blank name.
#[utoipa::path(
    post,
    path = "/api/users",
    tag = "Users",
    summary = "Register user",
    description = "Creates a customer, staff or owner account with a zero loyalty balance and returns the session token used to authenticate WebSocket connections.",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = CreateUserResponse),
        (status = 400, description = "Invalid name", body = ErrorResponse),
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let user = state.users.register(&req.name, req.role).await?;
    state.redemption_service.open_account(user.id).await;
    let session_token = state.signer.session_token(user.id.get());
    tracing::info!(user_id = %user.id, role = ?user.role, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(CreateUserResponse {
            user: UserDto::from(user),
            session_token,
        }),
    ))
}

/// `GET /users/{id}` — Get a user.
///
/// # Errors
///
/// Returns [`GatewayError::UserNotFound`] for an unknown id.
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "Users",
    summary = "Get user",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = UserDto),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, GatewayError> {
    let user = state.users.get(UserId(id)).await?;
    Ok(Json(UserDto::from(user)))
}

/// User routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/{id}", get(get_user))
}
