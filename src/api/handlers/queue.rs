//! Waitlist handlers: join, transition, reads and turnover updates.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    JoinQueueRequest, QueueEntryDto, RestaurantQueueResponse, UpdateEntryStatusRequest,
    UpdateTimesRequest, UpdateTimesResponse,
};
use crate::app_state::AppState;
use crate::domain::queue_entry::JoinDetails;
use crate::domain::{EntryId, QueueStatus, RestaurantId, UserId};
use crate::error::{ErrorResponse, GatewayError};

/// `POST /queue-entries` — Join a restaurant's waitlist.
///
/// # Errors
///
/// Returns [`GatewayError`] for an unknown user, a zero party size or a
/// duplicate active entry.
#[utoipa::path(
    post,
    path = "/api/queue-entries",
    tag = "Queue",
    summary = "Join the waitlist",
    description = "Creates a waiting entry at the back of the restaurant's queue and returns it with its position and estimated wait.",
    request_body = JoinQueueRequest,
    responses(
        (status = 201, description = "Entry created", body = QueueEntryDto),
        (status = 400, description = "Invalid party size or already queued", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
pub async fn join_queue(
    State(state): State<AppState>,
    Json(req): Json<JoinQueueRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let details = JoinDetails {
        phone: req.phone,
        notes: req.notes,
        seating_preference: req.seating_preference,
    };
    let entry = state
        .queue_service
        .join_queue(
            UserId(req.user_id),
            RestaurantId(req.restaurant_id),
            req.party_size,
            details,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(QueueEntryDto::from(entry))))
}

/// `GET /queue-entries/{id}` — Get one entry.
///
/// # Errors
///
/// Returns [`GatewayError::EntryNotFound`] for an unknown id.
#[utoipa::path(
    get,
    path = "/api/queue-entries/{id}",
    tag = "Queue",
    summary = "Get queue entry",
    params(("id" = uuid::Uuid, Path, description = "Entry ID")),
    responses(
        (status = 200, description = "Entry", body = QueueEntryDto),
        (status = 404, description = "Entry not found", body = ErrorResponse),
    )
)]
pub async fn get_entry(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let entry = state.queue_service.get_entry(EntryId::from_uuid(id)).await?;
    Ok(Json(QueueEntryDto::from(entry)))
}

/// `PATCH /queue-entries/{id}` — Call, seat or cancel a party.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidTransition`] for a move the state
/// machine does not allow, including any move out of a terminal state
/// and any move on an entry that does not exist.
#[utoipa::path(
    patch,
    path = "/api/queue-entries/{id}",
    tag = "Queue",
    summary = "Change entry status",
    description = "Applies waiting→ready, ready→completed or →cancelled. Parties behind a departing entry move up and are re-estimated.",
    params(("id" = uuid::Uuid, Path, description = "Entry ID")),
    request_body = UpdateEntryStatusRequest,
    responses(
        (status = 200, description = "Updated entry", body = QueueEntryDto),
        (status = 409, description = "Transition not allowed or entry unknown", body = ErrorResponse),
    )
)]
pub async fn update_entry_status(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<UpdateEntryStatusRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let entry = state
        .queue_service
        .transition(EntryId::from_uuid(id), req.status)
        .await?;
    Ok(Json(QueueEntryDto::from(entry)))
}

/// `GET /restaurants/{id}/queue` — Active entries of one restaurant.
#[utoipa::path(
    get,
    path = "/api/restaurants/{id}/queue",
    tag = "Queue",
    summary = "Restaurant waitlist",
    params(("id" = i64, Path, description = "Restaurant ID")),
    responses(
        (status = 200, description = "Waiting and called parties", body = RestaurantQueueResponse),
    )
)]
pub async fn restaurant_queue(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let (entries, settings) = state.queue_service.list_queue(RestaurantId(id)).await;
    let waiting = entries
        .iter()
        .filter(|e| e.status == QueueStatus::Waiting)
        .count();
    Json(RestaurantQueueResponse {
        restaurant_id: id,
        average_table_turnover: settings.average_table_turnover,
        concurrent_tables: settings.concurrent_tables,
        waiting,
        entries: entries.into_iter().map(QueueEntryDto::from).collect(),
    })
}

/// `GET /users/{id}/queue-entries` — A customer's entries, newest first.
#[utoipa::path(
    get,
    path = "/api/users/{id}/queue-entries",
    tag = "Queue",
    summary = "User's queue history",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Entries, newest first", body = Vec<QueueEntryDto>),
    )
)]
pub async fn user_entries(State(state): State<AppState>, Path(id): Path<i64>) -> impl IntoResponse {
    let entries = state.queue_service.user_entries(UserId(id)).await;
    Json(
        entries
            .into_iter()
            .map(QueueEntryDto::from)
            .collect::<Vec<_>>(),
    )
}

/// `POST /waitlist/{restaurantId}/update-times` — Change turnover and
/// re-estimate every waiting party.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] for a zero turnover.
#[utoipa::path(
    post,
    path = "/api/waitlist/{restaurantId}/update-times",
    tag = "Queue",
    summary = "Update table turnover",
    params(("restaurantId" = i64, Path, description = "Restaurant ID")),
    request_body = UpdateTimesRequest,
    responses(
        (status = 200, description = "Estimates recomputed", body = UpdateTimesResponse),
        (status = 400, description = "Invalid turnover", body = ErrorResponse),
    )
)]
pub async fn update_times(
    State(state): State<AppState>,
    Path(restaurant_id): Path<i64>,
    Json(req): Json<UpdateTimesRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let updated = state
        .queue_service
        .update_turnover(
            RestaurantId(restaurant_id),
            req.average_table_turnover,
            req.concurrent_tables,
        )
        .await?;
    Ok(Json(UpdateTimesResponse {
        message: format!("Wait times updated for {updated} entries"),
        restaurant_id,
        updated_entries: updated,
    }))
}

/// Queue routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/queue-entries", post(join_queue))
        .route(
            "/queue-entries/{id}",
            get(get_entry).patch(update_entry_status),
        )
        .route("/restaurants/{id}/queue", get(restaurant_queue))
        .route("/users/{id}/queue-entries", get(user_entries))
        .route("/waitlist/{restaurant_id}/update-times", post(update_times))
}
