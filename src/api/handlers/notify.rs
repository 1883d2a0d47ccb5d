//! Hooks the order and reservation CRUD services call after a status
//! change, so subscribers of the matching channels are notified.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::patch;
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::{MessageResponse, StatusUpdateRequest};
use crate::app_state::AppState;
use crate::domain::event::{OrderUpdate, ReservationUpdate};
use crate::domain::{DomainEvent, RestaurantId, UserId};
use crate::error::{ErrorResponse, GatewayError};

fn check_status(status: &str) -> Result<(), GatewayError> {
    if status.trim().is_empty() {
        return Err(GatewayError::InvalidRequest(
            "status must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// `PATCH /orders/{id}` — Publish an `order_updated` event.
///
/// # Errors
///
/// Returns [`GatewayError`] for an unknown user or an empty status.
#[utoipa::path(
    patch,
    path = "/api/orders/{id}",
    tag = "Notifications",
    summary = "Order status changed",
    params(("id" = i64, Path, description = "Order ID")),
    request_body = StatusUpdateRequest,
    responses(
        (status = 200, description = "Event published", body = MessageResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
pub async fn order_updated(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    check_status(&req.status)?;
    let user_id = UserId(req.user_id);
    state.users.get(user_id).await?;
    let delivered_to = state.event_bus.publish(DomainEvent::OrderUpdated(OrderUpdate {
        order_id,
        user_id,
        restaurant_id: RestaurantId(req.restaurant_id),
        status: req.status.clone(),
        updated_at: Utc::now(),
    }));
    tracing::info!(order_id, %user_id, status = %req.status, "order update published");
    Ok(Json(MessageResponse {
        message: format!("Order {order_id} is now {}", req.status),
        delivered_to,
    }))
}

/// `PATCH /reservations/{id}` — Publish a `reservation_updated` event.
///
/// # Errors
///
/// Returns [`GatewayError`] for an unknown user or an empty status.
#[utoipa::path(
    patch,
    path = "/api/reservations/{id}",
    tag = "Notifications",
    summary = "Reservation status changed",
    params(("id" = i64, Path, description = "Reservation ID")),
    request_body = StatusUpdateRequest,
    responses(
        (status = 200, description = "Event published", body = MessageResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
pub async fn reservation_updated(
    State(state): State<AppState>,
    Path(reservation_id): Path<i64>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    check_status(&req.status)?;
    let user_id = UserId(req.user_id);
    state.users.get(user_id).await?;
    let delivered_to = state
        .event_bus
        .publish(DomainEvent::ReservationUpdated(ReservationUpdate {
            reservation_id,
            user_id,
            restaurant_id: RestaurantId(req.restaurant_id),
            status: req.status.clone(),
            updated_at: Utc::now(),
        }));
    tracing::info!(reservation_id, %user_id, status = %req.status, "reservation update published");
    Ok(Json(MessageResponse {
        message: format!("Reservation {reservation_id} is now {}", req.status),
        delivered_to,
    }))
}

/// Notification routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders/{id}", patch(order_updated))
        .route("/reservations/{id}", patch(reservation_updated))
}
