//! REST endpoint handlers organized by resource.

pub mod loyalty;
pub mod notify;
pub mod queue;
pub mod redemption;
pub mod system;
pub mod users;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(users::routes())
        .merge(queue::routes())
        .merge(redemption::routes())
        .merge(loyalty::routes())
        .merge(notify::routes())
}
