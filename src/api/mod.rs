//! REST API layer: route handlers, DTOs, and router composition.
//!
//! All resource endpoints are mounted under `/api`; `/health` sits at the
//! root.

pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::error::{ErrorBody, ErrorResponse};

/// OpenAPI document for every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "diner-gateway",
        description = "Restaurant waitlist, loyalty and QR redemption API"
    ),
    paths(
        handlers::system::health_handler,
        handlers::users::create_user,
        handlers::users::get_user,
        handlers::queue::join_queue,
        handlers::queue::get_entry,
        handlers::queue::update_entry_status,
        handlers::queue::restaurant_queue,
        handlers::queue::user_entries,
        handlers::queue::update_times,
        handlers::redemption::issue_code,
        handlers::redemption::scan_qr,
        handlers::redemption::history,
        handlers::loyalty::get_account,
        handlers::loyalty::award_points,
        handlers::loyalty::create_reward,
        handlers::loyalty::list_rewards,
        handlers::loyalty::create_deal,
        handlers::loyalty::list_deals,
        handlers::notify::order_updated,
        handlers::notify::reservation_updated,
    ),
    components(schemas(ErrorResponse, ErrorBody)),
    tags(
        (name = "System", description = "Health"),
        (name = "Users", description = "Registration and session tokens"),
        (name = "Queue", description = "Virtual waitlist"),
        (name = "Redemption", description = "QR code issuance and scanning"),
        (name = "Loyalty", description = "Points, rewards and lightning deals"),
        (name = "Notifications", description = "Order and reservation status hooks"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .nest("/api", handlers::routes())
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_core_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/queue-entries",
            "/api/queue-entries/{id}",
            "/api/scan-qr",
            "/api/waitlist/{restaurantId}/update-times",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
