pub mod bookings;
pub mod health;

use std::sync::Arc;

use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route(
            "/bookings",
            get(bookings::search_bookings).post(bookings::create_booking),
        )
        .route(
            "/bookings/:id",
            get(bookings::get_booking)
                .patch(bookings::update_booking)
                .delete(bookings::delete_booking),
        )
        .route("/bookings/:id/status", patch(bookings::update_booking_status))
        .route("/bookings/:id/accept", post(bookings::accept_booking))
        .route("/bookings/:id/reject", post(bookings::reject_booking))
        .route("/bookings/:id/cancel", post(bookings::cancel_booking))
        .route("/bookings/requester/:user_id", get(bookings::by_requester))
        .route("/bookings/provider/:user_id", get(bookings::by_provider))
        .route("/bookings/resource/:resource_id", get(bookings::by_resource))
        .route("/bookings/skill/:skill_id", get(bookings::by_skill))
        .route("/bookings/history/:user_id", get(bookings::history))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
