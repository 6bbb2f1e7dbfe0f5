//! Route definitions for `/service-requests`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::service_request;
use crate::state::AppState;

/// ```text
/// GET    /                 -> list
/// POST   /                 -> create
/// GET    /feedback/stats   -> feedback_stats (admin)
/// GET    /{id}             -> get_by_id
/// PATCH  /{id}             -> update
/// DELETE /{id}             -> cancel
/// POST   /{id}/approve     -> approve
/// POST   /{id}/reject      -> reject
/// GET    /{id}/timeline    -> get_timeline
/// GET    /{id}/comments    -> list_comments
/// POST   /{id}/comments    -> add_comment
/// GET    /{id}/feedback    -> get_feedback
/// POST   /{id}/feedback    -> submit_feedback
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(service_request::list).post(service_request::create),
        )
        .route("/feedback/stats", get(service_request::feedback_stats))
        .route(
            "/{id}",
            get(service_request::get_by_id)
                .patch(service_request::update)
                .delete(service_request::cancel),
        )
        .route("/{id}/approve", post(service_request::approve))
        .route("/{id}/reject", post(service_request::reject))
        .route("/{id}/timeline", get(service_request::get_timeline))
        .route(
            "/{id}/comments",
            get(service_request::list_comments).post(service_request::add_comment),
        )
        .route(
            "/{id}/feedback",
            get(service_request::get_feedback).post(service_request::submit_feedback),
        )
}
