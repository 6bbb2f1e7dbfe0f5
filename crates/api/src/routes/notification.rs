//! Route definitions for `/notifications`.

use axum::routing::{get, patch, post};
use axum::Router;

use crate::handlers::notification;
use crate::state::AppState;

/// ```text
/// GET    /                 -> list
/// GET    /unread-count     -> unread_count
/// POST   /mark-all-read    -> mark_all_read
/// PATCH  /{id}             -> mark_read
/// DELETE /{id}             -> delete
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(notification::list))
        .route("/unread-count", get(notification::unread_count))
        .route("/mark-all-read", post(notification::mark_all_read))
        .route(
            "/{id}",
            patch(notification::mark_read).delete(notification::delete),
        )
}
