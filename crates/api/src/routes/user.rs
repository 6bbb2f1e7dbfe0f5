//! Route definitions for `/users`.

use axum::routing::{delete, get, patch, post};
use axum::Router;

use crate::handlers::{activity, pin, user};
use crate::state::AppState;

/// ```text
/// GET    /                        -> list
/// POST   /                        -> create
/// GET    /me                      -> me
/// POST   /me/change-password      -> change_password
/// GET    /me/pinned-tasks         -> pin::list
/// POST   /me/pinned-tasks         -> pin::pin
/// DELETE /me/pinned-tasks/{task_id} -> pin::unpin
/// GET    /{id}                    -> get_by_id
/// PATCH  /{id}                    -> update
/// DELETE /{id}                    -> delete
/// PATCH  /{id}/status             -> set_status
/// GET    /{id}/permissions        -> permissions
/// GET    /{id}/activities         -> activity::user_activities
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(user::list).post(user::create))
        .route("/me", get(user::me))
        .route("/me/change-password", post(user::change_password))
        .route("/me/pinned-tasks", get(pin::list).post(pin::pin))
        .route("/me/pinned-tasks/{task_id}", delete(pin::unpin))
        .route(
            "/{id}",
            get(user::get_by_id).patch(user::update).delete(user::delete),
        )
        .route("/{id}/status", patch(user::set_status))
        .route("/{id}/permissions", get(user::permissions))
        .route("/{id}/activities", get(activity::user_activities))
}
