//! Route definitions for `/projects` and its nested resources.

use axum::routing::{get, patch, post};
use axum::Router;

use crate::handlers::{activity, phase, project, status, task};
use crate::state::AppState;

/// ```text
/// GET    /                           -> list
/// POST   /                           -> create
/// POST   /progress/batch             -> batch_progress
/// GET    /{id}                       -> get_by_id
/// PATCH  /{id}                       -> update
/// DELETE /{id}                       -> delete
/// GET    /{id}/progress              -> progress
/// GET    /{id}/board                 -> board
/// GET    /{id}/activities            -> activity::project_activities
///
/// GET    /{id}/statuses              -> status::list
/// POST   /{id}/statuses              -> status::create
/// POST   /{id}/statuses/batch        -> status::batch_create
/// PATCH  /{id}/statuses/{status_id}  -> status::update
/// DELETE /{id}/statuses/{status_id}  -> status::delete
///
/// GET    /{id}/phases                -> phase::list
/// POST   /{id}/phases                -> phase::create
/// POST   /{id}/phases/batch          -> phase::batch_create
///
/// GET    /{id}/tasks                 -> task::list_by_project
/// POST   /{id}/tasks                 -> task::create
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(project::list).post(project::create))
        .route("/progress/batch", post(project::batch_progress))
        .route(
            "/{id}",
            get(project::get_by_id)
                .patch(project::update)
                .delete(project::delete),
        )
        .route("/{id}/progress", get(project::progress))
        .route("/{id}/board", get(project::board))
        .route("/{id}/activities", get(activity::project_activities))
        // Board statuses
        .route("/{id}/statuses", get(status::list).post(status::create))
        .route("/{id}/statuses/batch", post(status::batch_create))
        .route(
            "/{id}/statuses/{status_id}",
            patch(status::update).delete(status::delete),
        )
        // Phases
        .route("/{id}/phases", get(phase::list).post(phase::create))
        .route("/{id}/phases/batch", post(phase::batch_create))
        // Tasks
        .route(
            "/{id}/tasks",
            get(task::list_by_project).post(task::create),
        )
}
