//! Route definitions for `/tasks` and `/departments/{id}/tasks`.

use axum::routing::{get, patch, post};
use axum::Router;

use crate::handlers::{checklist, comment, task};
use crate::state::AppState;

/// Routes mounted at `/tasks`.
///
/// ```text
/// GET    /                              -> list
/// POST   /bulk-update                   -> bulk_update
/// GET    /{id}                          -> get_by_id
/// PATCH  /{id}                          -> update
/// DELETE /{id}                          -> delete
/// POST   /{id}/close                    -> close
/// POST   /{id}/reopen                   -> reopen
/// GET    /{id}/history                  -> list_history
///
/// GET    /{id}/comments                 -> comment::list
/// POST   /{id}/comments                 -> comment::create
///
/// GET    /{id}/checklists               -> checklist::list
/// POST   /{id}/checklists               -> checklist::create
/// PATCH  /{id}/checklists/{item_id}     -> checklist::update
/// DELETE /{id}/checklists/{item_id}     -> checklist::delete
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(task::list))
        .route("/bulk-update", post(task::bulk_update))
        .route(
            "/{id}",
            get(task::get_by_id).patch(task::update).delete(task::delete),
        )
        .route("/{id}/close", post(task::close))
        .route("/{id}/reopen", post(task::reopen))
        .route("/{id}/history", get(task::list_history))
        .route(
            "/{id}/comments",
            get(comment::list).post(comment::create),
        )
        .route(
            "/{id}/checklists",
            get(checklist::list).post(checklist::create),
        )
        .route(
            "/{id}/checklists/{item_id}",
            patch(checklist::update).delete(checklist::delete),
        )
}

/// Routes mounted at `/departments`.
pub fn department_router() -> Router<AppState> {
    Router::new().route("/{id}/tasks", get(task::department_tasks))
}
