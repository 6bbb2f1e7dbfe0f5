//! Handlers for the caller's pinned tasks.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use projectflows_core::types::DbId;
use projectflows_db::models::project::Project;
use projectflows_db::models::task::{PinnedTask, Task};
use projectflows_db::repositories::{PinnedTaskRepo, ProjectRepo};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult, ValidJson};
use crate::handlers::task::visible_task;
use crate::middleware::auth::CurrentUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PinTaskRequest {
    pub task_id: DbId,
}

#[derive(Debug, Serialize)]
pub struct PinnedTaskList {
    pub tasks: Vec<PinnedTask>,
    pub total: usize,
}

/// GET /api/users/me/pinned-tasks
///
/// Pins on tasks the caller can no longer see are left out.
pub async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<DataResponse<PinnedTaskList>>> {
    let pinned = PinnedTaskRepo::list_for_user(&state.pool, current.id()).await?;

    let mut project_ids: Vec<DbId> = pinned.iter().map(|p| p.task.project_id).collect();
    project_ids.sort_unstable();
    project_ids.dedup();
    let projects: HashMap<DbId, Project> = ProjectRepo::list_by_ids(&state.pool, &project_ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let access = current.access();
    let tasks: Vec<PinnedTask> = pinned
        .into_iter()
        .filter(|p| {
            projects
                .get(&p.task.project_id)
                .is_some_and(|project| access.can_view_task(&p.task.task_ref(project.project_ref())))
        })
        .collect();
    let total = tasks.len();
    Ok(Json(DataResponse::new(PinnedTaskList { tasks, total })))
}

/// POST /api/users/me/pinned-tasks
pub async fn pin(
    State(state): State<AppState>,
    current: CurrentUser,
    ValidJson(input): ValidJson<PinTaskRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Task>>)> {
    let (task, _) = visible_task(&state, &current, input.task_id).await?;
    if PinnedTaskRepo::is_pinned(&state.pool, current.id(), task.id).await? {
        return Err(AppError::conflict("Task is already pinned"));
    }
    PinnedTaskRepo::pin(&state.pool, current.id(), task.id).await?;

    tracing::debug!(task_id = task.id, user_id = current.id(), "Task pinned");
    Ok((StatusCode::CREATED, Json(DataResponse::new(task))))
}

/// DELETE /api/users/me/pinned-tasks/{task_id}
pub async fn unpin(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(task_id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !PinnedTaskRepo::unpin(&state.pool, current.id(), task_id).await? {
        return Err(AppError::not_found("Pinned task", task_id));
    }
    Ok(StatusCode::NO_CONTENT)
}
