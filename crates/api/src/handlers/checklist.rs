//! Handlers for task checklist items.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use projectflows_core::task::validate_name;
use projectflows_core::types::DbId;
use projectflows_db::models::checklist::{ChecklistItem, UpdateChecklistItem};
use projectflows_db::repositories::ChecklistRepo;
use serde::Deserialize;

use crate::error::{AppError, AppResult, ValidJson};
use crate::handlers::task::visible_task;
use crate::middleware::auth::CurrentUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateChecklistRequest {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateChecklistRequest {
    pub name: Option<String>,
    pub is_checked: Option<bool>,
    pub sort_order: Option<i32>,
}

/// GET /api/tasks/{id}/checklists
pub async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(task_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<ChecklistItem>>>> {
    visible_task(&state, &current, task_id).await?;
    let items = ChecklistRepo::list_by_task(&state.pool, task_id).await?;
    Ok(Json(DataResponse::new(items)))
}

/// POST /api/tasks/{id}/checklists
pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(task_id): Path<DbId>,
    ValidJson(input): ValidJson<CreateChecklistRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<ChecklistItem>>)> {
    editable_task(&state, &current, task_id).await?;
    validate_name("Checklist item", &input.name).map_err(AppError::validation)?;

    let item = ChecklistRepo::create(&state.pool, task_id, input.name.trim(), current.id()).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(item))))
}

/// PATCH /api/tasks/{id}/checklists/{item_id}
pub async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((task_id, item_id)): Path<(DbId, DbId)>,
    ValidJson(input): ValidJson<UpdateChecklistRequest>,
) -> AppResult<Json<DataResponse<ChecklistItem>>> {
    editable_task(&state, &current, task_id).await?;
    task_item(&state, task_id, item_id).await?;
    if let Some(name) = &input.name {
        validate_name("Checklist item", name).map_err(AppError::validation)?;
    }

    let changes = UpdateChecklistItem {
        name: input.name.map(|n| n.trim().to_string()),
        is_checked: input.is_checked,
        sort_order: input.sort_order,
    };
    let item = ChecklistRepo::update(&state.pool, item_id, &changes)
        .await?
        .ok_or_else(|| AppError::not_found("Checklist item", item_id))?;
    Ok(Json(DataResponse::new(item)))
}

/// DELETE /api/tasks/{id}/checklists/{item_id}
pub async fn delete(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((task_id, item_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    editable_task(&state, &current, task_id).await?;
    task_item(&state, task_id, item_id).await?;

    if ChecklistRepo::soft_delete(&state.pool, item_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("Checklist item", item_id))
    }
}

async fn editable_task(state: &AppState, current: &CurrentUser, task_id: DbId) -> AppResult<()> {
    let (task, project) = visible_task(state, current, task_id).await?;
    if !current.access().can_edit_task(&task.task_ref(project.project_ref())) {
        return Err(AppError::forbidden("edit the checklist of this task"));
    }
    Ok(())
}

async fn task_item(state: &AppState, task_id: DbId, item_id: DbId) -> AppResult<ChecklistItem> {
    ChecklistRepo::find_by_id(&state.pool, item_id)
        .await?
        .filter(|item| item.task_id == task_id)
        .ok_or_else(|| AppError::not_found("Checklist item", item_id))
}
