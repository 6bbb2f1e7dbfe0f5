//! Handlers for project board statuses.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use projectflows_core::task::{validate_color, validate_name, StatusType};
use projectflows_core::types::DbId;
use projectflows_db::models::project::Project;
use projectflows_db::models::status::{CreateStatus, Status, UpdateStatus};
use projectflows_db::repositories::{ProjectRepo, StatusRepo};
use serde::Deserialize;

use crate::error::{AppError, AppResult, ValidJson};
use crate::handlers::project::visible_project;
use crate::middleware::auth::CurrentUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateStatusRequest {
    pub name: String,
    pub color: String,
    pub sort_order: Option<i32>,
    pub status_type: StatusType,
}

#[derive(Debug, Deserialize)]
pub struct BatchStatusItem {
    pub name: String,
    pub color: String,
    pub sort_order: i32,
    pub status_type: StatusType,
}

#[derive(Debug, Deserialize)]
pub struct BatchCreateStatusesRequest {
    pub statuses: Vec<BatchStatusItem>,
}

/// Statuses accepted by one batch create.
pub const MAX_BATCH_STATUSES: usize = 50;

#[derive(Debug, Default, Deserialize)]
pub struct UpdateStatusRequest {
    pub name: Option<String>,
    pub color: Option<String>,
    pub sort_order: Option<i32>,
    pub status_type: Option<StatusType>,
}

/// GET /api/projects/{id}/statuses
pub async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(project_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Status>>>> {
    visible_project(&state, &current, project_id).await?;
    let statuses = StatusRepo::list_by_project(&state.pool, project_id).await?;
    Ok(Json(DataResponse::new(statuses)))
}

/// POST /api/projects/{id}/statuses
pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(project_id): Path<DbId>,
    ValidJson(input): ValidJson<CreateStatusRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Status>>)> {
    managed_project(&state, &current, project_id).await?;
    validate_name("Status name", &input.name).map_err(AppError::validation)?;
    validate_color(&input.color).map_err(AppError::validation)?;

    let sort_order = match input.sort_order {
        Some(order) if order < 1 => {
            return Err(AppError::validation("Sort order must be at least 1"));
        }
        Some(order) => order,
        None => StatusRepo::next_sort_order(&state.pool, project_id).await?,
    };

    let status = StatusRepo::create(
        &state.pool,
        project_id,
        &CreateStatus {
            name: input.name.trim().to_string(),
            color: input.color,
            sort_order,
            status_type: input.status_type.as_str().to_string(),
        },
    )
    .await?;
    ProjectRepo::refresh_progress(&state.pool, project_id).await?;

    Ok((StatusCode::CREATED, Json(DataResponse::new(status))))
}

/// POST /api/projects/{id}/statuses/batch
///
/// All statuses are validated before any is written; they are inserted in
/// one transaction.
pub async fn batch_create(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(project_id): Path<DbId>,
    ValidJson(input): ValidJson<BatchCreateStatusesRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Vec<Status>>>)> {
    managed_project(&state, &current, project_id).await?;
    if input.statuses.is_empty() {
        return Err(AppError::validation("At least one status is required"));
    }
    if input.statuses.len() > MAX_BATCH_STATUSES {
        return Err(AppError::validation(format!(
            "At most {MAX_BATCH_STATUSES} statuses can be created at once"
        )));
    }

    let mut drafts = Vec::with_capacity(input.statuses.len());
    for item in input.statuses {
        validate_name("Status name", &item.name).map_err(AppError::validation)?;
        validate_color(&item.color).map_err(AppError::validation)?;
        if item.sort_order < 1 {
            return Err(AppError::validation("Sort order must be at least 1"));
        }
        drafts.push(CreateStatus {
            name: item.name.trim().to_string(),
            color: item.color,
            sort_order: item.sort_order,
            status_type: item.status_type.as_str().to_string(),
        });
    }

    let statuses = StatusRepo::create_many(&state.pool, project_id, &drafts).await?;
    ProjectRepo::refresh_progress(&state.pool, project_id).await?;

    tracing::info!(project_id, created = statuses.len(), "Statuses created in batch");
    Ok((StatusCode::CREATED, Json(DataResponse::new(statuses))))
}

/// PATCH /api/projects/{id}/statuses/{status_id}
///
/// Sort order feeds the progress formula, so progress is recomputed.
pub async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((project_id, status_id)): Path<(DbId, DbId)>,
    ValidJson(input): ValidJson<UpdateStatusRequest>,
) -> AppResult<Json<DataResponse<Status>>> {
    managed_project(&state, &current, project_id).await?;
    project_status(&state, project_id, status_id).await?;

    if let Some(name) = &input.name {
        validate_name("Status name", name).map_err(AppError::validation)?;
    }
    if let Some(color) = &input.color {
        validate_color(color).map_err(AppError::validation)?;
    }
    if input.sort_order.is_some_and(|o| o < 1) {
        return Err(AppError::validation("Sort order must be at least 1"));
    }

    let changes = UpdateStatus {
        name: input.name.map(|n| n.trim().to_string()),
        color: input.color,
        sort_order: input.sort_order,
        status_type: input.status_type.map(|t| t.as_str().to_string()),
    };
    let status = StatusRepo::update(&state.pool, status_id, &changes)
        .await?
        .ok_or_else(|| AppError::not_found("Status", status_id))?;
    ProjectRepo::refresh_progress(&state.pool, project_id).await?;

    Ok(Json(DataResponse::new(status)))
}

/// DELETE /api/projects/{id}/statuses/{status_id}
pub async fn delete(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((project_id, status_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    managed_project(&state, &current, project_id).await?;
    let status = project_status(&state, project_id, status_id).await?;

    let in_use = StatusRepo::task_count(&state.pool, status_id).await?;
    if in_use > 0 {
        return Err(AppError::conflict(format!(
            "Status \"{}\" is used by {in_use} task(s); move them first",
            status.name
        )));
    }

    StatusRepo::delete(&state.pool, status_id).await?;
    ProjectRepo::refresh_progress(&state.pool, project_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn managed_project(
    state: &AppState,
    current: &CurrentUser,
    project_id: DbId,
) -> AppResult<Project> {
    let project = visible_project(state, current, project_id).await?;
    if !current.access().can_manage_statuses(&project.project_ref()) {
        return Err(AppError::forbidden("manage statuses of this project"));
    }
    Ok(project)
}

/// A status of `project_id`; statuses of other projects are reported missing.
async fn project_status(state: &AppState, project_id: DbId, status_id: DbId) -> AppResult<Status> {
    StatusRepo::find_by_id(&state.pool, status_id)
        .await?
        .filter(|s| s.project_id == project_id)
        .ok_or_else(|| AppError::not_found("Status", status_id))
}
