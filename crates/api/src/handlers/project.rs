//! Handlers for the `/projects` resource, including progress and board views.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use projectflows_core::pagination::{clamp_limit, clamp_page, offset_for, PageMeta};
use projectflows_core::progress::ProgressResult;
use projectflows_core::task::{
    dedupe_ids, parse_date_input, validate_batch_project_ids, validate_color,
    validate_date_order, validate_description, validate_name, validate_project_status,
    PROJECT_STATUS_ACTIVE,
};
use projectflows_core::types::{DbId, Timestamp};
use projectflows_db::models::phase::Phase;
use projectflows_db::models::project::{CreateProject, Project, ProjectFilter, UpdateProject};
use projectflows_db::models::status::Status;
use projectflows_db::models::task::{Task, TaskFilter};
use projectflows_db::repositories::{PhaseRepo, ProjectRepo, StatusRepo, TaskRepo, UserRepo};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult, ValidJson};
use crate::middleware::auth::CurrentUser;
use crate::query::double_option;
use crate::response::{DataResponse, PageResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ProjectListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub department_id: Option<DbId>,
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: Option<String>,
    pub department_id: DbId,
    pub owner_user_id: Option<DbId>,
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub color: Option<String>,
}

/// Nullable fields take an explicit `null` to clear them.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub department_id: Option<DbId>,
    pub owner_user_id: Option<DbId>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub start_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub end_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub color: Option<Option<String>>,
}

#[derive(Debug, Deserialize)]
pub struct BatchProgressRequest {
    pub project_ids: Vec<DbId>,
}

#[derive(Debug, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub statuses: Vec<Status>,
    pub phases: Vec<Phase>,
}

#[derive(Debug, Serialize)]
pub struct ProjectProgress {
    pub project_id: DbId,
    #[serde(flatten)]
    pub progress: ProgressResult,
}

#[derive(Debug, Serialize)]
pub struct BoardColumn {
    pub status: Status,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Serialize)]
pub struct Board {
    pub project: Project,
    pub columns: Vec<BoardColumn>,
    pub closed_tasks: Vec<Task>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/projects
///
/// Projects in the caller's departments plus the ones they own.
pub async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<ProjectListParams>,
) -> AppResult<Json<PageResponse<Project>>> {
    let page = clamp_page(params.page);
    let limit = clamp_limit(params.limit);

    let department_ids = match params.department_id {
        Some(dept) if current.scope.contains_department(dept) => Some(vec![dept]),
        Some(_) => Some(Vec::new()),
        None if current.scope.is_admin => None,
        None => Some(current.scope.department_list()),
    };

    let filter = ProjectFilter {
        department_ids,
        owner_user_id: params.department_id.is_none().then(|| current.id()),
        status: params.status,
        search: params.search.filter(|s| !s.trim().is_empty()),
        limit,
        offset: offset_for(page, limit),
    };

    let projects = ProjectRepo::list(&state.pool, &filter).await?;
    let total = ProjectRepo::count(&state.pool, &filter).await?;
    Ok(Json(PageResponse::new(projects, PageMeta::new(page, limit, total))))
}

/// POST /api/projects
///
/// New projects start with the default Todo / In Progress / Done statuses.
pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    ValidJson(input): ValidJson<CreateProjectRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Project>>)> {
    validate_name("Project name", &input.name).map_err(AppError::validation)?;
    if let Some(description) = &input.description {
        validate_description(description).map_err(AppError::validation)?;
    }
    if let Some(color) = &input.color {
        validate_color(color).map_err(AppError::validation)?;
    }
    let status = input.status.unwrap_or_else(|| PROJECT_STATUS_ACTIVE.to_string());
    validate_project_status(&status).map_err(AppError::validation)?;
    let start_date = parse_optional_date(input.start_date.as_deref())?;
    let end_date = parse_optional_date(input.end_date.as_deref())?;
    validate_date_order(start_date, end_date).map_err(AppError::validation)?;

    if !current.hierarchy.contains_department(input.department_id) {
        return Err(AppError::not_found("Department", input.department_id));
    }
    if !current.access().can_create_project(input.department_id) {
        return Err(AppError::forbidden("create projects in this department"));
    }

    let owner_user_id = input.owner_user_id.unwrap_or(current.id());
    ensure_active_user(&state, owner_user_id).await?;

    let project = ProjectRepo::create(
        &state.pool,
        &CreateProject {
            name: input.name.trim().to_string(),
            description: input.description,
            department_id: input.department_id,
            owner_user_id,
            created_by: current.id(),
            status,
            start_date,
            end_date,
            color: input.color,
        },
    )
    .await?;

    tracing::info!(project_id = project.id, department_id = project.department_id, created_by = current.id(), "Project created");
    Ok((StatusCode::CREATED, Json(DataResponse::new(project))))
}

/// GET /api/projects/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ProjectDetail>>> {
    let project = visible_project(&state, &current, id).await?;
    let statuses = StatusRepo::list_by_project(&state.pool, id).await?;
    let phases = PhaseRepo::list_by_project(&state.pool, id).await?;
    Ok(Json(DataResponse::new(ProjectDetail {
        project,
        statuses,
        phases,
    })))
}

/// PATCH /api/projects/{id}
pub async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<DbId>,
    ValidJson(input): ValidJson<UpdateProjectRequest>,
) -> AppResult<Json<DataResponse<Project>>> {
    let project = visible_project(&state, &current, id).await?;
    if !current.access().can_edit_project(&project.project_ref()) {
        return Err(AppError::forbidden("edit this project"));
    }

    if let Some(name) = &input.name {
        validate_name("Project name", name).map_err(AppError::validation)?;
    }
    if let Some(Some(description)) = &input.description {
        validate_description(description).map_err(AppError::validation)?;
    }
    if let Some(Some(color)) = &input.color {
        validate_color(color).map_err(AppError::validation)?;
    }
    if let Some(status) = &input.status {
        validate_project_status(status).map_err(AppError::validation)?;
    }
    let start_date = input
        .start_date
        .map(|v| parse_optional_date(v.as_deref()))
        .transpose()?;
    let end_date = input
        .end_date
        .map(|v| parse_optional_date(v.as_deref()))
        .transpose()?;
    validate_date_order(
        start_date.unwrap_or(project.start_date),
        end_date.unwrap_or(project.end_date),
    )
    .map_err(AppError::validation)?;

    if let Some(dept) = input.department_id.filter(|d| *d != project.department_id) {
        if !current.hierarchy.contains_department(dept) {
            return Err(AppError::not_found("Department", dept));
        }
        if !current.access().can_create_project(dept) {
            return Err(AppError::forbidden("move projects into this department"));
        }
    }
    if let Some(owner) = input.owner_user_id {
        ensure_active_user(&state, owner).await?;
    }

    let changes = UpdateProject {
        name: input.name.map(|n| n.trim().to_string()),
        description: input.description,
        department_id: input.department_id,
        owner_user_id: input.owner_user_id,
        status: input.status,
        start_date,
        end_date,
        color: input.color,
    };
    let project = ProjectRepo::update(&state.pool, id, &changes)
        .await?
        .ok_or_else(|| AppError::not_found("Project", id))?;

    Ok(Json(DataResponse::new(project)))
}

/// DELETE /api/projects/{id}
pub async fn delete(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let project = visible_project(&state, &current, id).await?;
    if !current.access().can_delete_project(&project.project_ref()) {
        return Err(AppError::forbidden("delete this project"));
    }

    if ProjectRepo::soft_delete(&state.pool, id).await? {
        tracing::info!(project_id = id, deleted_by = current.id(), "Project deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("Project", id))
    }
}

/// GET /api/projects/{id}/progress
pub async fn progress(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ProjectProgress>>> {
    visible_project(&state, &current, id).await?;
    let progress = ProjectRepo::compute_progress(&state.pool, id).await?;
    Ok(Json(DataResponse::new(ProjectProgress {
        project_id: id,
        progress,
    })))
}

/// POST /api/projects/progress/batch
///
/// Progress for up to 50 projects. Projects the caller cannot see are left out.
pub async fn batch_progress(
    State(state): State<AppState>,
    current: CurrentUser,
    ValidJson(input): ValidJson<BatchProgressRequest>,
) -> AppResult<Json<DataResponse<Vec<ProjectProgress>>>> {
    validate_batch_project_ids(&input.project_ids).map_err(AppError::validation)?;
    let ids = dedupe_ids(&input.project_ids);

    let projects = ProjectRepo::list_by_ids(&state.pool, &ids).await?;
    let mut results = Vec::with_capacity(projects.len());
    for project in projects
        .iter()
        .filter(|p| current.access().can_view_project(&p.project_ref()))
    {
        let progress = ProjectRepo::compute_progress(&state.pool, project.id).await?;
        results.push(ProjectProgress {
            project_id: project.id,
            progress,
        });
    }

    Ok(Json(DataResponse::new(results)))
}

/// GET /api/projects/{id}/board
///
/// Open tasks grouped into one column per status, with closed tasks apart.
pub async fn board(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Board>>> {
    let project = visible_project(&state, &current, id).await?;
    let statuses = StatusRepo::list_by_project(&state.pool, id).await?;
    let filter = TaskFilter {
        include_closed: true,
        ..Default::default()
    };
    let (closed_tasks, mut open): (Vec<Task>, Vec<Task>) =
        TaskRepo::list_by_project(&state.pool, id, &filter)
            .await?
            .into_iter()
            .partition(|t| t.is_closed);

    let columns = statuses
        .into_iter()
        .map(|status| {
            let (tasks, rest): (Vec<Task>, Vec<Task>) =
                open.drain(..).partition(|t| t.status_id == status.id);
            open = rest;
            BoardColumn { status, tasks }
        })
        .collect();

    Ok(Json(DataResponse::new(Board {
        project,
        columns,
        closed_tasks,
    })))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Load a live project the caller may view: 404 when missing, 403 when out of scope.
pub(crate) async fn visible_project(
    state: &AppState,
    current: &CurrentUser,
    id: DbId,
) -> AppResult<Project> {
    let project = ProjectRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Project", id))?;
    if !current.access().can_view_project(&project.project_ref()) {
        return Err(AppError::forbidden("view this project"));
    }
    Ok(project)
}

pub(crate) fn parse_optional_date(value: Option<&str>) -> AppResult<Option<Timestamp>> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(parse_date_input)
        .transpose()
        .map_err(AppError::validation)
}

async fn ensure_active_user(state: &AppState, user_id: DbId) -> AppResult<()> {
    if UserRepo::count_active(&state.pool, &[user_id]).await? == 1 {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "User {user_id} does not exist or is not active"
        )))
    }
}
