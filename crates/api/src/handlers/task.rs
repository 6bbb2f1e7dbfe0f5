//! Handlers for tasks: CRUD, close / reopen, history and bulk update.
//!
//! Every mutation recomputes the owning project's progress and notifies
//! the affected users once the change has committed.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use projectflows_core::notification as notify_text;
use projectflows_core::notification::{
    TYPE_SERVICE_REQUEST_CANCELLED, TYPE_SERVICE_REQUEST_COMPLETED, TYPE_TASK_ASSIGNED,
    TYPE_TASK_CLOSED, TYPE_TASK_REOPENED,
};
use projectflows_core::service_request::{timeline, RequestStatus};
use projectflows_core::task::{
    assignment_recipients, close_recipients, dedupe_ids, history, validate_bulk_task_ids,
    validate_date_order, validate_description, validate_difficulty, validate_name,
    validate_priority, AssigneeDiff, CloseType, DEFAULT_PRIORITY,
};
use projectflows_core::pagination::{clamp_limit, clamp_page, offset_for, PageMeta};
use projectflows_core::types::{DbId, Timestamp};
use projectflows_db::models::history::History;
use projectflows_db::models::notification::NewNotification;
use projectflows_db::models::project::Project;
use projectflows_db::models::status::Status;
use projectflows_db::models::task::{
    BulkTaskChanges, CloseTask, CreateTask, Task, TaskChanges, TaskFilter, TaskListItem, TaskQuery,
};
use projectflows_db::models::user::UserSummary;
use projectflows_db::repositories::{
    HistoryRepo, PhaseRepo, ProjectRepo, StatusRepo, TaskRepo, UserRepo,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult, ValidJson};
use crate::handlers::project::{parse_optional_date, visible_project};
use crate::middleware::auth::CurrentUser;
use crate::notify;
use crate::query::double_option;
use crate::response::{DataResponse, PageResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct TaskListParams {
    pub status_id: Option<DbId>,
    pub assignee_user_id: Option<DbId>,
    pub parent_task_id: Option<DbId>,
    #[serde(default)]
    pub include_closed: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct TaskSearchParams {
    pub project_id: Option<DbId>,
    pub status_id: Option<DbId>,
    pub assignee_user_id: Option<DbId>,
    pub priority: Option<i32>,
    pub is_closed: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DepartmentTaskParams {
    #[serde(default)]
    pub include_closed: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub name: String,
    pub description: Option<String>,
    pub status_id: Option<DbId>,
    pub priority: Option<i32>,
    pub difficulty: Option<i32>,
    pub parent_task_id: Option<DbId>,
    pub phase_id: Option<DbId>,
    pub start_date: Option<String>,
    pub due_date: Option<String>,
    #[serde(default)]
    pub assignee_user_ids: Vec<DbId>,
}

/// PATCH body. `null` clears a nullable field; a missing key leaves it alone.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTaskRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub status_id: Option<DbId>,
    pub priority: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    pub difficulty: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub parent_task_id: Option<Option<DbId>>,
    #[serde(default, deserialize_with = "double_option")]
    pub phase_id: Option<Option<DbId>>,
    #[serde(default, deserialize_with = "double_option")]
    pub start_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<String>>,
    pub assignee_user_ids: Option<Vec<DbId>>,
}

#[derive(Debug, Deserialize)]
pub struct CloseTaskRequest {
    #[serde(rename = "type")]
    pub close_type: CloseType,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkUpdateRequest {
    pub task_ids: Vec<DbId>,
    pub status_id: Option<DbId>,
    pub priority: Option<i32>,
    pub difficulty: Option<i32>,
    pub due_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BulkUpdateResult {
    pub updated: u64,
}

#[derive(Debug, Serialize)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: Task,
    pub project_name: String,
    pub status: Option<Status>,
    pub assignees: Vec<UserSummary>,
}

// ---------------------------------------------------------------------------
// Cross-project list
// ---------------------------------------------------------------------------

/// GET /api/tasks
///
/// Tasks the caller can see across projects, newest first. Naming a
/// project the caller cannot see is refused rather than returning nothing.
pub async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<TaskSearchParams>,
) -> AppResult<Json<PageResponse<TaskListItem>>> {
    if let Some(project_id) = params.project_id {
        visible_project(&state, &current, project_id).await?;
    }
    if let Some(priority) = params.priority {
        validate_priority(priority).map_err(AppError::validation)?;
    }
    let page = clamp_page(params.page);
    let limit = clamp_limit(params.limit);

    let query = TaskQuery {
        department_ids: (!current.scope.is_admin).then(|| current.scope.department_list()),
        viewer_id: current.id(),
        project_id: params.project_id,
        status_id: params.status_id,
        assignee_user_id: params.assignee_user_id,
        priority: params.priority,
        is_closed: params.is_closed,
        limit,
        offset: offset_for(page, limit),
    };
    let tasks = TaskRepo::list(&state.pool, &query).await?;
    let total = TaskRepo::count(&state.pool, &query).await?;
    Ok(Json(PageResponse::new(tasks, PageMeta::new(page, limit, total))))
}

// ---------------------------------------------------------------------------
// Project task collection
// ---------------------------------------------------------------------------

/// GET /api/projects/{id}/tasks
pub async fn list_by_project(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(project_id): Path<DbId>,
    Query(params): Query<TaskListParams>,
) -> AppResult<Json<DataResponse<Vec<Task>>>> {
    visible_project(&state, &current, project_id).await?;
    let filter = TaskFilter {
        status_id: params.status_id,
        assignee_user_id: params.assignee_user_id,
        include_closed: params.include_closed,
        parent_task_id: params.parent_task_id,
    };
    let tasks = TaskRepo::list_by_project(&state.pool, project_id, &filter).await?;
    Ok(Json(DataResponse::new(tasks)))
}

/// POST /api/projects/{id}/tasks
///
/// Without an explicit status the task starts in the project's first
/// NOT_STARTED status.
pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(project_id): Path<DbId>,
    ValidJson(input): ValidJson<CreateTaskRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Task>>)> {
    let project = visible_project(&state, &current, project_id).await?;
    if !current.access().can_create_task(&project.project_ref()) {
        return Err(AppError::forbidden("create tasks in this project"));
    }

    validate_name("Task name", &input.name).map_err(AppError::validation)?;
    if let Some(description) = &input.description {
        validate_description(description).map_err(AppError::validation)?;
    }
    let priority = input.priority.unwrap_or(DEFAULT_PRIORITY);
    validate_priority(priority).map_err(AppError::validation)?;
    if let Some(difficulty) = input.difficulty {
        validate_difficulty(difficulty).map_err(AppError::validation)?;
    }
    let start_date = parse_optional_date(input.start_date.as_deref())?;
    let due_date = parse_optional_date(input.due_date.as_deref())?;
    validate_date_order(start_date, due_date).map_err(AppError::validation)?;

    let status_id = match input.status_id {
        Some(id) => project_status(&state, project_id, id).await?.id,
        None => StatusRepo::initial_status(&state.pool, project_id)
            .await?
            .ok_or_else(|| AppError::conflict("Project has no statuses"))?
            .id,
    };
    if let Some(parent_id) = input.parent_task_id {
        parent_in_project(&state, project_id, parent_id, None).await?;
    }
    if let Some(phase_id) = input.phase_id {
        phase_in_project(&state, project_id, phase_id).await?;
    }
    let assignee_user_ids = dedupe_ids(&input.assignee_user_ids);
    ensure_active_users(&state, &assignee_user_ids).await?;

    let name = input.name.trim().to_string();
    let task = TaskRepo::create(
        &state.pool,
        &CreateTask {
            project_id,
            name: name.clone(),
            description: input.description,
            status_id,
            priority,
            difficulty: input.difficulty,
            creator_user_id: current.id(),
            parent_task_id: input.parent_task_id,
            phase_id: input.phase_id,
            start_date,
            due_date,
            assignee_user_ids: assignee_user_ids.clone(),
        },
        &history::created(&name),
    )
    .await?;
    ProjectRepo::refresh_progress(&state.pool, project_id).await?;

    tracing::info!(task_id = task.id, project_id, created_by = current.id(), "Task created");

    let diff = AssigneeDiff::compute(&[], &assignee_user_ids);
    let notifications = assignment_recipients(&diff, current.id(), current.id())
        .into_iter()
        .map(|user_id| {
            NewNotification::task(
                user_id,
                current.id(),
                TYPE_TASK_ASSIGNED,
                notify_text::task_assigned(&current.user.full_name, &task.name),
                task.id,
            )
        })
        .collect();
    notify::dispatch(&state.pool, notifications).await;

    Ok((StatusCode::CREATED, Json(DataResponse::new(task))))
}

// ---------------------------------------------------------------------------
// Single task
// ---------------------------------------------------------------------------

/// GET /api/tasks/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<TaskDetail>>> {
    let (task, project) = visible_task(&state, &current, id).await?;
    let status = StatusRepo::find_by_id(&state.pool, task.status_id).await?;
    let assignees = UserRepo::summaries_by_ids(&state.pool, &task.assignee_user_ids).await?;
    Ok(Json(DataResponse::new(TaskDetail {
        task,
        project_name: project.name,
        status,
        assignees,
    })))
}

/// PATCH /api/tasks/{id}
///
/// Each changed field is written to the task history. Replacing the
/// assignee list additionally requires assign rights.
pub async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<DbId>,
    ValidJson(input): ValidJson<UpdateTaskRequest>,
) -> AppResult<Json<DataResponse<Task>>> {
    let (task, project) = visible_task(&state, &current, id).await?;
    let task_ref = task.task_ref(project.project_ref());
    if !current.access().can_edit_task(&task_ref) {
        return Err(AppError::forbidden("edit this task"));
    }
    if task.is_closed {
        return Err(AppError::conflict("Closed tasks must be reopened before editing"));
    }

    let mut changes = TaskChanges::from(&task);
    let mut histories = Vec::new();

    if let Some(name) = input.name {
        validate_name("Task name", &name).map_err(AppError::validation)?;
        let name = name.trim().to_string();
        if name != task.name {
            histories.push(history::renamed(&task.name, &name));
            changes.name = name;
        }
    }
    if let Some(description) = input.description {
        if let Some(text) = &description {
            validate_description(text).map_err(AppError::validation)?;
        }
        if description != task.description {
            histories.push(history::description_changed(&changes.name));
            changes.description = description;
        }
    }
    if let Some(status_id) = input.status_id.filter(|s| *s != task.status_id) {
        let next = project_status(&state, project.id, status_id).await?;
        let previous = StatusRepo::find_by_id(&state.pool, task.status_id)
            .await?
            .map(|s| s.name)
            .unwrap_or_default();
        histories.push(history::status_changed(&changes.name, &previous, &next.name));
        changes.status_id = next.id;
    }
    if let Some(priority) = input.priority.filter(|p| *p != task.priority) {
        validate_priority(priority).map_err(AppError::validation)?;
        histories.push(history::priority_changed(&changes.name, priority));
        changes.priority = priority;
    }
    if let Some(difficulty) = input.difficulty.filter(|d| *d != task.difficulty) {
        if let Some(d) = difficulty {
            validate_difficulty(d).map_err(AppError::validation)?;
            histories.push(history::difficulty_changed(&changes.name, d));
        }
        changes.difficulty = difficulty;
    }
    if let Some(parent) = input.parent_task_id.filter(|p| *p != task.parent_task_id) {
        if let Some(parent_id) = parent {
            parent_in_project(&state, project.id, parent_id, Some(task.id)).await?;
        }
        changes.parent_task_id = parent;
    }
    if let Some(phase) = input.phase_id.filter(|p| *p != task.phase_id) {
        if let Some(phase_id) = phase {
            phase_in_project(&state, project.id, phase_id).await?;
        }
        changes.phase_id = phase;
    }
    if let Some(start) = input.start_date {
        let start = parse_optional_date(start.as_deref())?;
        if start != task.start_date {
            histories.push(history::start_date_changed(&changes.name, format_date(start).as_deref()));
            changes.start_date = start;
        }
    }
    if let Some(due) = input.due_date {
        let due = parse_optional_date(due.as_deref())?;
        if due != task.due_date {
            histories.push(history::due_date_changed(&changes.name, format_date(due).as_deref()));
            changes.due_date = due;
        }
    }
    validate_date_order(changes.start_date, changes.due_date).map_err(AppError::validation)?;

    let diff = match input.assignee_user_ids {
        Some(requested) => {
            let diff = AssigneeDiff::compute(&task.assignee_user_ids, &requested);
            if diff.is_empty() {
                None
            } else {
                if !current.access().can_assign_task(&task_ref) {
                    return Err(AppError::forbidden("change the assignees of this task"));
                }
                ensure_active_users(&state, &diff.added).await?;
                Some(diff)
            }
        }
        None => None,
    };
    let mut added_names = Vec::new();
    if let Some(diff) = &diff {
        added_names = user_names(&state, &diff.added).await?;
        let removed_names = user_names(&state, &diff.removed).await?;
        if !added_names.is_empty() {
            histories.push(history::assigned(&changes.name, &added_names));
        }
        if !removed_names.is_empty() {
            histories.push(history::unassigned(&changes.name, &removed_names));
        }
    }

    let updated = TaskRepo::update(&state.pool, id, &changes, diff.as_ref(), current.id(), &histories)
        .await?
        .ok_or_else(|| AppError::not_found("Task", id))?;
    ProjectRepo::refresh_progress(&state.pool, project.id).await?;

    if let Some(diff) = &diff {
        let actor_name = &current.user.full_name;
        let notifications = assignment_recipients(diff, current.id(), updated.creator_user_id)
            .into_iter()
            .map(|user_id| {
                let message = if diff.added.contains(&user_id) {
                    notify_text::task_assigned(actor_name, &updated.name)
                } else {
                    notify_text::task_reassigned(actor_name, &updated.name, &added_names)
                };
                NewNotification::task(user_id, current.id(), TYPE_TASK_ASSIGNED, message, updated.id)
            })
            .collect();
        notify::dispatch(&state.pool, notifications).await;
    }

    Ok(Json(DataResponse::new(updated)))
}

/// DELETE /api/tasks/{id}
///
/// Subtasks are deleted with their parent.
pub async fn delete(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let (task, project) = visible_task(&state, &current, id).await?;
    if !current.access().can_delete_task(&task.task_ref(project.project_ref())) {
        return Err(AppError::forbidden("delete this task"));
    }

    if !TaskRepo::soft_delete(&state.pool, id, current.id(), &history::deleted(&task.name)).await? {
        return Err(AppError::not_found("Task", id));
    }
    ProjectRepo::refresh_progress(&state.pool, project.id).await?;

    tracing::info!(task_id = id, project_id = project.id, deleted_by = current.id(), "Task deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/tasks/{id}/close
///
/// Closing a task created from a service request finishes that request:
/// COMPLETED completes it, ABORTED cancels it.
pub async fn close(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<DbId>,
    ValidJson(input): ValidJson<CloseTaskRequest>,
) -> AppResult<Json<DataResponse<Task>>> {
    let (task, project) = visible_task(&state, &current, id).await?;
    if !current.access().can_close_task(&task.task_ref(project.project_ref())) {
        return Err(AppError::forbidden("close this task"));
    }
    if task.is_closed {
        return Err(AppError::conflict("Task is already closed"));
    }

    let request_timeline_text = match input.close_type {
        CloseType::Completed => timeline::task_completed(&task.name),
        CloseType::Aborted => timeline::task_aborted(&task.name),
    };
    let closed = TaskRepo::close(
        &state.pool,
        id,
        &CloseTask {
            close_type: input.close_type,
            closed_by_user_id: current.id(),
            history_text: history::closed(&task.name, input.close_type, input.reason.as_deref()),
            request_timeline_text,
        },
    )
    .await?
    .ok_or_else(|| AppError::conflict("Task is already closed"))?;
    ProjectRepo::refresh_progress(&state.pool, project.id).await?;

    tracing::info!(
        task_id = id,
        close_type = input.close_type.as_str(),
        closed_by = current.id(),
        "Task closed"
    );

    let completed = input.close_type == CloseType::Completed;
    let mut notifications: Vec<NewNotification> = close_recipients(
        current.id(),
        closed.task.creator_user_id,
        closed.task.assignee_user_id,
    )
    .into_iter()
    .map(|user_id| {
        NewNotification::task(
            user_id,
            current.id(),
            TYPE_TASK_CLOSED,
            notify_text::task_closed(&current.user.full_name, &closed.task.name, completed),
            id,
        )
    })
    .collect();
    if let Some(request) = &closed.finished_request {
        let (kind, message) = match request.status() {
            Some(RequestStatus::Completed) => (
                TYPE_SERVICE_REQUEST_COMPLETED,
                notify_text::request_completed(&request.request_number),
            ),
            _ => (
                TYPE_SERVICE_REQUEST_CANCELLED,
                notify_text::request_cancelled(&request.request_number),
            ),
        };
        notifications.push(NewNotification::request(
            request.requester_user_id,
            Some(current.id()),
            kind,
            message,
            request.id,
        ));
    }
    notify::dispatch(&state.pool, notifications).await;

    Ok(Json(DataResponse::new(closed.task)))
}

/// POST /api/tasks/{id}/reopen
///
/// A service request finished by closing this task stays finished.
pub async fn reopen(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Task>>> {
    let (task, project) = visible_task(&state, &current, id).await?;
    if !current.access().can_close_task(&task.task_ref(project.project_ref())) {
        return Err(AppError::forbidden("reopen this task"));
    }
    if !task.is_closed {
        return Err(AppError::conflict("Task is not closed"));
    }

    let reopened = TaskRepo::reopen(&state.pool, id, current.id(), &history::reopened(&task.name))
        .await?
        .ok_or_else(|| AppError::conflict("Task is not closed"))?;
    ProjectRepo::refresh_progress(&state.pool, project.id).await?;

    let notifications = close_recipients(
        current.id(),
        reopened.creator_user_id,
        reopened.assignee_user_id,
    )
    .into_iter()
    .map(|user_id| {
        NewNotification::task(
            user_id,
            current.id(),
            TYPE_TASK_REOPENED,
            notify_text::task_reopened(&current.user.full_name, &reopened.name),
            id,
        )
    })
    .collect();
    notify::dispatch(&state.pool, notifications).await;

    Ok(Json(DataResponse::new(reopened)))
}

/// GET /api/tasks/{id}/history
pub async fn list_history(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<History>>>> {
    visible_task(&state, &current, id).await?;
    let entries = HistoryRepo::list_by_task(&state.pool, id).await?;
    Ok(Json(DataResponse::new(entries)))
}

// ---------------------------------------------------------------------------
// Bulk and department views
// ---------------------------------------------------------------------------

/// POST /api/tasks/bulk-update
///
/// All-or-nothing: one missing, closed or non-editable task rejects the batch.
pub async fn bulk_update(
    State(state): State<AppState>,
    current: CurrentUser,
    ValidJson(input): ValidJson<BulkUpdateRequest>,
) -> AppResult<Json<DataResponse<BulkUpdateResult>>> {
    validate_bulk_task_ids(&input.task_ids).map_err(AppError::validation)?;
    let ids = dedupe_ids(&input.task_ids);

    let changes = BulkTaskChanges {
        status_id: input.status_id,
        priority: input.priority,
        difficulty: input.difficulty,
        due_date: parse_optional_date(input.due_date.as_deref())?,
    };
    if changes.is_empty() {
        return Err(AppError::validation("At least one field to update is required"));
    }
    if let Some(priority) = changes.priority {
        validate_priority(priority).map_err(AppError::validation)?;
    }
    if let Some(difficulty) = changes.difficulty {
        validate_difficulty(difficulty).map_err(AppError::validation)?;
    }

    let tasks = TaskRepo::list_by_ids(&state.pool, &ids).await?;
    if let Some(missing) = ids.iter().find(|id| !tasks.iter().any(|t| t.id == **id)) {
        return Err(AppError::not_found("Task", *missing));
    }

    let mut projects: HashMap<DbId, Project> = HashMap::new();
    for task in &tasks {
        if !projects.contains_key(&task.project_id) {
            let project = ProjectRepo::find_by_id(&state.pool, task.project_id)
                .await?
                .ok_or_else(|| AppError::not_found("Project", task.project_id))?;
            projects.insert(project.id, project);
        }
        let project_ref = projects[&task.project_id].project_ref();
        if !current.access().can_edit_task(&task.task_ref(project_ref)) {
            return Err(AppError::forbidden(&format!("edit task {}", task.id)));
        }
        if task.is_closed {
            return Err(AppError::conflict(format!(
                "Task {} is closed and must be reopened before editing",
                task.id
            )));
        }
    }

    let mut described = Vec::new();
    if let Some(status_id) = changes.status_id {
        let status = StatusRepo::find_by_id(&state.pool, status_id)
            .await?
            .ok_or_else(|| AppError::not_found("Status", status_id))?;
        if tasks.iter().any(|t| t.project_id != status.project_id) {
            return Err(AppError::validation(
                "Status must belong to the project of every selected task",
            ));
        }
        described.push(format!("status \"{}\"", status.name));
    }
    if let Some(priority) = changes.priority {
        described.push(format!("priority {}", projectflows_core::task::priority_label(priority)));
    }
    if let Some(difficulty) = changes.difficulty {
        described.push(format!("difficulty {}", projectflows_core::task::difficulty_label(difficulty)));
    }
    if let Some(date) = format_date(changes.due_date) {
        described.push(format!("due date {date}"));
    }

    let updated = TaskRepo::bulk_update(
        &state.pool,
        &ids,
        &changes,
        current.id(),
        &history::bulk_updated(&described),
    )
    .await?;
    for project_id in projects.keys() {
        ProjectRepo::refresh_progress(&state.pool, *project_id).await?;
    }

    tracing::info!(updated, requested = ids.len(), actor = current.id(), "Bulk task update");
    Ok(Json(DataResponse::new(BulkUpdateResult { updated })))
}

/// GET /api/departments/{id}/tasks
pub async fn department_tasks(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(department_id): Path<DbId>,
    Query(params): Query<DepartmentTaskParams>,
) -> AppResult<Json<DataResponse<Vec<Task>>>> {
    if !current.hierarchy.contains_department(department_id) {
        return Err(AppError::not_found("Department", department_id));
    }
    if !current.scope.contains_department(department_id) {
        return Err(AppError::forbidden("view tasks of this department"));
    }
    let tasks =
        TaskRepo::list_by_department(&state.pool, department_id, params.include_closed).await?;
    Ok(Json(DataResponse::new(tasks)))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Load a live task and its project, checking view access.
pub(crate) async fn visible_task(
    state: &AppState,
    current: &CurrentUser,
    id: DbId,
) -> AppResult<(Task, Project)> {
    let task = TaskRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Task", id))?;
    let project = ProjectRepo::find_by_id(&state.pool, task.project_id)
        .await?
        .ok_or_else(|| AppError::not_found("Task", id))?;
    if !current.access().can_view_task(&task.task_ref(project.project_ref())) {
        return Err(AppError::forbidden("view this task"));
    }
    Ok((task, project))
}

async fn project_status(state: &AppState, project_id: DbId, status_id: DbId) -> AppResult<Status> {
    StatusRepo::find_by_id(&state.pool, status_id)
        .await?
        .filter(|s| s.project_id == project_id)
        .ok_or_else(|| AppError::validation(format!("Status {status_id} does not belong to this project")))
}

async fn parent_in_project(
    state: &AppState,
    project_id: DbId,
    parent_id: DbId,
    child_id: Option<DbId>,
) -> AppResult<()> {
    if child_id == Some(parent_id) {
        return Err(AppError::validation("A task cannot be its own parent"));
    }
    match TaskRepo::find_by_id(&state.pool, parent_id).await? {
        Some(parent) if parent.project_id == project_id => Ok(()),
        _ => Err(AppError::validation(format!(
            "Parent task {parent_id} does not belong to this project"
        ))),
    }
}

async fn phase_in_project(state: &AppState, project_id: DbId, phase_id: DbId) -> AppResult<()> {
    match PhaseRepo::find_by_id(&state.pool, phase_id).await? {
        Some(phase) if phase.project_id == project_id => Ok(()),
        _ => Err(AppError::validation(format!(
            "Phase {phase_id} does not belong to this project"
        ))),
    }
}

async fn ensure_active_users(state: &AppState, ids: &[DbId]) -> AppResult<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let active = UserRepo::count_active(&state.pool, ids).await?;
    if active != ids.len() as i64 {
        return Err(AppError::validation("Every assignee must be an active user"));
    }
    Ok(())
}

/// Full names of `ids`, in the order given.
async fn user_names(state: &AppState, ids: &[DbId]) -> AppResult<Vec<String>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let summaries = UserRepo::summaries_by_ids(&state.pool, ids).await?;
    Ok(ids
        .iter()
        .filter_map(|id| summaries.iter().find(|s| s.id == *id))
        .map(|s| s.full_name.clone())
        .collect())
}

fn format_date(date: Option<Timestamp>) -> Option<String> {
    date.map(|d| d.format("%Y-%m-%d").to_string())
}
