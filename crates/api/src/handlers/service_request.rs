//! Handlers for the `/service-requests` resource.
//!
//! A request moves PENDING -> APPROVED (with a linked task) or REJECTED,
//! or is cancelled while still PENDING. Closing the linked task finishes
//! it; see `handlers::task::close`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use projectflows_core::fiscal_year::{available_fiscal_years, fiscal_year_of, parse_fiscal_years};
use projectflows_core::notification as notify_text;
use projectflows_core::notification::{
    TYPE_SERVICE_REQUEST_APPROVED, TYPE_SERVICE_REQUEST_CANCELLED, TYPE_SERVICE_REQUEST_COMMENT,
    TYPE_SERVICE_REQUEST_LOW_RATING, TYPE_SERVICE_REQUEST_REJECTED,
    TYPE_SERVICE_REQUEST_SUBMITTED,
};
use projectflows_core::roles::Role;
use projectflows_core::service_request::{
    approved_task_name, is_low_rating, request_visibility, summarize_feedback, timeline,
    validate_rating, validate_reject_reason, validate_request, validate_request_type,
    FeedbackSummary, RequestDraft, RequestStatus, RequestVisibility, TimelineAction,
    DEFAULT_URGENCY, MAX_REASON_LENGTH,
};
use projectflows_core::task::{dedupe_ids, history, MAX_DESCRIPTION_LENGTH};
use projectflows_core::types::DbId;
use projectflows_db::models::comment::RequestComment;
use projectflows_db::models::notification::NewNotification;
use projectflows_db::models::service_request::{
    ApproveRequest, CreateServiceRequest, Feedback, NewTimeline, RequestTimeline,
    ServiceRequest, ServiceRequestFilter, UpdateServiceRequest,
};
use projectflows_db::models::task::Task;
use projectflows_db::repositories::{
    FeedbackRepo, ProjectRepo, RequestCommentRepo, ServiceRequestRepo, StatusRepo, UserRepo,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult, ValidJson};
use crate::middleware::auth::CurrentUser;
use crate::middleware::rbac::RequireAdmin;
use crate::notify;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct RequestListParams {
    #[serde(rename = "type")]
    pub request_type: Option<String>,
    pub status: Option<String>,
    /// Comma-separated Buddhist-era years, e.g. `2568,2567`.
    pub fiscal_years: Option<String>,
    pub search: Option<String>,
    #[serde(default)]
    pub my_requests: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateRequestBody {
    #[serde(rename = "type")]
    pub request_type: String,
    pub subject: String,
    pub description: String,
    pub urgency: Option<String>,
    #[serde(default)]
    pub purposes: Vec<String>,
    pub other_purpose: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateRequestBody {
    pub subject: Option<String>,
    pub description: Option<String>,
    pub urgency: Option<String>,
    pub purposes: Option<Vec<String>>,
    pub other_purpose: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApproveBody {
    pub project_id: DbId,
    pub task_name: Option<String>,
    pub task_description: Option<String>,
    #[serde(default)]
    pub assignee_user_ids: Vec<DbId>,
}

#[derive(Debug, Deserialize)]
pub struct RejectBody {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackBody {
    pub rating: i32,
    pub comment: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FeedbackStatsParams {
    #[serde(rename = "type")]
    pub request_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RequestList {
    pub requests: Vec<ServiceRequest>,
    pub available_fiscal_years: Vec<i32>,
}

#[derive(Debug, Serialize)]
pub struct RequestDetail {
    #[serde(flatten)]
    pub request: ServiceRequest,
    pub queue_position: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct Approval {
    pub request: ServiceRequest,
    pub task: Task,
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

/// GET /api/service-requests
///
/// ADMIN sees every request, CHIEF their mission group, LEADER their
/// division, everyone else their department. `my_requests` narrows to
/// the caller's own.
pub async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<RequestListParams>,
) -> AppResult<Json<DataResponse<RequestList>>> {
    if let Some(request_type) = &params.request_type {
        validate_request_type(request_type).map_err(AppError::validation)?;
    }
    if let Some(status) = &params.status {
        if RequestStatus::parse(status).is_none() {
            return Err(AppError::validation(format!("Invalid status '{status}'")));
        }
    }
    let fiscal_years = parse_fiscal_years(params.fiscal_years.as_deref().unwrap_or(""))
        .map_err(AppError::validation)?;

    let visibility = request_visibility(current.user.role(), params.my_requests);
    let mut filter = ServiceRequestFilter {
        request_type: params.request_type,
        status: params.status,
        fiscal_years,
        search: params.search.filter(|s| !s.trim().is_empty()),
        ..Default::default()
    };
    match visibility {
        RequestVisibility::Own => filter.requester_user_id = Some(current.id()),
        RequestVisibility::All => {}
        other => filter.requester_department_ids = Some(visible_departments(&current, other)),
    }

    let requests = ServiceRequestRepo::list(&state.pool, &filter).await?;
    Ok(Json(DataResponse::new(RequestList {
        requests,
        available_fiscal_years: available_fiscal_years(&Utc::now()),
    })))
}

/// POST /api/service-requests
///
/// Every active approver other than the requester is notified.
pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    ValidJson(input): ValidJson<CreateRequestBody>,
) -> AppResult<(StatusCode, Json<DataResponse<ServiceRequest>>)> {
    let urgency = input.urgency.unwrap_or_else(|| DEFAULT_URGENCY.to_string());
    let draft = RequestDraft {
        request_type: &input.request_type,
        subject: input.subject.trim(),
        description: input.description.trim(),
        urgency: &urgency,
        purposes: &input.purposes,
        other_purpose: input.other_purpose.as_deref(),
        location: input.location.as_deref(),
    };
    validate_request(&draft).map_err(AppError::validation)?;

    let now = Utc::now();
    let request = ServiceRequestRepo::create(
        &state.pool,
        &CreateServiceRequest {
            request_type: input.request_type.clone(),
            urgency: urgency.clone(),
            subject: draft.subject.to_string(),
            description: draft.description.to_string(),
            purposes: input.purposes.clone(),
            other_purpose: trimmed(input.other_purpose.as_deref()),
            location: trimmed(input.location.as_deref()),
            requester_user_id: current.id(),
            fiscal_year: fiscal_year_of(&now),
        },
        &timeline::created(&current.user.full_name),
    )
    .await?;

    tracing::info!(
        request_id = request.id,
        request_number = %request.request_number,
        requester = current.id(),
        "Service request submitted"
    );

    let approvers = UserRepo::approver_ids(&state.pool, current.id()).await?;
    let message = notify_text::request_submitted(
        &current.user.full_name,
        &request.request_number,
        &request.subject,
    );
    let notifications = approvers
        .into_iter()
        .map(|user_id| {
            NewNotification::request(
                user_id,
                Some(current.id()),
                TYPE_SERVICE_REQUEST_SUBMITTED,
                message.clone(),
                request.id,
            )
        })
        .collect();
    notify::dispatch(&state.pool, notifications).await;

    Ok((StatusCode::CREATED, Json(DataResponse::new(request))))
}

/// GET /api/service-requests/feedback/stats
pub async fn feedback_stats(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(params): Query<FeedbackStatsParams>,
) -> AppResult<Json<DataResponse<FeedbackSummary>>> {
    if let Some(request_type) = &params.request_type {
        validate_request_type(request_type).map_err(AppError::validation)?;
    }
    let counts = FeedbackRepo::rating_counts(&state.pool, params.request_type.as_deref()).await?;
    Ok(Json(DataResponse::new(summarize_feedback(&counts))))
}

// ---------------------------------------------------------------------------
// Single request
// ---------------------------------------------------------------------------

/// GET /api/service-requests/{id}
///
/// PENDING requests carry their position in the queue of the same type.
pub async fn get_by_id(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<RequestDetail>>> {
    let request = visible_request(&state, &current, id).await?;
    let queue_position = ServiceRequestRepo::queue_position(&state.pool, &request).await?;
    Ok(Json(DataResponse::new(RequestDetail {
        request,
        queue_position,
    })))
}

/// PATCH /api/service-requests/{id}
///
/// Only the requester may edit, and only while PENDING.
pub async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<DbId>,
    ValidJson(input): ValidJson<UpdateRequestBody>,
) -> AppResult<Json<DataResponse<ServiceRequest>>> {
    let request = visible_request(&state, &current, id).await?;
    if request.requester_user_id != current.id() {
        return Err(AppError::forbidden("edit this request"));
    }
    ensure_pending(&request)?;

    let subject = input.subject.as_deref().unwrap_or(request.subject.as_str()).trim();
    let description = input
        .description
        .as_deref()
        .unwrap_or(request.description.as_str())
        .trim();
    let urgency = input.urgency.as_deref().unwrap_or(request.urgency.as_str());
    let purposes = input.purposes.as_deref().unwrap_or(request.purposes.as_slice());
    let other_purpose = input
        .other_purpose
        .as_deref()
        .or(request.other_purpose.as_deref());
    let location = input.location.as_deref().or(request.location.as_deref());
    validate_request(&RequestDraft {
        request_type: &request.request_type,
        subject,
        description,
        urgency,
        purposes,
        other_purpose,
        location,
    })
    .map_err(AppError::validation)?;

    let changes = UpdateServiceRequest {
        urgency: input.urgency.clone(),
        subject: input.subject.as_deref().map(|s| s.trim().to_string()),
        description: input.description.as_deref().map(|s| s.trim().to_string()),
        purposes: input.purposes.clone(),
        other_purpose: trimmed(input.other_purpose.as_deref()),
        location: trimmed(input.location.as_deref()),
    };
    let updated = ServiceRequestRepo::update(&state.pool, id, &changes)
        .await?
        .ok_or_else(not_pending)?;
    Ok(Json(DataResponse::new(updated)))
}

/// DELETE /api/service-requests/{id}
///
/// Cancels a PENDING request. The requester or an ADMIN may cancel.
pub async fn cancel(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ServiceRequest>>> {
    let request = visible_request(&state, &current, id).await?;
    let is_requester = request.requester_user_id == current.id();
    if !is_requester && current.user.role() != Role::Admin {
        return Err(AppError::forbidden("cancel this request"));
    }
    ensure_pending(&request)?;

    let cancelled = ServiceRequestRepo::cancel(
        &state.pool,
        id,
        current.id(),
        &timeline::cancelled(&current.user.full_name),
    )
    .await?
    .ok_or_else(not_pending)?;

    tracing::info!(request_id = id, cancelled_by = current.id(), "Service request cancelled");

    if !is_requester {
        notify::dispatch(
            &state.pool,
            vec![NewNotification::request(
                cancelled.requester_user_id,
                Some(current.id()),
                TYPE_SERVICE_REQUEST_CANCELLED,
                notify_text::request_cancelled(&cancelled.request_number),
                id,
            )],
        )
        .await;
    }

    Ok(Json(DataResponse::new(cancelled)))
}

/// POST /api/service-requests/{id}/approve
///
/// Creates the linked task in the chosen project, which must lie inside
/// the approver's scope. The task starts in the project's first
/// NOT_STARTED status.
pub async fn approve(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<DbId>,
    ValidJson(input): ValidJson<ApproveBody>,
) -> AppResult<Json<DataResponse<Approval>>> {
    if !current.access().can_approve_service_requests() {
        return Err(AppError::forbidden("approve service requests"));
    }
    let request = visible_request(&state, &current, id).await?;
    ensure_pending(&request)?;

    let project = ProjectRepo::find_by_id(&state.pool, input.project_id)
        .await?
        .ok_or_else(|| AppError::not_found("Project", input.project_id))?;
    if !current.scope.contains_department(project.department_id) {
        return Err(AppError::forbidden("create tasks in this project"));
    }
    let status = StatusRepo::first_not_started(&state.pool, project.id)
        .await?
        .ok_or_else(|| AppError::conflict("Project has no NOT_STARTED status"))?;

    let assignee_user_ids = dedupe_ids(&input.assignee_user_ids);
    if !assignee_user_ids.is_empty()
        && UserRepo::count_active(&state.pool, &assignee_user_ids).await?
            != assignee_user_ids.len() as i64
    {
        return Err(AppError::validation("Every assignee must be an active user"));
    }

    let task_name = match input.task_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => approved_task_name(&request.request_type, &request.request_number, &request.subject),
    };
    projectflows_core::task::validate_name("Task name", &task_name)
        .map_err(AppError::validation)?;

    let approval = ApproveRequest {
        approver_user_id: current.id(),
        project_id: project.id,
        status_id: status.id,
        task_name: task_name.clone(),
        task_description: input
            .task_description
            .unwrap_or_else(|| request.description.clone()),
        assignee_user_ids,
        history_text: history::created(&task_name),
    };
    let (approved, task) = ServiceRequestRepo::approve(
        &state.pool,
        id,
        &approval,
        &timeline::approved(&current.user.full_name),
        &timeline::task_created(&task_name),
    )
    .await?
    .ok_or_else(not_pending)?;
    ProjectRepo::refresh_progress(&state.pool, project.id).await?;

    tracing::info!(
        request_id = id,
        task_id = task.id,
        project_id = project.id,
        approver = current.id(),
        "Service request approved"
    );

    notify::dispatch(
        &state.pool,
        vec![NewNotification::request(
            approved.requester_user_id,
            Some(current.id()),
            TYPE_SERVICE_REQUEST_APPROVED,
            notify_text::request_approved(&approved.request_number),
            id,
        )],
    )
    .await;

    Ok(Json(DataResponse::new(Approval {
        request: approved,
        task,
    })))
}

/// POST /api/service-requests/{id}/reject
pub async fn reject(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<DbId>,
    ValidJson(input): ValidJson<RejectBody>,
) -> AppResult<Json<DataResponse<ServiceRequest>>> {
    if !current.access().can_approve_service_requests() {
        return Err(AppError::forbidden("reject service requests"));
    }
    let request = visible_request(&state, &current, id).await?;
    ensure_pending(&request)?;
    validate_reject_reason(&input.reason).map_err(AppError::validation)?;
    let reason = input.reason.trim();

    let rejected = ServiceRequestRepo::reject(
        &state.pool,
        id,
        current.id(),
        reason,
        &timeline::rejected(&current.user.full_name, reason),
    )
    .await?
    .ok_or_else(not_pending)?;

    tracing::info!(request_id = id, approver = current.id(), "Service request rejected");

    notify::dispatch(
        &state.pool,
        vec![NewNotification::request(
            rejected.requester_user_id,
            Some(current.id()),
            TYPE_SERVICE_REQUEST_REJECTED,
            notify_text::request_rejected(&rejected.request_number, reason),
            id,
        )],
    )
    .await;

    Ok(Json(DataResponse::new(rejected)))
}

/// GET /api/service-requests/{id}/timeline
pub async fn get_timeline(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<RequestTimeline>>>> {
    visible_request(&state, &current, id).await?;
    let entries = ServiceRequestRepo::timeline(&state.pool, id).await?;
    Ok(Json(DataResponse::new(entries)))
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateRequestCommentRequest {
    pub content: String,
}

/// GET /api/service-requests/{id}/comments
pub async fn list_comments(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<RequestComment>>>> {
    visible_request(&state, &current, id).await?;
    let comments = RequestCommentRepo::list_by_request(&state.pool, id).await?;
    Ok(Json(DataResponse::new(comments)))
}

/// POST /api/service-requests/{id}/comments
///
/// The requester and the approver are notified, except the author.
pub async fn add_comment(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<DbId>,
    ValidJson(input): ValidJson<CreateRequestCommentRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<RequestComment>>)> {
    let request = visible_request(&state, &current, id).await?;

    let content = input.content.trim();
    if content.is_empty() {
        return Err(AppError::validation("Comment must not be empty"));
    }
    if content.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(AppError::validation(format!(
            "Comment must be at most {MAX_DESCRIPTION_LENGTH} characters"
        )));
    }

    let comment = RequestCommentRepo::create(&state.pool, id, current.id(), content).await?;

    let mut recipients = vec![request.requester_user_id];
    recipients.extend(request.approver_user_id);
    let notifications = dedupe_ids(&recipients)
        .into_iter()
        .filter(|user_id| *user_id != current.id())
        .map(|user_id| {
            NewNotification::request(
                user_id,
                Some(current.id()),
                TYPE_SERVICE_REQUEST_COMMENT,
                notify_text::request_comment(&current.user.full_name, &request.request_number),
                id,
            )
        })
        .collect();
    notify::dispatch(&state.pool, notifications).await;

    Ok((StatusCode::CREATED, Json(DataResponse::new(comment))))
}

// ---------------------------------------------------------------------------
// Feedback
// ---------------------------------------------------------------------------

/// GET /api/service-requests/{id}/feedback
pub async fn get_feedback(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Option<Feedback>>>> {
    visible_request(&state, &current, id).await?;
    let feedback = FeedbackRepo::find_by_request(&state.pool, id).await?;
    Ok(Json(DataResponse::new(feedback)))
}

/// POST /api/service-requests/{id}/feedback
///
/// 201 on the first rating, 200 when it replaces an earlier one. A low
/// rating is escalated to every ADMIN.
pub async fn submit_feedback(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<DbId>,
    ValidJson(input): ValidJson<FeedbackBody>,
) -> AppResult<(StatusCode, Json<DataResponse<Feedback>>)> {
    let request = visible_request(&state, &current, id).await?;
    if request.requester_user_id != current.id() {
        return Err(AppError::forbidden("rate this request"));
    }
    if request.status() != Some(RequestStatus::Completed) {
        return Err(AppError::conflict("Only completed requests can be rated"));
    }
    validate_rating(input.rating).map_err(AppError::validation)?;
    let comment = trimmed(input.comment.as_deref());
    if comment
        .as_deref()
        .is_some_and(|c| c.chars().count() > MAX_REASON_LENGTH)
    {
        return Err(AppError::validation(format!(
            "Comment must be at most {MAX_REASON_LENGTH} characters"
        )));
    }

    let (feedback, created) =
        FeedbackRepo::upsert(&state.pool, id, current.id(), input.rating, comment.as_deref())
            .await?;
    let action = if created {
        TimelineAction::FeedbackSubmitted
    } else {
        TimelineAction::FeedbackUpdated
    };
    ServiceRequestRepo::add_timeline(
        &state.pool,
        id,
        &NewTimeline {
            action: action.as_str(),
            description: timeline::feedback(input.rating),
            user_id: Some(current.id()),
        },
    )
    .await?;

    if is_low_rating(input.rating) {
        tracing::warn!(request_id = id, rating = input.rating, "Low service request rating");
        let admins = UserRepo::admin_ids(&state.pool).await?;
        let notifications = admins
            .into_iter()
            .map(|user_id| {
                NewNotification::request(
                    user_id,
                    Some(current.id()),
                    TYPE_SERVICE_REQUEST_LOW_RATING,
                    notify_text::low_rating(&request.request_number, input.rating),
                    id,
                )
            })
            .collect();
        notify::dispatch(&state.pool, notifications).await;
    }

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(DataResponse::new(feedback))))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Departments whose members' requests `visibility` reveals.
fn visible_departments(current: &CurrentUser, visibility: RequestVisibility) -> Vec<DbId> {
    let Some(home) = current.user.department_id else {
        return Vec::new();
    };
    let h = &current.hierarchy;
    match visibility {
        RequestVisibility::MissionGroup => h
            .mission_group_of(home)
            .map(|mg| {
                h.divisions_in(mg)
                    .iter()
                    .flat_map(|div| h.departments_in(*div).iter().copied())
                    .collect()
            })
            .unwrap_or_default(),
        RequestVisibility::Division => h
            .division_of(home)
            .map(|div| h.departments_in(div).to_vec())
            .unwrap_or_default(),
        _ => vec![home],
    }
}

/// Load a request the caller may see under the list visibility rules.
/// The requester and the approver always see it.
async fn visible_request(
    state: &AppState,
    current: &CurrentUser,
    id: DbId,
) -> AppResult<ServiceRequest> {
    let request = ServiceRequestRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Service request", id))?;
    if request.requester_user_id == current.id() || request.approver_user_id == Some(current.id()) {
        return Ok(request);
    }

    let visible = match request_visibility(current.user.role(), false) {
        RequestVisibility::All => true,
        RequestVisibility::Own => false,
        other => {
            let departments = visible_departments(current, other);
            UserRepo::find_by_id(&state.pool, request.requester_user_id)
                .await?
                .and_then(|u| u.department_id)
                .is_some_and(|dept| departments.contains(&dept))
        }
    };
    if !visible {
        return Err(AppError::forbidden("view this request"));
    }
    Ok(request)
}

fn ensure_pending(request: &ServiceRequest) -> AppResult<()> {
    if request.status() == Some(RequestStatus::Pending) {
        Ok(())
    } else {
        Err(AppError::conflict(format!(
            "Request {} is {} and can no longer be changed",
            request.request_number, request.status
        )))
    }
}

fn not_pending() -> AppError {
    AppError::conflict("Request is no longer pending")
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
