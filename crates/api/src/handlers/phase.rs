//! Handlers for project phases.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use projectflows_core::task::{validate_date_order, validate_name};
use projectflows_core::types::DbId;
use projectflows_db::models::phase::{CreatePhase, Phase};
use projectflows_db::repositories::PhaseRepo;
use serde::Deserialize;

use crate::error::{AppError, AppResult, ValidJson};
use crate::handlers::project::{parse_optional_date, visible_project};
use crate::middleware::auth::CurrentUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreatePhaseRequest {
    pub name: String,
    pub sort_order: Option<i32>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BatchCreatePhasesRequest {
    pub phases: Vec<CreatePhaseRequest>,
}

/// Phases accepted by one batch create.
pub const MAX_BATCH_PHASES: usize = 50;

/// GET /api/projects/{id}/phases
pub async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(project_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Phase>>>> {
    visible_project(&state, &current, project_id).await?;
    let phases = PhaseRepo::list_by_project(&state.pool, project_id).await?;
    Ok(Json(DataResponse::new(phases)))
}

/// POST /api/projects/{id}/phases
pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(project_id): Path<DbId>,
    ValidJson(input): ValidJson<CreatePhaseRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Phase>>)> {
    editable_project(&state, &current, project_id).await?;
    let draft = phase_draft(input)?;
    let phase = PhaseRepo::create(&state.pool, project_id, &draft).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(phase))))
}

/// POST /api/projects/{id}/phases/batch
///
/// All phases are validated before any is written; they are inserted in
/// one transaction.
pub async fn batch_create(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(project_id): Path<DbId>,
    ValidJson(input): ValidJson<BatchCreatePhasesRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Vec<Phase>>>)> {
    editable_project(&state, &current, project_id).await?;
    if input.phases.is_empty() {
        return Err(AppError::validation("At least one phase is required"));
    }
    if input.phases.len() > MAX_BATCH_PHASES {
        return Err(AppError::validation(format!(
            "At most {MAX_BATCH_PHASES} phases can be created at once"
        )));
    }

    let drafts = input
        .phases
        .into_iter()
        .map(phase_draft)
        .collect::<AppResult<Vec<_>>>()?;
    let phases = PhaseRepo::create_many(&state.pool, project_id, &drafts).await?;

    tracing::info!(project_id, created = phases.len(), "Phases created in batch");
    Ok((StatusCode::CREATED, Json(DataResponse::new(phases))))
}

async fn editable_project(state: &AppState, current: &CurrentUser, project_id: DbId) -> AppResult<()> {
    let project = visible_project(state, current, project_id).await?;
    if !current.access().can_edit_project(&project.project_ref()) {
        return Err(AppError::forbidden("add phases to this project"));
    }
    Ok(())
}

fn phase_draft(input: CreatePhaseRequest) -> AppResult<CreatePhase> {
    validate_name("Phase name", &input.name).map_err(AppError::validation)?;
    if input.sort_order.is_some_and(|o| o < 1) {
        return Err(AppError::validation("Sort order must be at least 1"));
    }
    let start_date = parse_optional_date(input.start_date.as_deref())?;
    let end_date = parse_optional_date(input.end_date.as_deref())?;
    validate_date_order(start_date, end_date).map_err(AppError::validation)?;
    Ok(CreatePhase {
        name: input.name.trim().to_string(),
        sort_order: input.sort_order,
        start_date,
        end_date,
    })
}
