//! Handlers for `/organization` (mission groups, divisions, departments)
//! and the `/workspace` overview.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use projectflows_core::roles::Permission;
use projectflows_core::scope::{AccessibleScope, ScopeKind};
use projectflows_core::task::validate_name;
use projectflows_core::types::DbId;
use projectflows_db::models::organization::{
    CreateDepartment, CreateDivision, CreateMissionGroup, Department, Division, MissionGroup,
    UpdateDepartment,
};
use projectflows_db::models::project::Project;
use projectflows_db::repositories::{OrganizationRepo, ProjectRepo};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult, ValidJson};
use crate::middleware::auth::CurrentUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct DivisionNode {
    #[serde(flatten)]
    pub division: Division,
    pub departments: Vec<Department>,
}

#[derive(Debug, Serialize)]
pub struct MissionGroupNode {
    #[serde(flatten)]
    pub mission_group: MissionGroup,
    pub divisions: Vec<DivisionNode>,
}

#[derive(Debug, Serialize)]
pub struct OrganizationTree {
    pub scope_kind: ScopeKind,
    pub mission_groups: Vec<MissionGroupNode>,
}

#[derive(Debug, Serialize)]
pub struct Workspace {
    #[serde(flatten)]
    pub organization: OrganizationTree,
    pub projects: Vec<Project>,
}

#[derive(Debug, Deserialize)]
pub struct DivisionListParams {
    pub mission_group_id: Option<DbId>,
}

#[derive(Debug, Deserialize)]
pub struct DepartmentListParams {
    pub division_id: Option<DbId>,
}

// ---------------------------------------------------------------------------
// Hierarchy
// ---------------------------------------------------------------------------

/// GET /api/organization
///
/// Mission group -> division -> department tree, limited to the caller's scope.
pub async fn hierarchy(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<DataResponse<OrganizationTree>>> {
    let tree = load_tree(&state, &current.scope).await?;
    Ok(Json(DataResponse::new(tree)))
}

/// GET /api/workspace
///
/// The organization tree plus every project the caller can open.
pub async fn workspace(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<DataResponse<Workspace>>> {
    let organization = load_tree(&state, &current.scope).await?;
    let departments = current.scope.department_list();
    let projects = ProjectRepo::list_visible(
        &state.pool,
        (!current.scope.is_admin).then_some(departments.as_slice()),
        current.id(),
    )
    .await?;

    Ok(Json(DataResponse::new(Workspace {
        organization,
        projects,
    })))
}

// ---------------------------------------------------------------------------
// Mission groups
// ---------------------------------------------------------------------------

/// GET /api/organization/mission-groups
pub async fn list_mission_groups(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<DataResponse<Vec<MissionGroup>>>> {
    let groups = OrganizationRepo::list_mission_groups(&state.pool)
        .await?
        .into_iter()
        .filter(|mg| current.scope.contains_mission_group(mg.id))
        .collect();
    Ok(Json(DataResponse::new(groups)))
}

/// POST /api/organization/mission-groups
pub async fn create_mission_group(
    State(state): State<AppState>,
    RequireAdmin(current): RequireAdmin,
    ValidJson(input): ValidJson<CreateMissionGroup>,
) -> AppResult<(StatusCode, Json<DataResponse<MissionGroup>>)> {
    validate_name("Name", &input.name).map_err(AppError::validation)?;
    let group = OrganizationRepo::create_mission_group(&state.pool, &input).await?;
    tracing::info!(mission_group_id = group.id, created_by = current.id(), "Mission group created");
    Ok((StatusCode::CREATED, Json(DataResponse::new(group))))
}

// ---------------------------------------------------------------------------
// Divisions
// ---------------------------------------------------------------------------

/// GET /api/organization/divisions
pub async fn list_divisions(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<DivisionListParams>,
) -> AppResult<Json<DataResponse<Vec<Division>>>> {
    let divisions = OrganizationRepo::list_divisions(&state.pool, params.mission_group_id)
        .await?
        .into_iter()
        .filter(|d| current.scope.contains_division(d.id))
        .collect();
    Ok(Json(DataResponse::new(divisions)))
}

/// POST /api/organization/divisions
pub async fn create_division(
    State(state): State<AppState>,
    RequireAdmin(current): RequireAdmin,
    ValidJson(input): ValidJson<CreateDivision>,
) -> AppResult<(StatusCode, Json<DataResponse<Division>>)> {
    validate_name("Name", &input.name).map_err(AppError::validation)?;
    OrganizationRepo::find_mission_group(&state.pool, input.mission_group_id)
        .await?
        .ok_or_else(|| AppError::not_found("MissionGroup", input.mission_group_id))?;

    let division = OrganizationRepo::create_division(&state.pool, &input).await?;
    tracing::info!(division_id = division.id, created_by = current.id(), "Division created");
    Ok((StatusCode::CREATED, Json(DataResponse::new(division))))
}

// ---------------------------------------------------------------------------
// Departments
// ---------------------------------------------------------------------------

/// GET /api/organization/departments
pub async fn list_departments(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<DepartmentListParams>,
) -> AppResult<Json<DataResponse<Vec<Department>>>> {
    let departments = OrganizationRepo::list_departments(&state.pool, params.division_id)
        .await?
        .into_iter()
        .filter(|d| current.scope.contains_department(d.id))
        .collect();
    Ok(Json(DataResponse::new(departments)))
}

/// POST /api/organization/departments
pub async fn create_department(
    State(state): State<AppState>,
    current: CurrentUser,
    ValidJson(input): ValidJson<CreateDepartment>,
) -> AppResult<(StatusCode, Json<DataResponse<Department>>)> {
    require_manage_departments(&current)?;
    validate_name("Name", &input.name).map_err(AppError::validation)?;
    live_division(&state, &current, input.division_id).await?;

    let department = OrganizationRepo::create_department(&state.pool, &input).await?;
    tracing::info!(department_id = department.id, created_by = current.id(), "Department created");
    Ok((StatusCode::CREATED, Json(DataResponse::new(department))))
}

/// PATCH /api/organization/departments/{id}
pub async fn update_department(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<DbId>,
    ValidJson(input): ValidJson<UpdateDepartment>,
) -> AppResult<Json<DataResponse<Department>>> {
    require_manage_departments(&current)?;
    if !current.scope.contains_department(id) {
        return Err(AppError::forbidden("manage this department"));
    }
    if let Some(name) = &input.name {
        validate_name("Name", name).map_err(AppError::validation)?;
    }
    if let Some(division_id) = input.division_id {
        live_division(&state, &current, division_id).await?;
    }

    let department = OrganizationRepo::update_department(&state.pool, id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("Department", id))?;
    Ok(Json(DataResponse::new(department)))
}

/// DELETE /api/organization/departments/{id}
///
/// Refused with 409 while live users or projects still belong to it.
pub async fn delete_department(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    require_manage_departments(&current)?;
    if !current.scope.contains_department(id) {
        return Err(AppError::forbidden("manage this department"));
    }

    let dependents = OrganizationRepo::department_dependents(&state.pool, id).await?;
    if dependents > 0 {
        return Err(AppError::conflict(format!(
            "Department still has {dependents} users or projects"
        )));
    }

    if OrganizationRepo::soft_delete_department(&state.pool, id).await? {
        tracing::info!(department_id = id, deleted_by = current.id(), "Department deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("Department", id))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn require_manage_departments(current: &CurrentUser) -> AppResult<()> {
    if current.access().has_global(Permission::ManageDepartments) {
        Ok(())
    } else {
        Err(AppError::forbidden("manage departments"))
    }
}

async fn live_division(state: &AppState, current: &CurrentUser, id: DbId) -> AppResult<Division> {
    let division = OrganizationRepo::find_division(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Division", id))?;
    if !current.scope.contains_division(division.id) {
        return Err(AppError::forbidden("manage departments in this division"));
    }
    Ok(division)
}

async fn load_tree(state: &AppState, scope: &AccessibleScope) -> AppResult<OrganizationTree> {
    let mission_groups = OrganizationRepo::list_mission_groups(&state.pool).await?;
    let divisions = OrganizationRepo::list_divisions(&state.pool, None).await?;
    let departments = OrganizationRepo::list_departments(&state.pool, None).await?;

    let mission_groups = mission_groups
        .into_iter()
        .filter(|mg| scope.contains_mission_group(mg.id))
        .map(|mission_group| MissionGroupNode {
            divisions: divisions
                .iter()
                .filter(|d| d.mission_group_id == mission_group.id && scope.contains_division(d.id))
                .map(|division| DivisionNode {
                    departments: departments
                        .iter()
                        .filter(|dept| {
                            dept.division_id == division.id && scope.contains_department(dept.id)
                        })
                        .cloned()
                        .collect(),
                    division: division.clone(),
                })
                .collect(),
            mission_group,
        })
        .collect();

    Ok(OrganizationTree {
        scope_kind: scope.kind,
        mission_groups,
    })
}
