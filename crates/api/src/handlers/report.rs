//! Task report, division overview and personal dashboard.

use std::collections::{HashMap, HashSet};

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{Duration, Utc};
use projectflows_core::error::CoreError;
use projectflows_core::fiscal_year::parse_fiscal_years;
use projectflows_core::overview::{
    build_overview, DivisionOverview, OverviewDepartment, OverviewFilter, OverviewProject,
    OverviewTask,
};
use projectflows_core::report::{
    report_departments, resolve_window, summarize, OrgFilter, ReportSummary, ReportTask,
};
use projectflows_core::task::{CloseType, StatusType};
use projectflows_core::types::{DbId, Timestamp};
use projectflows_db::models::history::History;
use projectflows_db::models::organization::Division;
use projectflows_db::models::report::{DashboardStats, ReportTaskRow};
use projectflows_db::models::task::Task;
use projectflows_db::repositories::{
    HistoryRepo, OrganizationRepo, PinnedTaskRepo, ProjectRepo, ReportRepo, TaskRepo,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::handlers::project::parse_optional_date;
use crate::middleware::auth::CurrentUser;
use crate::response::DataResponse;
use crate::state::AppState;

const DASHBOARD_TASK_LIMIT: i64 = 10;
const DASHBOARD_ACTIVITY_LIMIT: i64 = 20;

#[derive(Debug, Default, Deserialize)]
pub struct ReportParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub mission_group_id: Option<DbId>,
    pub division_id: Option<DbId>,
    pub department_id: Option<DbId>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OverviewParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Comma-separated Buddhist-era years, e.g. `2568,2567`.
    pub fiscal_years: Option<String>,
    #[serde(default)]
    pub include_completed: bool,
}

#[derive(Debug, Serialize)]
pub struct DivisionOverviewResponse {
    pub division: Division,
    #[serde(flatten)]
    pub overview: DivisionOverview,
}

#[derive(Debug, Serialize)]
pub struct ReportWindow {
    pub start: Timestamp,
    pub end: Timestamp,
}

#[derive(Debug, Serialize)]
pub struct TaskReport {
    pub window: ReportWindow,
    pub department_ids: Vec<DbId>,
    pub summary: ReportSummary,
    pub tasks: Vec<ReportTaskRow>,
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub my_tasks: Vec<Task>,
    pub recent_activity: Vec<History>,
}

/// GET /api/reports/tasks
///
/// Tasks created inside the window, limited to departments in the caller's
/// scope and narrowed by the most specific organization filter given. A
/// date-only end bound covers the whole day.
pub async fn tasks(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<ReportParams>,
) -> AppResult<Json<DataResponse<TaskReport>>> {
    if !current.access().can_view_reports() {
        return Err(AppError::forbidden("view reports"));
    }

    let (start, end) = parse_window(params.start_date.as_deref(), params.end_date.as_deref())?;
    let (start, end) = resolve_window(start, end, Utc::now()).map_err(AppError::validation)?;

    let filter = OrgFilter::from_params(params.mission_group_id, params.division_id, params.department_id);
    let department_ids = report_departments(&current.scope, &current.hierarchy, filter)
        .map_err(|msg| AppError::Core(CoreError::Forbidden(msg)))?;

    let rows = if department_ids.is_empty() {
        Vec::new()
    } else {
        ReportRepo::tasks_in_window(&state.pool, &department_ids, start, end).await?
    };
    let report_tasks: Vec<ReportTask> = rows
        .iter()
        .map(|row| ReportTask {
            status_type: StatusType::parse(&row.status_type),
            close_type: row.close_type.as_deref().and_then(CloseType::parse),
            due_date: row.due_date,
            assignee_user_ids: row.assignee_user_ids.clone(),
        })
        .collect();
    let summary = summarize(&report_tasks, Utc::now());

    Ok(Json(DataResponse::new(TaskReport {
        window: ReportWindow { start, end },
        department_ids,
        summary,
        tasks: rows,
    })))
}

/// GET /api/divisions/{id}/overview
///
/// Departments of the division outside the caller's scope are left out.
/// A creation window applies only when both bounds are given.
pub async fn division_overview(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(division_id): Path<DbId>,
    Query(params): Query<OverviewParams>,
) -> AppResult<Json<DataResponse<DivisionOverviewResponse>>> {
    let division = OrganizationRepo::find_division(&state.pool, division_id)
        .await?
        .ok_or_else(|| AppError::not_found("Division", division_id))?;
    if !current.scope.contains_division(division_id) {
        return Err(AppError::forbidden("view this division"));
    }

    let fiscal_years = parse_fiscal_years(params.fiscal_years.as_deref().unwrap_or(""))
        .map_err(AppError::validation)?;
    let created_between = match parse_window(params.start_date.as_deref(), params.end_date.as_deref())? {
        (Some(start), Some(end)) if start > end => {
            return Err(AppError::validation("Start date must be before or equal to end date"));
        }
        (Some(start), Some(end)) => Some((start, end)),
        _ => None,
    };

    let visible_departments: Vec<_> = OrganizationRepo::list_departments(&state.pool, Some(division_id))
        .await?
        .into_iter()
        .filter(|d| current.scope.contains_department(d.id))
        .collect();
    let department_ids: Vec<DbId> = visible_departments.iter().map(|d| d.id).collect();
    let personnel: HashMap<DbId, i64> = ReportRepo::personnel_counts(&state.pool, &department_ids)
        .await?
        .into_iter()
        .collect();
    let departments: Vec<OverviewDepartment> = visible_departments
        .into_iter()
        .map(|d| OverviewDepartment {
            personnel_count: personnel.get(&d.id).copied().unwrap_or(0),
            id: d.id,
            name: d.name,
        })
        .collect();

    let projects: Vec<OverviewProject> = ProjectRepo::list_by_departments(&state.pool, &department_ids)
        .await?
        .into_iter()
        .map(|p| OverviewProject {
            id: p.id,
            department_id: p.department_id,
            is_active: p.status == "ACTIVE",
            progress: p.progress,
        })
        .collect();

    let rows = TaskRepo::list_for_overview(&state.pool, &department_ids).await?;
    let row_ids: Vec<DbId> = rows.iter().map(|r| r.id).collect();
    let pinned: HashSet<DbId> = PinnedTaskRepo::pinned_ids(&state.pool, current.id(), &row_ids)
        .await?
        .into_iter()
        .collect();
    let tasks: Vec<OverviewTask> = rows
        .into_iter()
        .map(|row| OverviewTask {
            is_pinned: pinned.contains(&row.id),
            id: row.id,
            name: row.name,
            project_id: row.project_id,
            department_id: row.department_id,
            priority: row.priority,
            status_type: StatusType::parse(&row.status_type),
            is_closed: row.is_closed,
            close_type: row.close_type.as_deref().and_then(CloseType::parse),
            due_date: row.due_date,
            start_date: row.start_date,
            created_at: row.created_at,
            assignee_user_ids: row.assignee_user_ids,
        })
        .collect();

    let filter = OverviewFilter {
        created_between,
        fiscal_years,
        include_completed: params.include_completed,
    };
    let overview = build_overview(&departments, &projects, &tasks, &filter, Utc::now());
    Ok(Json(DataResponse::new(DivisionOverviewResponse { division, overview })))
}

/// GET /api/dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<DataResponse<Dashboard>>> {
    let stats = ReportRepo::dashboard_stats(&state.pool, current.id()).await?;
    let my_tasks =
        TaskRepo::list_open_for_assignee(&state.pool, current.id(), DASHBOARD_TASK_LIMIT).await?;
    let recent_activity =
        HistoryRepo::recent_for_user(&state.pool, current.id(), DASHBOARD_ACTIVITY_LIMIT).await?;
    Ok(Json(DataResponse::new(Dashboard {
        stats,
        my_tasks,
        recent_activity,
    })))
}

/// Parse optional window bounds. A date-only end bound covers the whole day.
fn parse_window(
    start: Option<&str>,
    end: Option<&str>,
) -> AppResult<(Option<Timestamp>, Option<Timestamp>)> {
    let start_at = parse_optional_date(start)?;
    let end_at = parse_optional_date(end)?.map(|at| {
        if end.is_some_and(|raw| raw.trim().len() == 10) {
            at + Duration::days(1) - Duration::milliseconds(1)
        } else {
            at
        }
    });
    Ok((start_at, end_at))
}
