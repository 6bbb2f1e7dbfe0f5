//! Task report window, department filter and aggregation.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::scope::{AccessibleScope, OrgHierarchy};
use crate::task::{CloseType, StatusType};
use crate::types::DbId;

/// Days covered when no explicit window is given.
pub const DEFAULT_WINDOW_DAYS: i64 = 90;

/// Resolve the report window. Both bounds must be given for an explicit
/// window; otherwise the last [`DEFAULT_WINDOW_DAYS`] days up to `now` are used.
pub fn resolve_window(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), String> {
    let (start, end) = match (start, end) {
        (Some(s), Some(e)) => (s, e),
        _ => (now - Duration::days(DEFAULT_WINDOW_DAYS), now),
    };
    if start > end {
        return Err("Start date must be before or equal to end date".to_string());
    }
    Ok((start, end))
}

/// The narrowest organizational filter requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrgFilter {
    None,
    MissionGroup(DbId),
    Division(DbId),
    Department(DbId),
}

impl OrgFilter {
    /// Department wins over division, which wins over mission group.
    pub fn from_params(
        mission_group_id: Option<DbId>,
        division_id: Option<DbId>,
        department_id: Option<DbId>,
    ) -> Self {
        match (department_id, division_id, mission_group_id) {
            (Some(d), _, _) => OrgFilter::Department(d),
            (None, Some(d), _) => OrgFilter::Division(d),
            (None, None, Some(m)) => OrgFilter::MissionGroup(m),
            (None, None, None) => OrgFilter::None,
        }
    }
}

/// Departments a report covers: the caller's scope narrowed by `filter`.
///
/// Returns `Err` with a message when the filter names a unit the caller
/// has no visible department in.
pub fn report_departments(
    scope: &AccessibleScope,
    hierarchy: &OrgHierarchy,
    filter: OrgFilter,
) -> Result<Vec<DbId>, String> {
    let visible = |dept: &DbId| scope.contains_department(*dept) && hierarchy.contains_department(*dept);

    let departments: Vec<DbId> = match filter {
        OrgFilter::None => return Ok(scope_departments(scope, hierarchy)),
        OrgFilter::Department(id) => {
            if !visible(&id) {
                return Err("You do not have access to this department".to_string());
            }
            vec![id]
        }
        OrgFilter::Division(id) => hierarchy
            .departments_in(id)
            .iter()
            .copied()
            .filter(visible)
            .collect(),
        OrgFilter::MissionGroup(id) => hierarchy
            .divisions_in(id)
            .iter()
            .flat_map(|div| hierarchy.departments_in(*div).iter().copied())
            .filter(visible)
            .collect(),
    };

    if departments.is_empty() {
        let unit = match filter {
            OrgFilter::Division(_) => "division",
            _ => "mission group",
        };
        return Err(format!("You do not have access to this {unit}"));
    }
    Ok(departments)
}

fn scope_departments(scope: &AccessibleScope, hierarchy: &OrgHierarchy) -> Vec<DbId> {
    scope
        .department_ids
        .iter()
        .copied()
        .filter(|d| hierarchy.contains_department(*d))
        .collect()
}

/// The task facts the summary reads.
#[derive(Debug, Clone)]
pub struct ReportTask {
    pub status_type: Option<StatusType>,
    pub close_type: Option<CloseType>,
    pub due_date: Option<DateTime<Utc>>,
    pub assignee_user_ids: Vec<DbId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusTypeCounts {
    pub not_started: usize,
    pub in_progress: usize,
    pub done: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssigneeLoad {
    pub user_id: DbId,
    pub open: usize,
    pub completed: usize,
    pub overdue: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub total: usize,
    pub open: usize,
    pub completed: usize,
    pub overdue: usize,
    pub by_status_type: StatusTypeCounts,
    pub assignees: Vec<AssigneeLoad>,
}

/// Aggregate a report task list. ABORTED tasks are skipped.
pub fn summarize(tasks: &[ReportTask], now: DateTime<Utc>) -> ReportSummary {
    let mut summary = ReportSummary::default();
    let mut loads: BTreeMap<DbId, AssigneeLoad> = BTreeMap::new();

    for task in tasks {
        if task.close_type == Some(CloseType::Aborted) {
            continue;
        }
        summary.total += 1;

        let completed = task.close_type == Some(CloseType::Completed);
        let overdue = !completed && task.due_date.is_some_and(|d| d < now);

        if completed {
            summary.completed += 1;
        } else {
            summary.open += 1;
        }
        if overdue {
            summary.overdue += 1;
        }

        match task.status_type {
            Some(StatusType::NotStarted) => summary.by_status_type.not_started += 1,
            Some(StatusType::InProgress) => summary.by_status_type.in_progress += 1,
            Some(StatusType::Done) => summary.by_status_type.done += 1,
            None => {}
        }

        for user_id in &task.assignee_user_ids {
            let load = loads.entry(*user_id).or_insert_with(|| AssigneeLoad {
                user_id: *user_id,
                ..Default::default()
            });
            if completed {
                load.completed += 1;
            } else {
                load.open += 1;
            }
            if overdue {
                load.overdue += 1;
            }
        }
    }

    summary.assignees = loads.into_values().collect();
    summary
}
