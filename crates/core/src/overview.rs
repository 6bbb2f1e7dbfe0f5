//! Division overview: per-department task health, charts and the
//! critical task lists shown to division management.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::fiscal_year::fiscal_year_range;
use crate::task::{CloseType, StatusType};
use crate::types::DbId;

/// Open tasks due within this many days count as due soon.
pub const DUE_SOON_DAYS: i64 = 3;
/// Cap on each critical task list.
pub const CRITICAL_LIST_LIMIT: usize = 20;
/// Departments shown in the workload chart.
pub const WORKLOAD_CHART_LIMIT: usize = 10;

/// Overdue share of non-aborted tasks above which a department is high risk.
const HIGH_RISK_RATIO: f64 = 0.2;
const MEDIUM_RISK_RATIO: f64 = 0.1;

#[derive(Debug, Clone)]
pub struct OverviewDepartment {
    pub id: DbId,
    pub name: String,
    pub personnel_count: i64,
}

#[derive(Debug, Clone)]
pub struct OverviewProject {
    pub id: DbId,
    pub department_id: DbId,
    pub is_active: bool,
    /// Cached weighted progress, 0 to 100.
    pub progress: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewTask {
    pub id: DbId,
    pub name: String,
    pub project_id: DbId,
    pub department_id: DbId,
    pub priority: i32,
    #[serde(skip)]
    pub status_type: Option<StatusType>,
    pub is_closed: bool,
    #[serde(skip)]
    pub close_type: Option<CloseType>,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
    pub assignee_user_ids: Vec<DbId>,
    pub is_pinned: bool,
}

impl OverviewTask {
    fn is_aborted(&self) -> bool {
        self.close_type == Some(CloseType::Aborted)
    }

    fn is_completed(&self) -> bool {
        self.is_closed && self.close_type == Some(CloseType::Completed)
    }

    fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.is_closed
            && self.status_type != Some(StatusType::Done)
            && self.due_date.is_some_and(|d| d < now)
    }

    fn is_due_soon(&self, now: DateTime<Utc>) -> bool {
        !self.is_closed
            && self
                .due_date
                .is_some_and(|d| d >= now && d <= now + Duration::days(DUE_SOON_DAYS))
    }

    fn is_in_progress(&self) -> bool {
        !self.is_closed
            && !matches!(self.status_type, Some(StatusType::NotStarted) | Some(StatusType::Done))
    }

    /// Created, started or due inside any of `years`.
    pub fn in_fiscal_years(&self, years: &[i32]) -> bool {
        years.iter().filter_map(|y| fiscal_year_range(*y)).any(|(start, end)| {
            let inside = |d: DateTime<Utc>| d >= start && d <= end;
            inside(self.created_at)
                || self.start_date.is_some_and(inside)
                || self.due_date.is_some_and(inside)
        })
    }
}

/// Filters applied before aggregation.
#[derive(Debug, Clone, Default)]
pub struct OverviewFilter {
    /// Inclusive creation window; both bounds or neither.
    pub created_between: Option<(DateTime<Utc>, DateTime<Utc>)>,
    pub fiscal_years: Vec<i32>,
    pub include_completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_overdue(overdue: usize, non_aborted: usize) -> Self {
        if non_aborted == 0 {
            return RiskLevel::Low;
        }
        let ratio = overdue as f64 / non_aborted as f64;
        if ratio > HIGH_RISK_RATIO {
            RiskLevel::High
        } else if ratio > MEDIUM_RISK_RATIO {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    pub total: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub overdue: usize,
    pub due_soon: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectCount {
    pub active: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentSummary {
    pub id: DbId,
    pub name: String,
    pub project_count: ProjectCount,
    pub task_stats: TaskStats,
    /// Completed share of non-aborted tasks, whole percent.
    pub completion_rate: i64,
    /// Mean project progress, whole percent.
    pub progress: i64,
    pub personnel_count: i64,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DivisionStats {
    pub total_departments: usize,
    pub active_departments: usize,
    pub total_projects: usize,
    pub active_projects: usize,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub in_progress_tasks: usize,
    pub overdue_tasks: usize,
    pub due_soon_tasks: usize,
    pub unassigned_tasks: usize,
    pub avg_completion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkloadEntry {
    pub department_name: String,
    pub task_count: usize,
    pub completion_rate: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PriorityDistribution {
    pub priority1: usize,
    pub priority2: usize,
    pub priority3: usize,
    pub priority4: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusDistributionEntry {
    pub department_name: String,
    pub not_started: usize,
    pub in_progress: usize,
    pub done: usize,
    pub overdue: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewCharts {
    pub workload_distribution: Vec<WorkloadEntry>,
    pub priority_distribution: PriorityDistribution,
    pub status_distribution: Vec<StatusDistributionEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CriticalTasks {
    pub overdue: Vec<OverviewTask>,
    pub urgent: Vec<OverviewTask>,
    pub due_soon: Vec<OverviewTask>,
    pub unassigned: Vec<OverviewTask>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DivisionOverview {
    pub stats: DivisionStats,
    pub departments: Vec<DepartmentSummary>,
    pub charts: OverviewCharts,
    pub critical_tasks: CriticalTasks,
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Aggregate a division from the live projects and tasks of its departments.
///
/// With fiscal years given, only projects holding at least one task in
/// those years are counted. Closed tasks are skipped unless
/// `include_completed` is set.
pub fn build_overview(
    departments: &[OverviewDepartment],
    projects: &[OverviewProject],
    tasks: &[OverviewTask],
    filter: &OverviewFilter,
    now: DateTime<Utc>,
) -> DivisionOverview {
    let tasks: Vec<&OverviewTask> = tasks
        .iter()
        .filter(|t| filter.include_completed || !t.is_closed)
        .filter(|t| {
            filter
                .created_between
                .map_or(true, |(start, end)| t.created_at >= start && t.created_at <= end)
        })
        .filter(|t| filter.fiscal_years.is_empty() || t.in_fiscal_years(&filter.fiscal_years))
        .collect();

    let projects: Vec<&OverviewProject> = projects
        .iter()
        .filter(|p| {
            filter.fiscal_years.is_empty()
                || tasks.iter().any(|t| t.project_id == p.id)
        })
        .collect();

    let mut by_department: BTreeMap<DbId, Vec<&OverviewTask>> = BTreeMap::new();
    for task in &tasks {
        by_department.entry(task.department_id).or_default().push(task);
    }

    let mut stats = DivisionStats {
        total_departments: departments.len(),
        ..Default::default()
    };
    let mut aborted_total = 0;
    let mut summaries = Vec::with_capacity(departments.len());

    for dept in departments {
        let dept_projects: Vec<&&OverviewProject> =
            projects.iter().filter(|p| p.department_id == dept.id).collect();
        let dept_tasks = by_department.get(&dept.id).map(Vec::as_slice).unwrap_or(&[]);

        let aborted = dept_tasks.iter().filter(|t| t.is_aborted()).count();
        let non_aborted = dept_tasks.len() - aborted;
        let task_stats = TaskStats {
            total: dept_tasks.len(),
            in_progress: dept_tasks.iter().filter(|t| t.is_in_progress()).count(),
            completed: dept_tasks.iter().filter(|t| t.is_completed()).count(),
            overdue: dept_tasks.iter().filter(|t| t.is_overdue(now)).count(),
            due_soon: dept_tasks.iter().filter(|t| t.is_due_soon(now)).count(),
        };
        let active_projects = dept_projects.iter().filter(|p| p.is_active).count();
        let progress = if dept_projects.is_empty() {
            0.0
        } else {
            dept_projects.iter().map(|p| p.progress).sum::<f64>() / dept_projects.len() as f64
        };

        stats.total_projects += dept_projects.len();
        stats.active_projects += active_projects;
        if active_projects > 0 {
            stats.active_departments += 1;
        }
        stats.total_tasks += task_stats.total;
        stats.completed_tasks += task_stats.completed;
        stats.in_progress_tasks += task_stats.in_progress;
        stats.overdue_tasks += task_stats.overdue;
        stats.due_soon_tasks += task_stats.due_soon;
        aborted_total += aborted;

        summaries.push(DepartmentSummary {
            id: dept.id,
            name: dept.name.clone(),
            project_count: ProjectCount {
                active: active_projects,
                total: dept_projects.len(),
            },
            completion_rate: percent(task_stats.completed, non_aborted).round() as i64,
            progress: progress.round() as i64,
            personnel_count: dept.personnel_count,
            risk_level: RiskLevel::from_overdue(task_stats.overdue, non_aborted),
            task_stats,
        });
    }
    stats.avg_completion_rate = percent(stats.completed_tasks, stats.total_tasks - aborted_total);

    let mut priority_distribution = PriorityDistribution::default();
    let mut critical = CriticalTasks::default();
    let department_order: Vec<DbId> = departments.iter().map(|d| d.id).collect();
    for dept_id in &department_order {
        for task in by_department.get(dept_id).map(Vec::as_slice).unwrap_or(&[]) {
            match task.priority {
                1 => priority_distribution.priority1 += 1,
                2 => priority_distribution.priority2 += 1,
                3 => priority_distribution.priority3 += 1,
                4 => priority_distribution.priority4 += 1,
                _ => {}
            }
            if task.is_closed {
                continue;
            }
            if task.priority == 1 {
                critical.urgent.push((*task).clone());
            }
            if task.due_date.is_some_and(|d| d < now) {
                critical.overdue.push((*task).clone());
            }
            if task.is_due_soon(now) {
                critical.due_soon.push((*task).clone());
            }
            if task.assignee_user_ids.is_empty() {
                stats.unassigned_tasks += 1;
                critical.unassigned.push((*task).clone());
            }
        }
    }
    for list in [
        &mut critical.overdue,
        &mut critical.urgent,
        &mut critical.due_soon,
        &mut critical.unassigned,
    ] {
        list.truncate(CRITICAL_LIST_LIMIT);
    }

    let mut workload_distribution: Vec<WorkloadEntry> = summaries
        .iter()
        .map(|d| WorkloadEntry {
            department_name: d.name.clone(),
            task_count: d.task_stats.total,
            completion_rate: d.completion_rate,
        })
        .collect();
    workload_distribution.sort_by(|a, b| b.task_count.cmp(&a.task_count));
    workload_distribution.truncate(WORKLOAD_CHART_LIMIT);

    let status_distribution = summaries
        .iter()
        .map(|d| StatusDistributionEntry {
            department_name: d.name.clone(),
            not_started: d
                .task_stats
                .total
                .saturating_sub(d.task_stats.in_progress + d.task_stats.completed),
            in_progress: d.task_stats.in_progress,
            done: d.task_stats.completed,
            overdue: d.task_stats.overdue,
        })
        .collect();

    DivisionOverview {
        stats,
        departments: summaries,
        charts: OverviewCharts {
            workload_distribution,
            priority_distribution,
            status_distribution,
        },
        critical_tasks: critical,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
    }

    fn dept(id: DbId, name: &str) -> OverviewDepartment {
        OverviewDepartment {
            id,
            name: name.to_string(),
            personnel_count: 4,
        }
    }

    fn project(id: DbId, department_id: DbId, progress: f64) -> OverviewProject {
        OverviewProject {
            id,
            department_id,
            is_active: true,
            progress,
        }
    }

    fn task(id: DbId, project_id: DbId, department_id: DbId) -> OverviewTask {
        OverviewTask {
            id,
            name: format!("Task {id}"),
            project_id,
            department_id,
            priority: 3,
            status_type: Some(StatusType::InProgress),
            is_closed: false,
            close_type: None,
            due_date: None,
            start_date: None,
            created_at: now() - Duration::days(5),
            assignee_user_ids: vec![1],
            is_pinned: false,
        }
    }

    fn closed(mut t: OverviewTask, close_type: CloseType) -> OverviewTask {
        t.is_closed = true;
        t.close_type = Some(close_type);
        t
    }

    fn include_all() -> OverviewFilter {
        OverviewFilter {
            include_completed: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_department_stats_and_completion_excludes_aborted() {
        let mut overdue = task(3, 10, 100);
        overdue.due_date = Some(now() - Duration::days(1));
        let tasks = vec![
            closed(task(1, 10, 100), CloseType::Completed),
            closed(task(2, 10, 100), CloseType::Aborted),
            overdue,
            task(4, 10, 100),
        ];
        let overview = build_overview(
            &[dept(100, "Ops")],
            &[project(10, 100, 40.0)],
            &tasks,
            &include_all(),
            now(),
        );

        let ops = &overview.departments[0];
        assert_eq!(ops.task_stats.total, 4);
        assert_eq!(ops.task_stats.completed, 1);
        assert_eq!(ops.task_stats.overdue, 1);
        assert_eq!(ops.task_stats.in_progress, 2);
        // 1 completed of 3 non-aborted
        assert_eq!(ops.completion_rate, 33);
        assert_eq!(ops.progress, 40);
        // 1 overdue of 3 non-aborted is above 20%
        assert_eq!(ops.risk_level, RiskLevel::High);
        assert!((overview.stats.avg_completion_rate - 33.33).abs() < 0.01);
    }

    #[test]
    fn test_closed_tasks_hidden_by_default() {
        let tasks = vec![closed(task(1, 10, 100), CloseType::Completed), task(2, 10, 100)];
        let overview = build_overview(
            &[dept(100, "Ops")],
            &[project(10, 100, 0.0)],
            &tasks,
            &OverviewFilter::default(),
            now(),
        );
        assert_eq!(overview.stats.total_tasks, 1);
        assert_eq!(overview.stats.completed_tasks, 0);
    }

    #[test]
    fn test_risk_levels() {
        assert_eq!(RiskLevel::from_overdue(0, 0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_overdue(1, 10), RiskLevel::Low);
        assert_eq!(RiskLevel::from_overdue(2, 10), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_overdue(3, 10), RiskLevel::High);
    }

    #[test]
    fn test_critical_lists() {
        let mut urgent = task(1, 10, 100);
        urgent.priority = 1;
        let mut due_soon = task(2, 10, 100);
        due_soon.due_date = Some(now() + Duration::days(2));
        let mut unassigned = task(3, 10, 100);
        unassigned.assignee_user_ids.clear();
        let mut late = task(4, 10, 100);
        late.due_date = Some(now() - Duration::hours(1));

        let overview = build_overview(
            &[dept(100, "Ops")],
            &[project(10, 100, 0.0)],
            &[urgent, due_soon, unassigned, late],
            &OverviewFilter::default(),
            now(),
        );
        let ids = |list: &Vec<OverviewTask>| list.iter().map(|t| t.id).collect::<Vec<_>>();
        assert_eq!(ids(&overview.critical_tasks.urgent), vec![1]);
        assert_eq!(ids(&overview.critical_tasks.due_soon), vec![2]);
        assert_eq!(ids(&overview.critical_tasks.unassigned), vec![3]);
        assert_eq!(ids(&overview.critical_tasks.overdue), vec![4]);
        assert_eq!(overview.stats.unassigned_tasks, 1);
        assert_eq!(overview.charts.priority_distribution.priority1, 1);
        assert_eq!(overview.charts.priority_distribution.priority3, 3);
    }

    #[test]
    fn test_critical_lists_are_capped() {
        let tasks: Vec<OverviewTask> = (1..=30)
            .map(|id| {
                let mut t = task(id, 10, 100);
                t.priority = 1;
                t
            })
            .collect();
        let overview = build_overview(
            &[dept(100, "Ops")],
            &[project(10, 100, 0.0)],
            &tasks,
            &OverviewFilter::default(),
            now(),
        );
        assert_eq!(overview.critical_tasks.urgent.len(), CRITICAL_LIST_LIMIT);
        assert_eq!(overview.stats.total_tasks, 30);
    }

    #[test]
    fn test_fiscal_year_filter_drops_projects_without_matching_tasks() {
        let mut old = task(1, 11, 100);
        old.created_at = Utc.with_ymd_and_hms(2022, 1, 5, 0, 0, 0).unwrap();
        let current = task(2, 10, 100);
        let filter = OverviewFilter {
            fiscal_years: vec![2568],
            include_completed: true,
            ..Default::default()
        };
        let overview = build_overview(
            &[dept(100, "Ops")],
            &[project(10, 100, 50.0), project(11, 100, 10.0)],
            &[old, current],
            &filter,
            now(),
        );
        assert_eq!(overview.stats.total_projects, 1);
        assert_eq!(overview.stats.total_tasks, 1);
        assert_eq!(overview.departments[0].progress, 50);
    }

    #[test]
    fn test_workload_sorted_by_task_count() {
        let tasks = vec![task(1, 10, 100), task(2, 11, 101), task(3, 11, 101)];
        let overview = build_overview(
            &[dept(100, "Ops"), dept(101, "Infra")],
            &[project(10, 100, 0.0), project(11, 101, 0.0)],
            &tasks,
            &OverviewFilter::default(),
            now(),
        );
        let names: Vec<&str> = overview
            .charts
            .workload_distribution
            .iter()
            .map(|w| w.department_name.as_str())
            .collect();
        assert_eq!(names, vec!["Infra", "Ops"]);
        assert_eq!(overview.stats.total_departments, 2);
        assert_eq!(overview.stats.active_departments, 2);
    }

    #[test]
    fn test_empty_division() {
        let overview = build_overview(&[dept(100, "Ops")], &[], &[], &OverviewFilter::default(), now());
        assert_eq!(overview.departments[0].completion_rate, 0);
        assert_eq!(overview.departments[0].risk_level, RiskLevel::Low);
        assert_eq!(overview.stats.avg_completion_rate, 0.0);
        assert_eq!(overview.stats.active_departments, 0);
    }
}
