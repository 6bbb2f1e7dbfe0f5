//! Read models for reports and the dashboard.

use projectflows_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A task joined with its project and status, as listed in reports.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReportTaskRow {
    pub id: DbId,
    pub name: String,
    pub project_id: DbId,
    pub project_name: String,
    pub department_id: DbId,
    pub status_name: String,
    pub status_type: String,
    pub priority: i32,
    pub is_closed: bool,
    pub close_type: Option<String>,
    pub due_date: Option<Timestamp>,
    pub created_at: Timestamp,
    pub assignee_user_ids: Vec<DbId>,
}

/// Counters for the caller's own tasks.
#[derive(Debug, Clone, Default, FromRow, Serialize)]
pub struct DashboardStats {
    pub assigned: i64,
    pub open: i64,
    pub completed: i64,
    pub overdue: i64,
    pub due_this_week: i64,
}
