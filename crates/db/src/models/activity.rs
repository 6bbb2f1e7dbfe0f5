//! Read models for activity feeds and statistics.

use chrono::NaiveDate;
use projectflows_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Which history rows an activity query covers.
///
/// `department_ids = None` means every department; otherwise only rows of
/// projects in those departments or owned by `viewer_id` are included.
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub department_ids: Option<Vec<DbId>>,
    pub viewer_id: DbId,
    pub project_id: Option<DbId>,
    pub user_id: Option<DbId>,
    pub since: Option<Timestamp>,
}

/// A history row with the task and project names it refers to.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Activity {
    pub id: DbId,
    pub task_id: Option<DbId>,
    pub task_name: Option<String>,
    pub project_id: Option<DbId>,
    pub project_name: Option<String>,
    pub user_id: DbId,
    pub user_name: String,
    pub history_text: String,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserActivityCount {
    pub user_id: DbId,
    pub full_name: String,
    pub count: i64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TaskActivityCount {
    pub task_id: DbId,
    pub task_name: String,
    pub count: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct DailyActivityRow {
    pub day: NaiveDate,
    pub count: i64,
}
