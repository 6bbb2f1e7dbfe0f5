//! Activity history model.

use projectflows_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A history entry joined with the acting user's name.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct History {
    pub id: DbId,
    pub task_id: Option<DbId>,
    pub project_id: Option<DbId>,
    pub user_id: DbId,
    pub user_name: String,
    pub history_text: String,
    pub created_at: Timestamp,
}

/// A history line to record alongside a mutation.
#[derive(Debug, Clone)]
pub struct NewHistory {
    pub task_id: Option<DbId>,
    pub project_id: Option<DbId>,
    pub user_id: DbId,
    pub history_text: String,
}

impl NewHistory {
    pub fn for_task(task_id: DbId, project_id: DbId, user_id: DbId, text: String) -> Self {
        NewHistory {
            task_id: Some(task_id),
            project_id: Some(project_id),
            user_id,
            history_text: text,
        }
    }
}
