//! Task entity model and DTOs.

use projectflows_core::permissions::{ProjectRef, TaskRef};
use projectflows_core::task::CloseType;
use projectflows_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use crate::models::service_request::ServiceRequest;

/// A task row joined with its assignee ids.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Task {
    pub id: DbId,
    pub project_id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub status_id: DbId,
    pub priority: i32,
    pub difficulty: Option<i32>,
    /// Mirrors the first entry of `assignee_user_ids`.
    pub assignee_user_id: Option<DbId>,
    pub creator_user_id: DbId,
    pub parent_task_id: Option<DbId>,
    pub phase_id: Option<DbId>,
    pub start_date: Option<Timestamp>,
    pub due_date: Option<Timestamp>,
    pub is_closed: bool,
    pub close_type: Option<String>,
    pub close_date: Option<Timestamp>,
    pub closed_by_user_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub assignee_user_ids: Vec<DbId>,
}

impl Task {
    pub fn close_type(&self) -> Option<CloseType> {
        self.close_type.as_deref().and_then(CloseType::parse)
    }

    pub fn task_ref(&self, project: ProjectRef) -> TaskRef {
        TaskRef {
            project,
            creator_user_id: self.creator_user_id,
            assignee_user_ids: self.assignee_user_ids.clone(),
        }
    }
}

/// DTO for creating a new task.
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub project_id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub status_id: DbId,
    pub priority: i32,
    pub difficulty: Option<i32>,
    pub creator_user_id: DbId,
    pub parent_task_id: Option<DbId>,
    pub phase_id: Option<DbId>,
    pub start_date: Option<Timestamp>,
    pub due_date: Option<Timestamp>,
    pub assignee_user_ids: Vec<DbId>,
}

/// The complete next state of a task's editable fields.
///
/// Built by merging a patch over the current row, so nullable fields can be
/// cleared as well as set.
#[derive(Debug, Clone)]
pub struct TaskChanges {
    pub name: String,
    pub description: Option<String>,
    pub status_id: DbId,
    pub priority: i32,
    pub difficulty: Option<i32>,
    pub parent_task_id: Option<DbId>,
    pub phase_id: Option<DbId>,
    pub start_date: Option<Timestamp>,
    pub due_date: Option<Timestamp>,
}

impl From<&Task> for TaskChanges {
    fn from(task: &Task) -> Self {
        TaskChanges {
            name: task.name.clone(),
            description: task.description.clone(),
            status_id: task.status_id,
            priority: task.priority,
            difficulty: task.difficulty,
            parent_task_id: task.parent_task_id,
            phase_id: task.phase_id,
            start_date: task.start_date,
            due_date: task.due_date,
        }
    }
}

/// Fields a bulk update may set on every selected task.
#[derive(Debug, Clone, Default)]
pub struct BulkTaskChanges {
    pub status_id: Option<DbId>,
    pub priority: Option<i32>,
    pub difficulty: Option<i32>,
    pub due_date: Option<Timestamp>,
}

impl BulkTaskChanges {
    pub fn is_empty(&self) -> bool {
        self.status_id.is_none()
            && self.priority.is_none()
            && self.difficulty.is_none()
            && self.due_date.is_none()
    }
}

/// Close state written by close and cleared by reopen.
#[derive(Debug, Clone)]
pub struct CloseTask {
    pub close_type: CloseType,
    pub closed_by_user_id: DbId,
    pub history_text: String,
    /// Timeline text for a service request linked to the task.
    pub request_timeline_text: String,
}

/// Result of closing a task.
#[derive(Debug, Clone)]
pub struct ClosedTask {
    pub task: Task,
    /// The linked service request, when closing finished one.
    pub finished_request: Option<ServiceRequest>,
}

/// Row shape read by the progress calculation.
#[derive(Debug, Clone, FromRow)]
pub struct ProgressRow {
    pub difficulty: Option<i32>,
    pub status_order: Option<i32>,
    pub close_type: Option<String>,
}

/// Filters for task lists.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status_id: Option<DbId>,
    pub assignee_user_id: Option<DbId>,
    pub include_closed: bool,
    pub parent_task_id: Option<DbId>,
}

/// Filters for the cross-project task list. `department_ids = None` means
/// every department; otherwise tasks of other departments are only listed
/// when `viewer_id` owns the project, created the task or is assigned.
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    pub department_ids: Option<Vec<DbId>>,
    pub viewer_id: DbId,
    pub project_id: Option<DbId>,
    pub status_id: Option<DbId>,
    pub assignee_user_id: Option<DbId>,
    pub priority: Option<i32>,
    pub is_closed: Option<bool>,
    pub limit: i64,
    pub offset: i64,
}

/// A task with the counts shown in list views.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TaskListItem {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub task: Task,
    pub comment_count: i64,
    pub subtask_count: i64,
    pub checklist_count: i64,
}

/// A task the user pinned, with the pin time.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PinnedTask {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub task: Task,
    pub pinned_at: Timestamp,
}

/// Task facts read by the division overview.
#[derive(Debug, Clone, FromRow)]
pub struct OverviewTaskRow {
    pub id: DbId,
    pub name: String,
    pub project_id: DbId,
    pub department_id: DbId,
    pub priority: i32,
    pub status_type: String,
    pub is_closed: bool,
    pub close_type: Option<String>,
    pub due_date: Option<Timestamp>,
    pub start_date: Option<Timestamp>,
    pub created_at: Timestamp,
    pub assignee_user_ids: Vec<DbId>,
}
