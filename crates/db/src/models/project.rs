//! Project entity model and DTOs.

use projectflows_core::permissions::ProjectRef;
use projectflows_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A project row from the `projects` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Project {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub department_id: DbId,
    pub owner_user_id: DbId,
    pub created_by: DbId,
    pub status: String,
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
    pub color: Option<String>,
    /// Cached weighted progress, refreshed after task mutations.
    pub progress: f64,
    pub progress_updated_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Project {
    pub fn project_ref(&self) -> ProjectRef {
        ProjectRef {
            department_id: self.department_id,
            owner_user_id: self.owner_user_id,
        }
    }
}

/// DTO for creating a new project.
#[derive(Debug, Clone)]
pub struct CreateProject {
    pub name: String,
    pub description: Option<String>,
    pub department_id: DbId,
    pub owner_user_id: DbId,
    pub created_by: DbId,
    pub status: String,
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
    pub color: Option<String>,
}

/// DTO for updating an existing project. `None` leaves a column unchanged;
/// `Some(None)` clears a nullable one.
#[derive(Debug, Clone, Default)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub department_id: Option<DbId>,
    pub owner_user_id: Option<DbId>,
    pub status: Option<String>,
    pub start_date: Option<Option<Timestamp>>,
    pub end_date: Option<Option<Timestamp>>,
    pub color: Option<Option<String>>,
}

/// Filters for the project list.
#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    /// `None` lists every department (admin).
    pub department_ids: Option<Vec<DbId>>,
    /// Projects owned by this user are listed regardless of department.
    pub owner_user_id: Option<DbId>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}
