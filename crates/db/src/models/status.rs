//! Project workflow status model and DTOs.

use projectflows_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `statuses` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Status {
    pub id: DbId,
    pub project_id: DbId,
    pub name: String,
    pub color: String,
    /// Position in the workflow, also the progress weight.
    pub sort_order: i32,
    pub status_type: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CreateStatus {
    pub name: String,
    pub color: String,
    pub sort_order: i32,
    pub status_type: String,
}

/// DTO for updating a status. All fields are optional.
#[derive(Debug, Clone, Default)]
pub struct UpdateStatus {
    pub name: Option<String>,
    pub color: Option<String>,
    pub sort_order: Option<i32>,
    pub status_type: Option<String>,
}
