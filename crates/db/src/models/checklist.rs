//! Task checklist item model.

use projectflows_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `checklists` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ChecklistItem {
    pub id: DbId,
    pub task_id: DbId,
    pub name: String,
    pub is_checked: bool,
    pub sort_order: i32,
    pub created_by: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateChecklistItem {
    pub name: Option<String>,
    pub is_checked: Option<bool>,
    pub sort_order: Option<i32>,
}
