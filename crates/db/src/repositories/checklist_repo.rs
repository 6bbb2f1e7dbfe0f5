//! Repository for the `checklists` table.

use projectflows_core::types::DbId;
use sqlx::PgPool;

use crate::models::checklist::{ChecklistItem, UpdateChecklistItem};

const COLUMNS: &str =
    "id, task_id, name, is_checked, sort_order, created_by, created_at, updated_at";

pub struct ChecklistRepo;

impl ChecklistRepo {
    pub async fn list_by_task(pool: &PgPool, task_id: DbId) -> Result<Vec<ChecklistItem>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM checklists
             WHERE task_id = $1 AND deleted_at IS NULL
             ORDER BY sort_order, id"
        );
        sqlx::query_as::<_, ChecklistItem>(&query)
            .bind(task_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ChecklistItem>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM checklists WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, ChecklistItem>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Append an unchecked item to the end of a task's checklist.
    pub async fn create(
        pool: &PgPool,
        task_id: DbId,
        name: &str,
        created_by: DbId,
    ) -> Result<ChecklistItem, sqlx::Error> {
        let query = format!(
            "INSERT INTO checklists (task_id, name, created_by, sort_order)
             VALUES ($1, $2, $3,
                     (SELECT COALESCE(MAX(sort_order), 0) + 1 FROM checklists
                      WHERE task_id = $1 AND deleted_at IS NULL))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ChecklistItem>(&query)
            .bind(task_id)
            .bind(name)
            .bind(created_by)
            .fetch_one(pool)
            .await
    }

    /// Update an item. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateChecklistItem,
    ) -> Result<Option<ChecklistItem>, sqlx::Error> {
        let query = format!(
            "UPDATE checklists SET
                name = COALESCE($2, name),
                is_checked = COALESCE($3, is_checked),
                sort_order = COALESCE($4, sort_order)
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ChecklistItem>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(input.is_checked)
            .bind(input.sort_order)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete an item. Returns `true` if the row was updated.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE checklists SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
