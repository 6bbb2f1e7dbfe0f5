//! Repository for the `user_pinned_tasks` table.

use projectflows_core::types::DbId;
use sqlx::PgPool;

use crate::models::task::PinnedTask;
use crate::repositories::task_repo::COLUMNS as TASK_COLUMNS;

pub struct PinnedTaskRepo;

impl PinnedTaskRepo {
    /// Live pinned tasks of a user in live projects, most recently pinned first.
    pub async fn list_for_user(pool: &PgPool, user_id: DbId) -> Result<Vec<PinnedTask>, sqlx::Error> {
        let query = format!(
            "SELECT {TASK_COLUMNS}, up.created_at AS pinned_at
             FROM user_pinned_tasks up
             JOIN tasks t ON t.id = up.task_id AND t.deleted_at IS NULL
             JOIN projects p ON p.id = t.project_id AND p.deleted_at IS NULL
             WHERE up.user_id = $1
             ORDER BY up.created_at DESC, up.id DESC"
        );
        sqlx::query_as::<_, PinnedTask>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    pub async fn is_pinned(pool: &PgPool, user_id: DbId, task_id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM user_pinned_tasks WHERE user_id = $1 AND task_id = $2)",
        )
        .bind(user_id)
        .bind(task_id)
        .fetch_one(pool)
        .await
    }

    /// Pin a task. A concurrent duplicate fails on `uq_user_pinned_tasks`.
    pub async fn pin(pool: &PgPool, user_id: DbId, task_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO user_pinned_tasks (user_id, task_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(task_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Remove a pin. Returns `true` if one existed.
    pub async fn unpin(pool: &PgPool, user_id: DbId, task_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_pinned_tasks WHERE user_id = $1 AND task_id = $2")
            .bind(user_id)
            .bind(task_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// The subset of `task_ids` the user has pinned.
    pub async fn pinned_ids(
        pool: &PgPool,
        user_id: DbId,
        task_ids: &[DbId],
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT task_id FROM user_pinned_tasks WHERE user_id = $1 AND task_id = ANY($2)",
        )
        .bind(user_id)
        .bind(task_ids)
        .fetch_all(pool)
        .await
    }
}
