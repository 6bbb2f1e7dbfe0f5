//! Repository for the `comments` table.

use projectflows_core::types::DbId;
use sqlx::PgPool;

use crate::models::activity::ActivityFilter;
use crate::models::comment::Comment;

const COLUMNS: &str =
    "c.id, c.task_id, c.user_id, u.full_name AS author_name, c.content, c.created_at, c.updated_at";

pub struct CommentRepo;

impl CommentRepo {
    /// Comments on a task, oldest first.
    pub async fn list_by_task(pool: &PgPool, task_id: DbId) -> Result<Vec<Comment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM comments c
             JOIN users u ON u.id = c.user_id
             WHERE c.task_id = $1 AND c.deleted_at IS NULL
             ORDER BY c.created_at, c.id"
        );
        sqlx::query_as::<_, Comment>(&query)
            .bind(task_id)
            .fetch_all(pool)
            .await
    }

    pub async fn create(
        pool: &PgPool,
        task_id: DbId,
        user_id: DbId,
        content: &str,
    ) -> Result<Comment, sqlx::Error> {
        let query = format!(
            "WITH c AS (
                INSERT INTO comments (task_id, user_id, content) VALUES ($1, $2, $3)
                RETURNING id, task_id, user_id, content, created_at, updated_at
             )
             SELECT {COLUMNS} FROM c JOIN users u ON u.id = c.user_id"
        );
        sqlx::query_as::<_, Comment>(&query)
            .bind(task_id)
            .bind(user_id)
            .bind(content)
            .fetch_one(pool)
            .await
    }

    /// Comments by other users on live tasks assigned to `user_id`, newest first.
    pub async fn list_on_assigned_tasks(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
    ) -> Result<Vec<Comment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM comments c
             JOIN users u ON u.id = c.user_id
             JOIN tasks t ON t.id = c.task_id AND t.deleted_at IS NULL
             WHERE c.deleted_at IS NULL AND c.user_id <> $1
               AND EXISTS (SELECT 1 FROM task_assignees ta WHERE ta.task_id = t.id AND ta.user_id = $1)
             ORDER BY c.created_at DESC, c.id DESC
             LIMIT $2"
        );
        sqlx::query_as::<_, Comment>(&query)
            .bind(user_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Live comments on tasks of projects matching `filter`. The user
    /// filter selects the author.
    pub async fn count_matching(pool: &PgPool, filter: &ActivityFilter) -> Result<i64, sqlx::Error> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT COUNT(*) FROM comments c
             JOIN tasks t ON t.id = c.task_id AND t.deleted_at IS NULL
             JOIN projects p ON p.id = t.project_id AND p.deleted_at IS NULL
             WHERE c.deleted_at IS NULL
               AND ($1::BIGINT[] IS NULL OR p.department_id = ANY($1) OR p.owner_user_id = $2)
               AND ($3::BIGINT IS NULL OR t.project_id = $3)
               AND ($4::BIGINT IS NULL OR c.user_id = $4)
               AND ($5::TIMESTAMPTZ IS NULL OR c.created_at >= $5)",
        )
        .bind(&filter.department_ids)
        .bind(filter.viewer_id)
        .bind(filter.project_id)
        .bind(filter.user_id)
        .bind(filter.since)
        .fetch_one(pool)
        .await?;
        Ok(count.unwrap_or(0))
    }
}
