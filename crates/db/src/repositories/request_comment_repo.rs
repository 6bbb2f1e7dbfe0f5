//! Repository for the `request_comments` table.

use projectflows_core::types::DbId;
use sqlx::PgPool;

use crate::models::comment::RequestComment;

const COLUMNS: &str =
    "c.id, c.request_id, c.user_id, u.full_name AS author_name, c.content, c.created_at";

pub struct RequestCommentRepo;

impl RequestCommentRepo {
    /// Comments on a service request, oldest first.
    pub async fn list_by_request(
        pool: &PgPool,
        request_id: DbId,
    ) -> Result<Vec<RequestComment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM request_comments c
             JOIN users u ON u.id = c.user_id
             WHERE c.request_id = $1
             ORDER BY c.created_at, c.id"
        );
        sqlx::query_as::<_, RequestComment>(&query)
            .bind(request_id)
            .fetch_all(pool)
            .await
    }

    pub async fn create(
        pool: &PgPool,
        request_id: DbId,
        user_id: DbId,
        content: &str,
    ) -> Result<RequestComment, sqlx::Error> {
        let query = format!(
            "WITH c AS (
                INSERT INTO request_comments (request_id, user_id, content) VALUES ($1, $2, $3)
                RETURNING id, request_id, user_id, content, created_at
             )
             SELECT {COLUMNS} FROM c JOIN users u ON u.id = c.user_id"
        );
        sqlx::query_as::<_, RequestComment>(&query)
            .bind(request_id)
            .bind(user_id)
            .bind(content)
            .fetch_one(pool)
            .await
    }
}
