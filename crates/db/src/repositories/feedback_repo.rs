//! Repository for the `service_request_feedback` table.

use projectflows_core::types::DbId;
use sqlx::{FromRow, PgPool};

use crate::models::service_request::Feedback;

const COLUMNS: &str = "id, request_id, user_id, rating, comment, created_at, updated_at";

#[derive(FromRow)]
struct UpsertedFeedback {
    #[sqlx(flatten)]
    feedback: Feedback,
    inserted: bool,
}

pub struct FeedbackRepo;

impl FeedbackRepo {
    pub async fn find_by_request(
        pool: &PgPool,
        request_id: DbId,
    ) -> Result<Option<Feedback>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM service_request_feedback WHERE request_id = $1");
        sqlx::query_as::<_, Feedback>(&query)
            .bind(request_id)
            .fetch_optional(pool)
            .await
    }

    /// Insert or replace the feedback for a request.
    ///
    /// The flag is `true` when a new row was created.
    pub async fn upsert(
        pool: &PgPool,
        request_id: DbId,
        user_id: DbId,
        rating: i32,
        comment: Option<&str>,
    ) -> Result<(Feedback, bool), sqlx::Error> {
        let query = format!(
            "INSERT INTO service_request_feedback (request_id, user_id, rating, comment)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT ON CONSTRAINT uq_service_request_feedback_request
             DO UPDATE SET rating = EXCLUDED.rating, comment = EXCLUDED.comment
             RETURNING {COLUMNS}, (xmax = 0) AS inserted"
        );
        let row = sqlx::query_as::<_, UpsertedFeedback>(&query)
            .bind(request_id)
            .bind(user_id)
            .bind(rating)
            .bind(comment)
            .fetch_one(pool)
            .await?;
        Ok((row.feedback, row.inserted))
    }

    /// Feedback count per rating on COMPLETED requests, optionally for one type.
    pub async fn rating_counts(
        pool: &PgPool,
        request_type: Option<&str>,
    ) -> Result<Vec<(i32, i64)>, sqlx::Error> {
        sqlx::query_as(
            "SELECT f.rating, COUNT(*)
             FROM service_request_feedback f
             JOIN service_requests sr ON sr.id = f.request_id
             WHERE sr.status = 'COMPLETED' AND ($1::TEXT IS NULL OR sr.request_type = $1)
             GROUP BY f.rating
             ORDER BY f.rating",
        )
        .bind(request_type)
        .fetch_all(pool)
        .await
    }
}
