//! Repository for the `histories` table.

use projectflows_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::activity::{
    Activity, ActivityFilter, DailyActivityRow, TaskActivityCount, UserActivityCount,
};
use crate::models::history::{History, NewHistory};

const COLUMNS: &str =
    "h.id, h.task_id, h.project_id, h.user_id, u.full_name AS user_name, h.history_text, h.created_at";

const ACTIVITY_COLUMNS: &str = "h.id, h.task_id, t.name AS task_name, h.project_id, \
    p.name AS project_name, h.user_id, u.full_name AS user_name, h.history_text, h.created_at";

/// Joins and predicates shared by activity queries. Binds `$1` department
/// ids (NULL = all), `$2` viewer, `$3` project, `$4` acting user, `$5` since.
const ACTIVITY_SCOPE: &str = "FROM histories h
     JOIN users u ON u.id = h.user_id
     JOIN projects p ON p.id = h.project_id AND p.deleted_at IS NULL
     LEFT JOIN tasks t ON t.id = h.task_id
     WHERE ($1::BIGINT[] IS NULL OR p.department_id = ANY($1) OR p.owner_user_id = $2)
       AND ($3::BIGINT IS NULL OR h.project_id = $3)
       AND ($4::BIGINT IS NULL OR h.user_id = $4)
       AND ($5::TIMESTAMPTZ IS NULL OR h.created_at >= $5)";

/// Provides access to the activity log.
pub struct HistoryRepo;

impl HistoryRepo {
    /// Record a single history line.
    pub async fn create(pool: &PgPool, input: &NewHistory) -> Result<(), sqlx::Error> {
        let mut conn = pool.acquire().await?;
        Self::insert(&mut *conn, input).await
    }

    /// Record a history line on an open connection or transaction.
    pub(crate) async fn insert(conn: &mut PgConnection, input: &NewHistory) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO histories (task_id, project_id, user_id, history_text) VALUES ($1, $2, $3, $4)",
        )
        .bind(input.task_id)
        .bind(input.project_id)
        .bind(input.user_id)
        .bind(&input.history_text)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// History of one task, newest first.
    pub async fn list_by_task(pool: &PgPool, task_id: DbId) -> Result<Vec<History>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM histories h
             JOIN users u ON u.id = h.user_id
             WHERE h.task_id = $1
             ORDER BY h.created_at DESC, h.id DESC"
        );
        sqlx::query_as::<_, History>(&query)
            .bind(task_id)
            .fetch_all(pool)
            .await
    }

    /// Recent activity on live tasks the user created, is assigned to, or acted on.
    pub async fn recent_for_user(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
    ) -> Result<Vec<History>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM histories h
             JOIN users u ON u.id = h.user_id
             JOIN tasks t ON t.id = h.task_id AND t.deleted_at IS NULL
             WHERE h.user_id = $1
                OR t.creator_user_id = $1
                OR EXISTS (SELECT 1 FROM task_assignees ta WHERE ta.task_id = t.id AND ta.user_id = $1)
             ORDER BY h.created_at DESC, h.id DESC
             LIMIT $2"
        );
        sqlx::query_as::<_, History>(&query)
            .bind(user_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// A page of activity matching `filter`, newest first.
    pub async fn list_activities(
        pool: &PgPool,
        filter: &ActivityFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Activity>, sqlx::Error> {
        let query = format!(
            "SELECT {ACTIVITY_COLUMNS} {ACTIVITY_SCOPE}
             ORDER BY h.created_at DESC, h.id DESC
             LIMIT $6 OFFSET $7"
        );
        sqlx::query_as::<_, Activity>(&query)
            .bind(&filter.department_ids)
            .bind(filter.viewer_id)
            .bind(filter.project_id)
            .bind(filter.user_id)
            .bind(filter.since)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count_activities(pool: &PgPool, filter: &ActivityFilter) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*) {ACTIVITY_SCOPE}");
        let count: Option<i64> = sqlx::query_scalar(&query)
            .bind(&filter.department_ids)
            .bind(filter.viewer_id)
            .bind(filter.project_id)
            .bind(filter.user_id)
            .bind(filter.since)
            .fetch_one(pool)
            .await?;
        Ok(count.unwrap_or(0))
    }

    /// Users with the most activity matching `filter`.
    pub async fn top_users(
        pool: &PgPool,
        filter: &ActivityFilter,
        limit: i64,
    ) -> Result<Vec<UserActivityCount>, sqlx::Error> {
        let query = format!(
            "SELECT h.user_id, u.full_name, COUNT(*) AS count {ACTIVITY_SCOPE}
             GROUP BY h.user_id, u.full_name
             ORDER BY count DESC, h.user_id
             LIMIT $6"
        );
        sqlx::query_as::<_, UserActivityCount>(&query)
            .bind(&filter.department_ids)
            .bind(filter.viewer_id)
            .bind(filter.project_id)
            .bind(filter.user_id)
            .bind(filter.since)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Tasks with the most activity matching `filter`.
    pub async fn top_tasks(
        pool: &PgPool,
        filter: &ActivityFilter,
        limit: i64,
    ) -> Result<Vec<TaskActivityCount>, sqlx::Error> {
        let query = format!(
            "SELECT h.task_id, t.name AS task_name, COUNT(*) AS count {ACTIVITY_SCOPE}
               AND h.task_id IS NOT NULL
             GROUP BY h.task_id, t.name
             ORDER BY count DESC, h.task_id
             LIMIT $6"
        );
        sqlx::query_as::<_, TaskActivityCount>(&query)
            .bind(&filter.department_ids)
            .bind(filter.viewer_id)
            .bind(filter.project_id)
            .bind(filter.user_id)
            .bind(filter.since)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Activity per UTC calendar day. Days without activity are absent.
    pub async fn daily_counts(
        pool: &PgPool,
        filter: &ActivityFilter,
    ) -> Result<Vec<DailyActivityRow>, sqlx::Error> {
        let query = format!(
            "SELECT (h.created_at AT TIME ZONE 'UTC')::DATE AS day, COUNT(*) AS count {ACTIVITY_SCOPE}
             GROUP BY day
             ORDER BY day"
        );
        sqlx::query_as::<_, DailyActivityRow>(&query)
            .bind(&filter.department_ids)
            .bind(filter.viewer_id)
            .bind(filter.project_id)
            .bind(filter.user_id)
            .bind(filter.since)
            .fetch_all(pool)
            .await
    }
}
