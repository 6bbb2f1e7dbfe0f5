//! Repository for the `notifications` table.

use projectflows_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::activity::ActivityFilter;
use crate::models::notification::{NewNotification, Notification};

/// Column list for `notifications` queries.
const COLUMNS: &str = "id, user_id, triggered_by_user_id, notification_type, message, \
                       task_id, service_request_id, is_read, read_at, created_at";

/// Provides CRUD operations for notifications.
pub struct NotificationRepo;

impl NotificationRepo {
    /// Insert a batch of notifications atomically. Returns the number inserted.
    pub async fn create_many(
        pool: &PgPool,
        notifications: &[NewNotification],
    ) -> Result<usize, sqlx::Error> {
        if notifications.is_empty() {
            return Ok(0);
        }
        let mut tx = pool.begin().await?;
        Self::insert_all(&mut *tx, notifications).await?;
        tx.commit().await?;
        Ok(notifications.len())
    }

    /// Insert notifications on an open connection or transaction.
    pub(crate) async fn insert_all(
        conn: &mut PgConnection,
        notifications: &[NewNotification],
    ) -> Result<(), sqlx::Error> {
        for n in notifications {
            sqlx::query(
                "INSERT INTO notifications \
                    (user_id, triggered_by_user_id, notification_type, message, task_id, service_request_id) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(n.user_id)
            .bind(n.triggered_by_user_id)
            .bind(n.notification_type)
            .bind(&n.message)
            .bind(n.task_id)
            .bind(n.service_request_id)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    /// List notifications for a user, newest first.
    ///
    /// When `unread_only` is `true`, only notifications with `is_read = false`
    /// are returned.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let filter = if unread_only {
            "AND is_read = false"
        } else {
            ""
        };
        let query = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE user_id = $1 {filter} \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Mark a single notification as read.
    ///
    /// Returns the row when it belongs to `user_id`; already-read rows are
    /// returned unchanged.
    pub async fn mark_read(
        pool: &PgPool,
        notification_id: DbId,
        user_id: DbId,
    ) -> Result<Option<Notification>, sqlx::Error> {
        let query = format!(
            "UPDATE notifications \
             SET is_read = true, read_at = COALESCE(read_at, NOW()) \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(notification_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Mark all unread notifications as read for a user.
    ///
    /// Returns the number of notifications that were marked read.
    pub async fn mark_all_read(pool: &PgPool, user_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications \
             SET is_read = true, read_at = NOW() \
             WHERE user_id = $1 AND is_read = false",
        )
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Get the number of unread notifications for a user.
    pub async fn unread_count(pool: &PgPool, user_id: DbId) -> Result<i64, sqlx::Error> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = false",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;
        Ok(count.unwrap_or(0))
    }

    /// Delete a notification owned by `user_id`. Returns `true` if a row was removed.
    pub async fn delete(
        pool: &PgPool,
        notification_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(notification_id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Task notifications for tasks of projects matching `filter`. The
    /// user filter selects the recipient.
    pub async fn count_matching(pool: &PgPool, filter: &ActivityFilter) -> Result<i64, sqlx::Error> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications n
             JOIN tasks t ON t.id = n.task_id
             JOIN projects p ON p.id = t.project_id AND p.deleted_at IS NULL
             WHERE ($1::BIGINT[] IS NULL OR p.department_id = ANY($1) OR p.owner_user_id = $2)
               AND ($3::BIGINT IS NULL OR t.project_id = $3)
               AND ($4::BIGINT IS NULL OR n.user_id = $4)
               AND ($5::TIMESTAMPTZ IS NULL OR n.created_at >= $5)",
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
