//! Read-only queries backing reports and the dashboard.

use projectflows_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::report::{DashboardStats, ReportTaskRow};

pub struct ReportRepo;

impl ReportRepo {
    /// Live tasks created inside `[start, end]` in live projects of the
    /// given departments.
    pub async fn tasks_in_window(
        pool: &PgPool,
        department_ids: &[DbId],
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<ReportTaskRow>, sqlx::Error> {
        sqlx::query_as::<_, ReportTaskRow>(
            "SELECT t.id, t.name, t.project_id, p.name AS project_name, p.department_id,
                    s.name AS status_name, s.status_type, t.priority, t.is_closed, t.close_type,
                    t.due_date, t.created_at,
                    COALESCE((SELECT ARRAY_AGG(ta.user_id ORDER BY ta.id) FROM task_assignees ta
                              WHERE ta.task_id = t.id), '{}') AS assignee_user_ids
             FROM tasks t
             JOIN projects p ON p.id = t.project_id AND p.deleted_at IS NULL
             JOIN statuses s ON s.id = t.status_id
             WHERE t.deleted_at IS NULL
               AND p.department_id = ANY($1)
               AND t.created_at BETWEEN $2 AND $3
             ORDER BY t.created_at DESC, t.id DESC",
        )
        .bind(department_ids)
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await
    }

    /// Counters over live tasks assigned to `user_id`.
    pub async fn dashboard_stats(pool: &PgPool, user_id: DbId) -> Result<DashboardStats, sqlx::Error> {
        sqlx::query_as::<_, DashboardStats>(
            "SELECT COUNT(*) AS assigned,
                    COUNT(*) FILTER (WHERE NOT t.is_closed) AS open,
                    COUNT(*) FILTER (WHERE t.close_type = 'COMPLETED') AS completed,
                    COUNT(*) FILTER (WHERE NOT t.is_closed AND t.due_date < NOW()) AS overdue,
                    COUNT(*) FILTER (WHERE NOT t.is_closed
                                       AND t.due_date >= NOW()
                                       AND t.due_date < NOW() + INTERVAL '7 days') AS due_this_week
             FROM tasks t
             JOIN projects p ON p.id = t.project_id AND p.deleted_at IS NULL
             WHERE t.deleted_at IS NULL
               AND EXISTS (SELECT 1 FROM task_assignees ta WHERE ta.task_id = t.id AND ta.user_id = $1)",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Active, live users per department, for departments with any.
    pub async fn personnel_counts(
        pool: &PgPool,
        department_ids: &[DbId],
    ) -> Result<Vec<(DbId, i64)>, sqlx::Error> {
        sqlx::query_as::<_, (DbId, i64)>(
            "SELECT department_id, COUNT(*) FROM users
             WHERE deleted_at IS NULL AND status = 'ACTIVE' AND department_id = ANY($1)
             GROUP BY department_id",
        )
        .bind(department_ids)
        .fetch_all(pool)
        .await
    }
}
