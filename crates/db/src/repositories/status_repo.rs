//! Repository for the `statuses` table.

use projectflows_core::task::{StatusType, DEFAULT_STATUSES};
use projectflows_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::status::{CreateStatus, Status, UpdateStatus};

const COLUMNS: &str = "id, project_id, name, color, sort_order, status_type, created_at, updated_at";

/// Provides CRUD operations for project workflow statuses.
pub struct StatusRepo;

impl StatusRepo {
    /// Statuses of a project in workflow order.
    pub async fn list_by_project(pool: &PgPool, project_id: DbId) -> Result<Vec<Status>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM statuses WHERE project_id = $1 ORDER BY sort_order, id"
        );
        sqlx::query_as::<_, Status>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Status>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM statuses WHERE id = $1");
        sqlx::query_as::<_, Status>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The status new tasks start in: the lowest-ordered NOT_STARTED one,
    /// falling back to the lowest-ordered status of any type.
    pub async fn initial_status(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Option<Status>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM statuses WHERE project_id = $1
             ORDER BY (status_type = $2) DESC, sort_order, id
             LIMIT 1"
        );
        sqlx::query_as::<_, Status>(&query)
            .bind(project_id)
            .bind(StatusType::NotStarted.as_str())
            .fetch_optional(pool)
            .await
    }

    /// The lowest-ordered NOT_STARTED status, if the project has one.
    pub async fn first_not_started(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Option<Status>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM statuses WHERE project_id = $1 AND status_type = $2
             ORDER BY sort_order, id
             LIMIT 1"
        );
        sqlx::query_as::<_, Status>(&query)
            .bind(project_id)
            .bind(StatusType::NotStarted.as_str())
            .fetch_optional(pool)
            .await
    }

    /// One past the highest order in the project.
    pub async fn next_sort_order(pool: &PgPool, project_id: DbId) -> Result<i32, sqlx::Error> {
        let next: Option<i32> = sqlx::query_scalar(
            "SELECT COALESCE(MAX(sort_order), 0) + 1 FROM statuses WHERE project_id = $1",
        )
        .bind(project_id)
        .fetch_one(pool)
        .await?;
        Ok(next.unwrap_or(1))
    }

    pub async fn create(
        pool: &PgPool,
        project_id: DbId,
        input: &CreateStatus,
    ) -> Result<Status, sqlx::Error> {
        let query = format!(
            "INSERT INTO statuses (project_id, name, color, sort_order, status_type)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Status>(&query)
            .bind(project_id)
            .bind(&input.name)
            .bind(&input.color)
            .bind(input.sort_order)
            .bind(&input.status_type)
            .fetch_one(pool)
            .await
    }

    /// Insert several statuses in one transaction, in input order.
    pub async fn create_many(
        pool: &PgPool,
        project_id: DbId,
        inputs: &[CreateStatus],
    ) -> Result<Vec<Status>, sqlx::Error> {
        let query = format!(
            "INSERT INTO statuses (project_id, name, color, sort_order, status_type)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        let mut tx = pool.begin().await?;
        let mut created = Vec::with_capacity(inputs.len());
        for input in inputs {
            let status = sqlx::query_as::<_, Status>(&query)
                .bind(project_id)
                .bind(&input.name)
                .bind(&input.color)
                .bind(input.sort_order)
                .bind(&input.status_type)
                .fetch_one(&mut *tx)
                .await?;
            created.push(status);
        }
        tx.commit().await?;
        Ok(created)
    }

    /// Seed the default Todo / In Progress / Done workflow.
    pub(crate) async fn insert_defaults(
        conn: &mut PgConnection,
        project_id: DbId,
    ) -> Result<(), sqlx::Error> {
        for status in &DEFAULT_STATUSES {
            sqlx::query(
                "INSERT INTO statuses (project_id, name, color, sort_order, status_type)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(project_id)
            .bind(status.name)
            .bind(status.color)
            .bind(status.order)
            .bind(status.status_type.as_str())
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    /// Update a status. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateStatus,
    ) -> Result<Option<Status>, sqlx::Error> {
        let query = format!(
            "UPDATE statuses SET
                name = COALESCE($2, name),
                color = COALESCE($3, color),
                sort_order = COALESCE($4, sort_order),
                status_type = COALESCE($5, status_type)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Status>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.color)
            .bind(input.sort_order)
            .bind(&input.status_type)
            .fetch_optional(pool)
            .await
    }

    /// Number of live tasks sitting in a status.
    pub async fn task_count(pool: &PgPool, id: DbId) -> Result<i64, sqlx::Error> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tasks WHERE status_id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_one(pool)
        .await?;
        Ok(count.unwrap_or(0))
    }

    /// Delete a status. Returns `true` if the row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM statuses WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
