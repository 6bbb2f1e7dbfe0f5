//! Repository for the `projects` table.

use projectflows_core::progress::{calculate_progress, ProgressResult, ProgressTask};
use projectflows_core::task::CloseType;
use projectflows_core::types::DbId;
use sqlx::PgPool;

use crate::models::project::{CreateProject, Project, ProjectFilter, UpdateProject};
use crate::models::task::ProgressRow;
use crate::repositories::StatusRepo;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, description, department_id, owner_user_id, created_by, status, \
                       start_date, end_date, color, progress, progress_updated_at, created_at, updated_at";

/// Visibility predicate shared by `list` and `count`: `$1` departments
/// (NULL = all), `$2` owner, `$3` status, `$4` name search.
const LIST_FILTER: &str = "deleted_at IS NULL
       AND ($1::BIGINT[] IS NULL OR department_id = ANY($1) OR owner_user_id = $2)
       AND ($3::TEXT IS NULL OR status = $3)
       AND ($4::TEXT IS NULL OR name ILIKE '%' || $4 || '%')";

/// Provides CRUD operations for projects.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Insert a project together with its default statuses.
    pub async fn create(pool: &PgPool, input: &CreateProject) -> Result<Project, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO projects
                (name, description, department_id, owner_user_id, created_by, status,
                 start_date, end_date, color)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        let project = sqlx::query_as::<_, Project>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.department_id)
            .bind(input.owner_user_id)
            .bind(input.created_by)
            .bind(&input.status)
            .bind(input.start_date)
            .bind(input.end_date)
            .bind(&input.color)
            .fetch_one(&mut *tx)
            .await?;

        StatusRepo::insert_defaults(&mut *tx, project.id).await?;

        tx.commit().await?;
        Ok(project)
    }

    /// Find a live project by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Live projects among `ids`. Missing and deleted ids are skipped.
    pub async fn list_by_ids(pool: &PgPool, ids: &[DbId]) -> Result<Vec<Project>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM projects WHERE id = ANY($1) AND deleted_at IS NULL ORDER BY id"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    /// One page of projects matching `filter`, most recently updated first.
    pub async fn list(pool: &PgPool, filter: &ProjectFilter) -> Result<Vec<Project>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM projects
             WHERE {LIST_FILTER}
             ORDER BY updated_at DESC, id DESC
             LIMIT $5 OFFSET $6"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(&filter.department_ids)
            .bind(filter.owner_user_id)
            .bind(&filter.status)
            .bind(&filter.search)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(pool)
            .await
    }

    /// Count projects matching `filter`, ignoring its limit and offset.
    pub async fn count(pool: &PgPool, filter: &ProjectFilter) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*) FROM projects WHERE {LIST_FILTER}");
        let count: Option<i64> = sqlx::query_scalar(&query)
            .bind(&filter.department_ids)
            .bind(filter.owner_user_id)
            .bind(&filter.status)
            .bind(&filter.search)
            .fetch_one(pool)
            .await?;
        Ok(count.unwrap_or(0))
    }

    /// Every visible project, by name. Used by the workspace tree.
    pub async fn list_visible(
        pool: &PgPool,
        department_ids: Option<&[DbId]>,
        owner_user_id: DbId,
    ) -> Result<Vec<Project>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM projects
             WHERE deleted_at IS NULL
               AND ($1::BIGINT[] IS NULL OR department_id = ANY($1) OR owner_user_id = $2)
             ORDER BY name, id"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(department_ids)
            .bind(owner_user_id)
            .fetch_all(pool)
            .await
    }

    /// Live projects of the given departments.
    pub async fn list_by_departments(
        pool: &PgPool,
        department_ids: &[DbId],
    ) -> Result<Vec<Project>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM projects
             WHERE deleted_at IS NULL AND department_id = ANY($1)
             ORDER BY name, id"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(department_ids)
            .fetch_all(pool)
            .await
    }

    /// Update a project. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no live row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateProject,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET
                name = COALESCE($2, name),
                description = CASE WHEN $10 THEN $3 ELSE description END,
                department_id = COALESCE($4, department_id),
                owner_user_id = COALESCE($5, owner_user_id),
                status = COALESCE($6, status),
                start_date = CASE WHEN $11 THEN $7 ELSE start_date END,
                end_date = CASE WHEN $12 THEN $8 ELSE end_date END,
                color = CASE WHEN $13 THEN $9 ELSE color END
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(input.description.as_ref().and_then(Option::as_deref))
            .bind(input.department_id)
            .bind(input.owner_user_id)
            .bind(&input.status)
            .bind(input.start_date.flatten())
            .bind(input.end_date.flatten())
            .bind(input.color.as_ref().and_then(Option::as_deref))
            .bind(input.description.is_some())
            .bind(input.start_date.is_some())
            .bind(input.end_date.is_some())
            .bind(input.color.is_some())
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a project. Returns `true` if the row was updated.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE projects SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Compute weighted progress from the project's live top-level tasks.
    pub async fn compute_progress(pool: &PgPool, id: DbId) -> Result<ProgressResult, sqlx::Error> {
        let rows = sqlx::query_as::<_, ProgressRow>(
            "SELECT t.difficulty, s.sort_order AS status_order, t.close_type
             FROM tasks t
             LEFT JOIN statuses s ON s.id = t.status_id
             WHERE t.project_id = $1 AND t.deleted_at IS NULL AND t.parent_task_id IS NULL",
        )
        .bind(id)
        .fetch_all(pool)
        .await?;

        let orders: Vec<i32> =
            sqlx::query_scalar("SELECT sort_order FROM statuses WHERE project_id = $1")
                .bind(id)
                .fetch_all(pool)
                .await?;

        let tasks: Vec<ProgressTask> = rows
            .into_iter()
            .map(|row| ProgressTask {
                difficulty: row.difficulty,
                status_order: row.status_order,
                close_type: row.close_type.as_deref().and_then(CloseType::parse),
            })
            .collect();

        Ok(calculate_progress(&tasks, &orders))
    }

    /// Recompute and cache a project's progress.
    pub async fn refresh_progress(pool: &PgPool, id: DbId) -> Result<ProgressResult, sqlx::Error> {
        let result = Self::compute_progress(pool, id).await?;
        sqlx::query(
            "UPDATE projects SET progress = $2, progress_updated_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(result.progress)
        .execute(pool)
        .await?;
        tracing::debug!(project_id = id, progress = result.progress, "Project progress refreshed");
        Ok(result)
    }
}
