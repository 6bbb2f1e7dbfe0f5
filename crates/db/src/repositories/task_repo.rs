//! Repository for the `tasks` and `task_assignees` tables.

use projectflows_core::service_request::status_after_task_close;
use projectflows_core::task::AssigneeDiff;
use projectflows_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::history::NewHistory;
use crate::models::task::{
    BulkTaskChanges, CloseTask, ClosedTask, CreateTask, OverviewTaskRow, Task, TaskChanges,
    TaskFilter, TaskListItem, TaskQuery,
};
use crate::repositories::{HistoryRepo, ServiceRequestRepo};

/// Task columns plus the aggregated assignee ids. Queries alias `tasks` as `t`.
pub(crate) const COLUMNS: &str = "t.id, t.project_id, t.name, t.description, t.status_id, t.priority, \
    t.difficulty, t.assignee_user_id, t.creator_user_id, t.parent_task_id, t.phase_id, \
    t.start_date, t.due_date, t.is_closed, t.close_type, t.close_date, t.closed_by_user_id, \
    t.created_at, t.updated_at, \
    COALESCE((SELECT ARRAY_AGG(ta.user_id ORDER BY ta.id) FROM task_assignees ta \
              WHERE ta.task_id = t.id), '{}') AS assignee_user_ids";

/// Visibility and filter predicates of the cross-project list. Binds `$1`
/// department ids (NULL = all), `$2` viewer, `$3`..`$7` the optional filters.
const QUERY_PREDICATES: &str = "t.deleted_at IS NULL
       AND ($1::BIGINT[] IS NULL OR p.department_id = ANY($1) OR p.owner_user_id = $2
            OR t.creator_user_id = $2
            OR EXISTS (SELECT 1 FROM task_assignees ta WHERE ta.task_id = t.id AND ta.user_id = $2))
       AND ($3::BIGINT IS NULL OR t.project_id = $3)
       AND ($4::BIGINT IS NULL OR t.status_id = $4)
       AND ($5::BIGINT IS NULL OR EXISTS (
            SELECT 1 FROM task_assignees ta WHERE ta.task_id = t.id AND ta.user_id = $5))
       AND ($6::INT IS NULL OR t.priority = $6)
       AND ($7::BOOLEAN IS NULL OR t.is_closed = $7)";

/// Provides CRUD and lifecycle operations for tasks.
pub struct TaskRepo;

impl TaskRepo {
    async fn fetch(conn: &mut PgConnection, id: DbId) -> Result<Task, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tasks t WHERE t.id = $1");
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_one(&mut *conn)
            .await
    }

    async fn add_assignees(
        conn: &mut PgConnection,
        task_id: DbId,
        user_ids: &[DbId],
        assigned_by: DbId,
    ) -> Result<(), sqlx::Error> {
        for user_id in user_ids {
            sqlx::query(
                "INSERT INTO task_assignees (task_id, user_id, assigned_by) VALUES ($1, $2, $3)
                 ON CONFLICT ON CONSTRAINT uq_task_assignees_task_user DO NOTHING",
            )
            .bind(task_id)
            .bind(user_id)
            .bind(assigned_by)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    /// Insert a task with its assignees and a creation history line.
    pub async fn create(
        pool: &PgPool,
        input: &CreateTask,
        history_text: &str,
    ) -> Result<Task, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let task = Self::insert(&mut *tx, input, history_text).await?;
        tx.commit().await?;
        Ok(task)
    }

    /// Insert a task on an open transaction.
    pub(crate) async fn insert(
        conn: &mut PgConnection,
        input: &CreateTask,
        history_text: &str,
    ) -> Result<Task, sqlx::Error> {
        let id: DbId = sqlx::query_scalar(
            "INSERT INTO tasks
                (project_id, name, description, status_id, priority, difficulty, assignee_user_id,
                 creator_user_id, parent_task_id, phase_id, start_date, due_date)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING id",
        )
        .bind(input.project_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.status_id)
        .bind(input.priority)
        .bind(input.difficulty)
        .bind(input.assignee_user_ids.first().copied())
        .bind(input.creator_user_id)
        .bind(input.parent_task_id)
        .bind(input.phase_id)
        .bind(input.start_date)
        .bind(input.due_date)
        .fetch_one(&mut *conn)
        .await?;

        Self::add_assignees(&mut *conn, id, &input.assignee_user_ids, input.creator_user_id).await?;
        HistoryRepo::insert(
            &mut *conn,
            &NewHistory::for_task(id, input.project_id, input.creator_user_id, history_text.to_string()),
        )
        .await?;

        Self::fetch(&mut *conn, id).await
    }

    /// Find a live task by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Task>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tasks t WHERE t.id = $1 AND t.deleted_at IS NULL");
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Live tasks among `ids`, in id order.
    pub async fn list_by_ids(pool: &PgPool, ids: &[DbId]) -> Result<Vec<Task>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM tasks t WHERE t.id = ANY($1) AND t.deleted_at IS NULL ORDER BY t.id"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    /// Tasks of one project matching `filter`.
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: DbId,
        filter: &TaskFilter,
    ) -> Result<Vec<Task>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM tasks t
             WHERE t.project_id = $1 AND t.deleted_at IS NULL
               AND ($2::BIGINT IS NULL OR t.status_id = $2)
               AND ($3::BIGINT IS NULL OR EXISTS (
                    SELECT 1 FROM task_assignees ta WHERE ta.task_id = t.id AND ta.user_id = $3))
               AND ($4 OR t.is_closed = false)
               AND ($5::BIGINT IS NULL OR t.parent_task_id = $5)
             ORDER BY t.priority, t.due_date NULLS LAST, t.id"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(project_id)
            .bind(filter.status_id)
            .bind(filter.assignee_user_id)
            .bind(filter.include_closed)
            .bind(filter.parent_task_id)
            .fetch_all(pool)
            .await
    }

    /// Tasks across projects the viewer can see, newest first, with
    /// comment, subtask and checklist counts.
    pub async fn list(pool: &PgPool, query: &TaskQuery) -> Result<Vec<TaskListItem>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS},
                    (SELECT COUNT(*) FROM comments c
                     WHERE c.task_id = t.id AND c.deleted_at IS NULL) AS comment_count,
                    (SELECT COUNT(*) FROM tasks st
                     WHERE st.parent_task_id = t.id AND st.deleted_at IS NULL) AS subtask_count,
                    (SELECT COUNT(*) FROM checklists cl
                     WHERE cl.task_id = t.id AND cl.deleted_at IS NULL) AS checklist_count
             FROM tasks t
             JOIN projects p ON p.id = t.project_id AND p.deleted_at IS NULL
             WHERE {QUERY_PREDICATES}
             ORDER BY t.created_at DESC, t.id DESC
             LIMIT $8 OFFSET $9"
        );
        sqlx::query_as::<_, TaskListItem>(&sql)
            .bind(&query.department_ids)
            .bind(query.viewer_id)
            .bind(query.project_id)
            .bind(query.status_id)
            .bind(query.assignee_user_id)
            .bind(query.priority)
            .bind(query.is_closed)
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool, query: &TaskQuery) -> Result<i64, sqlx::Error> {
        let sql = format!(
            "SELECT COUNT(*) FROM tasks t
             JOIN projects p ON p.id = t.project_id AND p.deleted_at IS NULL
             WHERE {QUERY_PREDICATES}"
        );
        let count: Option<i64> = sqlx::query_scalar(&sql)
            .bind(&query.department_ids)
            .bind(query.viewer_id)
            .bind(query.project_id)
            .bind(query.status_id)
            .bind(query.assignee_user_id)
            .bind(query.priority)
            .bind(query.is_closed)
            .fetch_one(pool)
            .await?;
        Ok(count.unwrap_or(0))
    }

    /// Live tasks of live projects in the given departments, as read by the
    /// division overview. Soonest due first.
    pub async fn list_for_overview(
        pool: &PgPool,
        department_ids: &[DbId],
    ) -> Result<Vec<OverviewTaskRow>, sqlx::Error> {
        sqlx::query_as::<_, OverviewTaskRow>(
            "SELECT t.id, t.name, t.project_id, p.department_id, t.priority, s.status_type,
                    t.is_closed, t.close_type, t.due_date, t.start_date, t.created_at,
                    COALESCE((SELECT ARRAY_AGG(ta.user_id ORDER BY ta.id) FROM task_assignees ta
                              WHERE ta.task_id = t.id), '{}') AS assignee_user_ids
             FROM tasks t
             JOIN projects p ON p.id = t.project_id AND p.deleted_at IS NULL
             JOIN statuses s ON s.id = t.status_id
             WHERE t.deleted_at IS NULL AND p.department_id = ANY($1)
             ORDER BY t.due_date NULLS LAST, t.priority, t.id",
        )
        .bind(department_ids)
        .fetch_all(pool)
        .await
    }

    /// Tasks of live projects in the given departments.
    pub async fn list_by_department(
        pool: &PgPool,
        department_id: DbId,
        include_closed: bool,
    ) -> Result<Vec<Task>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM tasks t
             JOIN projects p ON p.id = t.project_id AND p.deleted_at IS NULL
             WHERE p.department_id = $1 AND t.deleted_at IS NULL
               AND ($2 OR t.is_closed = false)
             ORDER BY t.project_id, t.priority, t.due_date NULLS LAST, t.id"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(department_id)
            .bind(include_closed)
            .fetch_all(pool)
            .await
    }

    /// Open tasks assigned to a user, soonest due first.
    pub async fn list_open_for_assignee(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
    ) -> Result<Vec<Task>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM tasks t
             JOIN projects p ON p.id = t.project_id AND p.deleted_at IS NULL
             WHERE t.deleted_at IS NULL AND t.is_closed = false
               AND EXISTS (SELECT 1 FROM task_assignees ta WHERE ta.task_id = t.id AND ta.user_id = $1)
             ORDER BY t.due_date NULLS LAST, t.priority, t.id
             LIMIT $2"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(user_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Write the full next state of a task.
    ///
    /// When `assignees` is given the assignee set and the mirrored primary
    /// assignee column are replaced in the same transaction. One history
    /// row is written per entry of `histories`.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        changes: &TaskChanges,
        assignees: Option<&AssigneeDiff>,
        actor_id: DbId,
        histories: &[String],
    ) -> Result<Option<Task>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let project_id: Option<DbId> = sqlx::query_scalar(
            "UPDATE tasks SET
                name = $2,
                description = $3,
                status_id = $4,
                priority = $5,
                difficulty = $6,
                parent_task_id = $7,
                phase_id = $8,
                start_date = $9,
                due_date = $10,
                assignee_user_id = CASE WHEN $11 THEN $12 ELSE assignee_user_id END
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING project_id",
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(changes.status_id)
        .bind(changes.priority)
        .bind(changes.difficulty)
        .bind(changes.parent_task_id)
        .bind(changes.phase_id)
        .bind(changes.start_date)
        .bind(changes.due_date)
        .bind(assignees.is_some())
        .bind(assignees.and_then(AssigneeDiff::primary))
        .fetch_optional(&mut *tx)
        .await?;

        let Some(project_id) = project_id else {
            return Ok(None);
        };

        if let Some(diff) = assignees {
            sqlx::query("DELETE FROM task_assignees WHERE task_id = $1 AND user_id = ANY($2)")
                .bind(id)
                .bind(&diff.removed)
                .execute(&mut *tx)
                .await?;
            Self::add_assignees(&mut *tx, id, &diff.added, actor_id).await?;
        }

        for text in histories {
            HistoryRepo::insert(
                &mut *tx,
                &NewHistory::for_task(id, project_id, actor_id, text.clone()),
            )
            .await?;
        }

        let task = Self::fetch(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(Some(task))
    }

    /// Close an open task.
    ///
    /// A service request linked to the task is finished in the same
    /// transaction. Returns `None` when the task is missing or already closed.
    pub async fn close(
        pool: &PgPool,
        id: DbId,
        input: &CloseTask,
    ) -> Result<Option<ClosedTask>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let project_id: Option<DbId> = sqlx::query_scalar(
            "UPDATE tasks SET
                is_closed = true,
                close_type = $2,
                close_date = NOW(),
                closed_by_user_id = $3
             WHERE id = $1 AND deleted_at IS NULL AND is_closed = false
             RETURNING project_id",
        )
        .bind(id)
        .bind(input.close_type.as_str())
        .bind(input.closed_by_user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(project_id) = project_id else {
            return Ok(None);
        };

        HistoryRepo::insert(
            &mut *tx,
            &NewHistory::for_task(id, project_id, input.closed_by_user_id, input.history_text.clone()),
        )
        .await?;

        let finished_request = ServiceRequestRepo::finish_for_task(
            &mut *tx,
            id,
            status_after_task_close(input.close_type),
            &input.request_timeline_text,
            input.closed_by_user_id,
        )
        .await?;

        let task = Self::fetch(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(Some(ClosedTask {
            task,
            finished_request,
        }))
    }

    /// Reopen a closed task. Returns `None` when the task is missing or open.
    pub async fn reopen(
        pool: &PgPool,
        id: DbId,
        actor_id: DbId,
        history_text: &str,
    ) -> Result<Option<Task>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let project_id: Option<DbId> = sqlx::query_scalar(
            "UPDATE tasks SET
                is_closed = false,
                close_type = NULL,
                close_date = NULL,
                closed_by_user_id = NULL
             WHERE id = $1 AND deleted_at IS NULL AND is_closed = true
             RETURNING project_id",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(project_id) = project_id else {
            return Ok(None);
        };

        HistoryRepo::insert(
            &mut *tx,
            &NewHistory::for_task(id, project_id, actor_id, history_text.to_string()),
        )
        .await?;

        let task = Self::fetch(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(Some(task))
    }

    /// Soft-delete a task and its subtasks. Returns `true` if the task was updated.
    pub async fn soft_delete(
        pool: &PgPool,
        id: DbId,
        actor_id: DbId,
        history_text: &str,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let project_id: Option<DbId> = sqlx::query_scalar(
            "UPDATE tasks SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL
             RETURNING project_id",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(project_id) = project_id else {
            return Ok(false);
        };

        sqlx::query(
            "UPDATE tasks SET deleted_at = NOW() WHERE parent_task_id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        HistoryRepo::insert(
            &mut *tx,
            &NewHistory {
                task_id: None,
                project_id: Some(project_id),
                user_id: actor_id,
                history_text: history_text.to_string(),
            },
        )
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Apply the same changes to every task in `ids` in one transaction.
    ///
    /// Closed tasks are left untouched. Returns the number of tasks updated;
    /// each updated task gets one history row.
    pub async fn bulk_update(
        pool: &PgPool,
        ids: &[DbId],
        changes: &BulkTaskChanges,
        actor_id: DbId,
        history_text: &str,
    ) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let updated: Vec<(DbId, DbId)> = sqlx::query_as(
            "UPDATE tasks SET
                status_id = COALESCE($2, status_id),
                priority = COALESCE($3, priority),
                difficulty = COALESCE($4, difficulty),
                due_date = COALESCE($5, due_date)
             WHERE id = ANY($1) AND deleted_at IS NULL AND is_closed = FALSE
             RETURNING id, project_id",
        )
        .bind(ids)
        .bind(changes.status_id)
        .bind(changes.priority)
        .bind(changes.difficulty)
        .bind(changes.due_date)
        .fetch_all(&mut *tx)
        .await?;

        for (task_id, project_id) in &updated {
            HistoryRepo::insert(
                &mut *tx,
                &NewHistory::for_task(*task_id, *project_id, actor_id, history_text.to_string()),
            )
            .await?;
        }

        tx.commit().await?;
        Ok(updated.len() as u64)
    }
}
