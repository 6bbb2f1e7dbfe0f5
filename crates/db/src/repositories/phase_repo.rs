//! Repository for the `phases` table.

use projectflows_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::phase::{CreatePhase, Phase};

const COLUMNS: &str =
    "id, project_id, name, sort_order, start_date, end_date, created_at, updated_at";

pub struct PhaseRepo;

impl PhaseRepo {
    pub async fn list_by_project(pool: &PgPool, project_id: DbId) -> Result<Vec<Phase>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM phases
             WHERE project_id = $1 AND deleted_at IS NULL
             ORDER BY sort_order, id"
        );
        sqlx::query_as::<_, Phase>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Phase>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM phases WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Phase>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Insert a phase. Without an explicit order it is appended last.
    pub async fn create(
        pool: &PgPool,
        project_id: DbId,
        input: &CreatePhase,
    ) -> Result<Phase, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        Self::insert(&mut *conn, project_id, input).await
    }

    /// Insert several phases in one transaction, in input order. Phases
    /// without an order are appended after those inserted before them.
    pub async fn create_many(
        pool: &PgPool,
        project_id: DbId,
        inputs: &[CreatePhase],
    ) -> Result<Vec<Phase>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let mut created = Vec::with_capacity(inputs.len());
        for input in inputs {
            created.push(Self::insert(&mut *tx, project_id, input).await?);
        }
        tx.commit().await?;
        Ok(created)
    }

    async fn insert(
        conn: &mut PgConnection,
        project_id: DbId,
        input: &CreatePhase,
    ) -> Result<Phase, sqlx::Error> {
        let query = format!(
            "INSERT INTO phases (project_id, name, sort_order, start_date, end_date)
             VALUES ($1, $2,
                     COALESCE($3, (SELECT COALESCE(MAX(sort_order), 0) + 1 FROM phases
                                   WHERE project_id = $1 AND deleted_at IS NULL)),
                     $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Phase>(&query)
            .bind(project_id)
            .bind(&input.name)
            .bind(input.sort_order)
            .bind(input.start_date)
            .bind(input.end_date)
            .fetch_one(&mut *conn)
            .await
    }
}
