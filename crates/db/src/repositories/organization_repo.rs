//! Repository for `mission_groups`, `divisions` and `departments`.

use projectflows_core::scope::{DepartmentNode, DivisionNode, OrgHierarchy};
use projectflows_core::types::DbId;
use sqlx::PgPool;

use crate::models::organization::{
    CreateDepartment, CreateDivision, CreateMissionGroup, Department, Division, MissionGroup,
    UpdateDepartment,
};

const MISSION_GROUP_COLUMNS: &str = "id, name, created_at, updated_at";
const DIVISION_COLUMNS: &str = "id, mission_group_id, name, created_at, updated_at";
const DEPARTMENT_COLUMNS: &str = "id, division_id, name, tel, created_at, updated_at";

/// Provides access to the organizational hierarchy.
pub struct OrganizationRepo;

impl OrganizationRepo {
    /// Build the live hierarchy used by scope resolution.
    ///
    /// A division under a deleted mission group, or a department under a
    /// deleted division, is left out.
    pub async fn load_hierarchy(pool: &PgPool) -> Result<OrgHierarchy, sqlx::Error> {
        let mission_groups: Vec<DbId> =
            sqlx::query_scalar("SELECT id FROM mission_groups WHERE deleted_at IS NULL")
                .fetch_all(pool)
                .await?;

        let divisions: Vec<(DbId, DbId)> = sqlx::query_as(
            "SELECT d.id, d.mission_group_id FROM divisions d
             JOIN mission_groups m ON m.id = d.mission_group_id AND m.deleted_at IS NULL
             WHERE d.deleted_at IS NULL",
        )
        .fetch_all(pool)
        .await?;

        let departments: Vec<(DbId, DbId)> = sqlx::query_as(
            "SELECT id, division_id FROM departments WHERE deleted_at IS NULL",
        )
        .fetch_all(pool)
        .await?;

        let divisions: Vec<DivisionNode> = divisions
            .into_iter()
            .map(|(id, mission_group_id)| DivisionNode {
                id,
                mission_group_id,
            })
            .collect();
        let departments: Vec<DepartmentNode> = departments
            .into_iter()
            .map(|(id, division_id)| DepartmentNode { id, division_id })
            .collect();

        Ok(OrgHierarchy::new(mission_groups, &divisions, &departments))
    }

    // -- Mission groups ----------------------------------------------------

    pub async fn list_mission_groups(pool: &PgPool) -> Result<Vec<MissionGroup>, sqlx::Error> {
        let query = format!(
            "SELECT {MISSION_GROUP_COLUMNS} FROM mission_groups
             WHERE deleted_at IS NULL ORDER BY name, id"
        );
        sqlx::query_as::<_, MissionGroup>(&query).fetch_all(pool).await
    }

    pub async fn find_mission_group(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<MissionGroup>, sqlx::Error> {
        let query = format!(
            "SELECT {MISSION_GROUP_COLUMNS} FROM mission_groups WHERE id = $1 AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, MissionGroup>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create_mission_group(
        pool: &PgPool,
        input: &CreateMissionGroup,
    ) -> Result<MissionGroup, sqlx::Error> {
        let query = format!(
            "INSERT INTO mission_groups (name) VALUES ($1) RETURNING {MISSION_GROUP_COLUMNS}"
        );
        sqlx::query_as::<_, MissionGroup>(&query)
            .bind(input.name.trim())
            .fetch_one(pool)
            .await
    }

    // -- Divisions ---------------------------------------------------------

    /// List divisions, optionally restricted to one mission group.
    pub async fn list_divisions(
        pool: &PgPool,
        mission_group_id: Option<DbId>,
    ) -> Result<Vec<Division>, sqlx::Error> {
        let query = format!(
            "SELECT {DIVISION_COLUMNS} FROM divisions
             WHERE deleted_at IS NULL AND ($1::BIGINT IS NULL OR mission_group_id = $1)
             ORDER BY name, id"
        );
        sqlx::query_as::<_, Division>(&query)
            .bind(mission_group_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_division(pool: &PgPool, id: DbId) -> Result<Option<Division>, sqlx::Error> {
        let query =
            format!("SELECT {DIVISION_COLUMNS} FROM divisions WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Division>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create_division(
        pool: &PgPool,
        input: &CreateDivision,
    ) -> Result<Division, sqlx::Error> {
        let query = format!(
            "INSERT INTO divisions (mission_group_id, name) VALUES ($1, $2)
             RETURNING {DIVISION_COLUMNS}"
        );
        sqlx::query_as::<_, Division>(&query)
            .bind(input.mission_group_id)
            .bind(input.name.trim())
            .fetch_one(pool)
            .await
    }

    // -- Departments -------------------------------------------------------

    /// List departments, optionally restricted to one division.
    pub async fn list_departments(
        pool: &PgPool,
        division_id: Option<DbId>,
    ) -> Result<Vec<Department>, sqlx::Error> {
        let query = format!(
            "SELECT {DEPARTMENT_COLUMNS} FROM departments
             WHERE deleted_at IS NULL AND ($1::BIGINT IS NULL OR division_id = $1)
             ORDER BY name, id"
        );
        sqlx::query_as::<_, Department>(&query)
            .bind(division_id)
            .fetch_all(pool)
            .await
    }

    pub async fn create_department(
        pool: &PgPool,
        input: &CreateDepartment,
    ) -> Result<Department, sqlx::Error> {
        let query = format!(
            "INSERT INTO departments (division_id, name, tel) VALUES ($1, $2, $3)
             RETURNING {DEPARTMENT_COLUMNS}"
        );
        sqlx::query_as::<_, Department>(&query)
            .bind(input.division_id)
            .bind(input.name.trim())
            .bind(&input.tel)
            .fetch_one(pool)
            .await
    }

    /// Update a department. Only non-`None` fields in `input` are applied.
    pub async fn update_department(
        pool: &PgPool,
        id: DbId,
        input: &UpdateDepartment,
    ) -> Result<Option<Department>, sqlx::Error> {
        let query = format!(
            "UPDATE departments SET
                division_id = COALESCE($2, division_id),
                name = COALESCE($3, name),
                tel = COALESCE($4, tel)
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {DEPARTMENT_COLUMNS}"
        );
        sqlx::query_as::<_, Department>(&query)
            .bind(id)
            .bind(input.division_id)
            .bind(input.name.as_deref().map(str::trim))
            .bind(&input.tel)
            .fetch_optional(pool)
            .await
    }

    /// Count live users and projects still attached to a department.
    pub async fn department_dependents(pool: &PgPool, id: DbId) -> Result<i64, sqlx::Error> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT (SELECT COUNT(*) FROM users WHERE department_id = $1 AND deleted_at IS NULL)
                  + (SELECT COUNT(*) FROM projects WHERE department_id = $1 AND deleted_at IS NULL)",
        )
        .bind(id)
        .fetch_one(pool)
        .await?;
        Ok(count.unwrap_or(0))
    }

    /// Soft-delete a department. Returns `true` if the row was updated.
    pub async fn soft_delete_department(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE departments SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
