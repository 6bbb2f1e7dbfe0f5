//! Mission group, division and department models.

use projectflows_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `mission_groups` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MissionGroup {
    pub id: DbId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `divisions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Division {
    pub id: DbId,
    pub mission_group_id: DbId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `departments` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Department {
    pub id: DbId,
    pub division_id: DbId,
    pub name: String,
    pub tel: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMissionGroup {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDivision {
    pub mission_group_id: DbId,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDepartment {
    pub division_id: DbId,
    pub name: String,
    pub tel: Option<String>,
}

/// DTO for updating a department. All fields are optional.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateDepartment {
    pub division_id: Option<DbId>,
    pub name: Option<String>,
    pub tel: Option<String>,
}
