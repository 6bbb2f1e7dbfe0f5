//! User entity model and DTOs.

use projectflows_core::roles::Role;
use projectflows_core::scope::{Actor, ManagedUser};
use projectflows_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Full user row from the `users` table.
///
/// Contains the password hash -- NEVER serialize this to API responses directly.
/// Use [`UserResponse`] for external-facing output.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: String,
    pub department_id: Option<DbId>,
    pub additional_roles: Option<serde_json::Value>,
    pub status: String,
    pub job_title: Option<String>,
    pub phone: Option<String>,
    pub failed_login_count: i32,
    pub locked_until: Option<Timestamp>,
    pub last_login_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    /// Parsed primary role. A value the CHECK constraint should have
    /// rejected degrades to the least privileged role.
    pub fn role(&self) -> Role {
        Role::parse(&self.role).unwrap_or(Role::User)
    }

    /// The permission-layer view of this user.
    pub fn actor(&self) -> Actor {
        Actor::new(
            self.id,
            self.role(),
            self.department_id,
            self.additional_roles.as_ref(),
        )
    }

    pub fn as_managed(&self) -> ManagedUser {
        ManagedUser {
            user_id: self.id,
            role: self.role(),
            department_id: self.department_id,
        }
    }
}

/// Safe user representation for API responses (no password hash).
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: DbId,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub department_id: Option<DbId>,
    pub additional_roles: Option<serde_json::Value>,
    pub status: String,
    pub job_title: Option<String>,
    pub phone: Option<String>,
    pub last_login_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        UserResponse {
            id: user.id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role.clone(),
            department_id: user.department_id,
            additional_roles: user.additional_roles.clone(),
            status: user.status.clone(),
            job_title: user.job_title.clone(),
            phone: user.phone.clone(),
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}

/// Minimal user identity used in lists and notifications.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserSummary {
    pub id: DbId,
    pub full_name: String,
    pub email: String,
    pub role: String,
    pub department_id: Option<DbId>,
}

/// DTO for inserting a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: String,
    pub department_id: Option<DbId>,
    pub additional_roles: Option<serde_json::Value>,
    pub job_title: Option<String>,
    pub phone: Option<String>,
}

/// DTO for updating an existing user. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUser {
    pub full_name: Option<String>,
    pub role: Option<String>,
    pub department_id: Option<DbId>,
    pub additional_roles: Option<serde_json::Value>,
    pub job_title: Option<String>,
    pub phone: Option<String>,
}

/// Filters for the user list.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// `None` lists every department.
    pub department_ids: Option<Vec<DbId>>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub limit: i64,
    pub offset: i64,
}
