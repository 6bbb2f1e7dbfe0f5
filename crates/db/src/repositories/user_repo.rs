//! Repository for the `users` table.

use projectflows_core::roles::{ROLE_ADMIN, ROLE_CHIEF, ROLE_HEAD, ROLE_LEADER};
use projectflows_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::user::{CreateUser, UpdateUser, User, UserFilter, UserSummary};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, email, password_hash, full_name, role, department_id, additional_roles, \
                       status, job_title, phone, failed_login_count, locked_until, last_login_at, \
                       created_at, updated_at";

const SUMMARY_COLUMNS: &str = "id, full_name, email, role, department_id";

/// Roles at or above HEAD, which may approve service requests.
const APPROVER_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_CHIEF, ROLE_LEADER, ROLE_HEAD];

/// Provides CRUD operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users
                (email, password_hash, full_name, role, department_id, additional_roles, job_title, phone)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.email)
            .bind(&input.password_hash)
            .bind(&input.full_name)
            .bind(&input.role)
            .bind(input.department_id)
            .bind(&input.additional_roles)
            .bind(&input.job_title)
            .bind(&input.phone)
            .fetch_one(pool)
            .await
    }

    /// Find a live user by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a live user by normalized (lower-case) email.
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users WHERE LOWER(email) = LOWER($1) AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// List users matching `filter`, ordered by name.
    pub async fn list(pool: &PgPool, filter: &UserFilter) -> Result<Vec<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users
             WHERE deleted_at IS NULL
               AND ($1::BIGINT[] IS NULL OR department_id = ANY($1))
               AND ($2::TEXT IS NULL OR full_name ILIKE '%' || $2 || '%' OR email ILIKE '%' || $2 || '%')
               AND ($3::TEXT IS NULL OR status = $3)
             ORDER BY full_name, id
             LIMIT $4 OFFSET $5"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&filter.department_ids)
            .bind(&filter.search)
            .bind(&filter.status)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(pool)
            .await
    }

    /// Count users matching `filter`, ignoring its limit and offset.
    pub async fn count(pool: &PgPool, filter: &UserFilter) -> Result<i64, sqlx::Error> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users
             WHERE deleted_at IS NULL
               AND ($1::BIGINT[] IS NULL OR department_id = ANY($1))
               AND ($2::TEXT IS NULL OR full_name ILIKE '%' || $2 || '%' OR email ILIKE '%' || $2 || '%')
               AND ($3::TEXT IS NULL OR status = $3)",
        )
        .bind(&filter.department_ids)
        .bind(&filter.search)
        .bind(&filter.status)
        .fetch_one(pool)
        .await?;
        Ok(count.unwrap_or(0))
    }

    /// Names and roles for a set of users. Unknown or deleted ids are skipped.
    pub async fn summaries_by_ids(
        pool: &PgPool,
        ids: &[DbId],
    ) -> Result<Vec<UserSummary>, sqlx::Error> {
        let query = format!(
            "SELECT {SUMMARY_COLUMNS} FROM users
             WHERE id = ANY($1) AND deleted_at IS NULL
             ORDER BY full_name, id"
        );
        sqlx::query_as::<_, UserSummary>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    /// How many of `ids` are live, ACTIVE users.
    pub async fn count_active(pool: &PgPool, ids: &[DbId]) -> Result<i64, sqlx::Error> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users
             WHERE id = ANY($1) AND deleted_at IS NULL AND status = 'ACTIVE'",
        )
        .bind(ids)
        .fetch_one(pool)
        .await?;
        Ok(count.unwrap_or(0))
    }

    /// ACTIVE users who may approve service requests, excluding `except`.
    pub async fn approver_ids(pool: &PgPool, except: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT id FROM users
             WHERE role = ANY($1) AND status = 'ACTIVE' AND deleted_at IS NULL AND id <> $2
             ORDER BY id",
        )
        .bind(APPROVER_ROLES)
        .bind(except)
        .fetch_all(pool)
        .await
    }

    /// ACTIVE administrators.
    pub async fn admin_ids(pool: &PgPool) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT id FROM users
             WHERE role = 'ADMIN' AND status = 'ACTIVE' AND deleted_at IS NULL
             ORDER BY id",
        )
        .fetch_all(pool)
        .await
    }

    /// Update a user. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no live row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateUser,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET
                full_name = COALESCE($2, full_name),
                role = COALESCE($3, role),
                department_id = COALESCE($4, department_id),
                additional_roles = COALESCE($5, additional_roles),
                job_title = COALESCE($6, job_title),
                phone = COALESCE($7, phone)
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(&input.full_name)
            .bind(&input.role)
            .bind(input.department_id)
            .bind(&input.additional_roles)
            .bind(&input.job_title)
            .bind(&input.phone)
            .fetch_optional(pool)
            .await
    }

    /// Set the account status (`ACTIVE`, `SUSPENDED`, `INACTIVE`).
    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        status: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET status = $2 WHERE id = $1 AND deleted_at IS NULL RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(status)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a user and revoke their sessions.
    ///
    /// Returns `true` if the row was updated.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let result = sqlx::query(
            "UPDATE users SET deleted_at = NOW(), status = 'INACTIVE'
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE user_sessions SET is_revoked = true WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record a failed password attempt, returning the new counter value.
    pub async fn increment_failed_login(pool: &PgPool, id: DbId) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar(
            "UPDATE users SET failed_login_count = failed_login_count + 1
             WHERE id = $1
             RETURNING failed_login_count",
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }

    /// Lock a user account until the specified timestamp.
    pub async fn lock_account(
        pool: &PgPool,
        id: DbId,
        until: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET locked_until = $2 WHERE id = $1")
            .bind(id)
            .bind(until)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Reset the lockout counters and stamp `last_login_at`.
    pub async fn record_successful_login(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET
                failed_login_count = 0,
                locked_until = NULL,
                last_login_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Replace a user's password hash. Returns `true` if the row was updated.
    pub async fn update_password(
        pool: &PgPool,
        id: DbId,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
