//! Handlers for the `/users` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use projectflows_core::error::CoreError;
use projectflows_core::pagination::{clamp_limit, clamp_page, offset_for, PageMeta};
use projectflows_core::roles::{Permission, Role};
use projectflows_core::scope::{
    is_in_management_scope, resolve_accessible_scope, role_for_department, AccessibleScope,
    ManagedUser,
};
use projectflows_core::types::DbId;
use projectflows_core::validation::{
    normalize_email, validate_email, validate_full_name, validate_user_status, USER_STATUS_ACTIVE,
};
use projectflows_db::models::user::{CreateUser, UpdateUser, User, UserFilter, UserResponse};
use projectflows_db::repositories::{SessionRepo, UserRepo};
use serde::{Deserialize, Serialize};

use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::error::{AppError, AppResult, ValidJson};
use crate::handlers::auth::SessionUser;
use crate::middleware::auth::CurrentUser;
use crate::response::{DataResponse, PageResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UserListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: Role,
    pub department_id: Option<DbId>,
    pub additional_roles: Option<serde_json::Value>,
    pub job_title: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct UserPermissions {
    pub user_id: DbId,
    pub role: Role,
    pub effective_role: Role,
    pub permissions: Vec<Permission>,
    pub scope: AccessibleScope,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// GET /api/users
///
/// Users whose department lies in the caller's scope. Administrators see everyone.
pub async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<UserListParams>,
) -> AppResult<Json<PageResponse<UserResponse>>> {
    let page = clamp_page(params.page);
    let limit = clamp_limit(params.limit);
    let filter = UserFilter {
        department_ids: (!current.scope.is_admin).then(|| current.scope.department_list()),
        search: params.search.filter(|s| !s.trim().is_empty()),
        status: params.status,
        limit,
        offset: offset_for(page, limit),
    };

    let users = UserRepo::list(&state.pool, &filter).await?;
    let total = UserRepo::count(&state.pool, &filter).await?;

    Ok(Json(PageResponse::new(
        users.iter().map(UserResponse::from).collect(),
        PageMeta::new(page, limit, total),
    )))
}

/// POST /api/users
pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    ValidJson(input): ValidJson<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<UserResponse>>)> {
    let email = normalize_email(&input.email);
    validate_email(&email).map_err(AppError::validation)?;
    validate_full_name(&input.full_name).map_err(AppError::validation)?;
    validate_password_strength(&input.password).map_err(AppError::validation)?;

    if let Some(dept) = input.department_id {
        if !current.hierarchy.contains_department(dept) {
            return Err(AppError::not_found("Department", dept));
        }
    }

    if !current.actor.is_admin() && !can_grant(&current, input.role, input.department_id, true) {
        return Err(AppError::forbidden("create this user"));
    }

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            email,
            password_hash,
            full_name: input.full_name.trim().to_string(),
            role: input.role.as_str().to_string(),
            department_id: input.department_id,
            additional_roles: input.additional_roles,
            job_title: input.job_title,
            phone: input.phone,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, created_by = current.id(), role = %user.role, "User created");
    Ok((StatusCode::CREATED, Json(DataResponse::new(UserResponse::from(&user)))))
}

/// GET /api/users/me
pub async fn me(current: CurrentUser) -> Json<DataResponse<SessionUser>> {
    Json(DataResponse::new(SessionUser::from(&current)))
}

/// POST /api/users/me/change-password
///
/// Every session is revoked afterwards, so other devices must log in again.
pub async fn change_password(
    State(state): State<AppState>,
    current: CurrentUser,
    ValidJson(input): ValidJson<ChangePasswordRequest>,
) -> AppResult<Json<DataResponse<MessageResponse>>> {
    let matches = verify_password(&input.current_password, &current.user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !matches {
        return Err(AppError::Core(CoreError::Unauthorized(
            "Current password is incorrect".into(),
        )));
    }
    validate_password_strength(&input.new_password).map_err(AppError::validation)?;

    let password_hash = hash_password(&input.new_password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    UserRepo::update_password(&state.pool, current.id(), &password_hash).await?;
    SessionRepo::revoke_all_for_user(&state.pool, current.id()).await?;

    tracing::info!(user_id = current.id(), "Password changed");
    Ok(Json(DataResponse::new(MessageResponse {
        message: "Password changed successfully",
    })))
}

/// GET /api/users/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let user = visible_user(&state, &current, id).await?;
    Ok(Json(DataResponse::new(UserResponse::from(&user))))
}

/// PATCH /api/users/{id}
pub async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<DbId>,
    ValidJson(input): ValidJson<UpdateUser>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let target = managed_user(&state, &current, id, "edit this user").await?;

    if let Some(name) = &input.full_name {
        validate_full_name(name).map_err(AppError::validation)?;
    }
    if let Some(role) = &input.role {
        let role = Role::parse(role)
            .ok_or_else(|| AppError::validation(format!("Invalid role '{role}'")))?;
        let dept = input.department_id.or(target.department_id);
        if !current.actor.is_admin() && !can_grant(&current, role, dept, false) {
            return Err(AppError::forbidden(&format!("grant the {role} role")));
        }
    }
    if let Some(dept) = input.department_id {
        let moved = ManagedUser {
            department_id: Some(dept),
            ..target.as_managed()
        };
        if !current.hierarchy.contains_department(dept)
            || !is_in_management_scope(&current.actor, &moved, &current.hierarchy)
        {
            return Err(AppError::forbidden("move this user to that department"));
        }
    }

    let user = UserRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("User", id))?;

    tracing::info!(user_id = id, updated_by = current.id(), "User updated");
    Ok(Json(DataResponse::new(UserResponse::from(&user))))
}

/// DELETE /api/users/{id}
pub async fn delete(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    managed_user(&state, &current, id, "delete this user").await?;
    if UserRepo::soft_delete(&state.pool, id).await? {
        tracing::info!(user_id = id, deleted_by = current.id(), "User deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("User", id))
    }
}

/// PATCH /api/users/{id}/status
///
/// Suspending or deactivating an account also revokes its sessions.
pub async fn set_status(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<DbId>,
    ValidJson(input): ValidJson<SetStatusRequest>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    validate_user_status(&input.status).map_err(AppError::validation)?;
    managed_user(&state, &current, id, "change this user's status").await?;

    let user = UserRepo::set_status(&state.pool, id, &input.status)
        .await?
        .ok_or_else(|| AppError::not_found("User", id))?;
    if user.status != USER_STATUS_ACTIVE {
        SessionRepo::revoke_all_for_user(&state.pool, id).await?;
    }

    tracing::info!(user_id = id, status = %user.status, changed_by = current.id(), "User status changed");
    Ok(Json(DataResponse::new(UserResponse::from(&user))))
}

/// GET /api/users/{id}/permissions
pub async fn permissions(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<UserPermissions>>> {
    let user = visible_user(&state, &current, id).await?;
    let actor = user.actor();
    let effective_role = actor.effective_role();

    Ok(Json(DataResponse::new(UserPermissions {
        user_id: user.id,
        role: user.role(),
        effective_role,
        permissions: effective_role.permissions().to_vec(),
        scope: resolve_accessible_scope(Some(&actor), &current.hierarchy),
    })))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The caller themselves, or a user whose department is in the caller's scope.
pub(crate) async fn visible_user(state: &AppState, current: &CurrentUser, id: DbId) -> AppResult<User> {
    let user = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("User", id))?;

    let visible = user.id == current.id()
        || current.scope.is_admin
        || user.department_id.is_some_and(|d| current.scope.contains_department(d));
    if !visible {
        return Err(AppError::forbidden("view this user"));
    }
    Ok(user)
}

/// Whether a non-admin may give `role` to a user in `department_id`: they
/// need a management role there that outranks `role`, plus `CreateUsers`
/// when creating.
fn can_grant(current: &CurrentUser, role: Role, department_id: Option<DbId>, creating: bool) -> bool {
    let Some(dept) = department_id else {
        return false;
    };
    let Some(held) = role_for_department(&current.actor, &current.hierarchy, dept) else {
        return false;
    };
    held.is_management()
        && role < held
        && (!creating || held.has_permission(Permission::CreateUsers))
}

/// A user the caller may manage (edit, suspend, delete).
async fn managed_user(
    state: &AppState,
    current: &CurrentUser,
    id: DbId,
    action: &str,
) -> AppResult<User> {
    let user = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("User", id))?;
    if !is_in_management_scope(&current.actor, &user.as_managed(), &current.hierarchy) {
        return Err(AppError::forbidden(action));
    }
    Ok(user)
}
