//! Token and user-context extractors for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use projectflows_core::error::CoreError;
use projectflows_core::permissions::Access;
use projectflows_core::scope::{resolve_accessible_scope, AccessibleScope, Actor, OrgHierarchy};
use projectflows_core::types::DbId;
use projectflows_core::validation::USER_STATUS_ACTIVE;
use projectflows_db::models::user::User;
use projectflows_db::repositories::{OrganizationRepo, UserRepo};

use crate::auth::cookie::{read_cookie, SESSION_COOKIE};
use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// Claims of a valid access token.
///
/// The token is taken from `Authorization: Bearer <token>` when present,
/// otherwise from the `session_token` cookie.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: DbId,
    /// Role recorded in the token; may be stale, use [`CurrentUser`] for checks.
    pub role: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = match parts.headers.get("authorization") {
            Some(header) => header
                .to_str()
                .ok()
                .and_then(|v| v.strip_prefix("Bearer "))
                .ok_or_else(|| {
                    AppError::Core(CoreError::Unauthorized(
                        "Invalid Authorization format. Expected: Bearer <token>".into(),
                    ))
                })?,
            None => read_cookie(&parts.headers, SESSION_COOKIE).ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized("Authentication required".into()))
            })?,
        };

        let claims = validate_token(token, &state.config.jwt).map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
        })?;

        Ok(AuthUser {
            user_id: claims.sub,
            role: claims.role,
        })
    }
}

/// The authenticated user as stored now, with their organizational scope.
///
/// Loads the user row and the live hierarchy on every request so role,
/// status and department changes apply without re-login. Rejects deleted
/// and non-`ACTIVE` accounts with 401.
///
/// ```ignore
/// async fn handler(current: CurrentUser) -> AppResult<Json<()>> {
///     if !current.access().can_view_reports() { ... }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub actor: Actor,
    pub hierarchy: OrgHierarchy,
    pub scope: AccessibleScope,
}

impl CurrentUser {
    pub fn id(&self) -> DbId {
        self.user.id
    }

    pub fn access(&self) -> Access<'_> {
        Access::new(&self.actor, &self.hierarchy, &self.scope)
    }

    /// Load the context for `user_id`, failing with 401 when the account
    /// is gone or not active.
    pub async fn load(state: &AppState, user_id: DbId) -> Result<Self, AppError> {
        let user = UserRepo::find_by_id(&state.pool, user_id)
            .await?
            .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User not found".into())))?;

        if user.status != USER_STATUS_ACTIVE {
            return Err(AppError::Core(CoreError::Unauthorized(
                "Account is not active".into(),
            )));
        }

        let hierarchy = OrganizationRepo::load_hierarchy(&state.pool).await?;
        let actor = user.actor();
        let scope = resolve_accessible_scope(Some(&actor), &hierarchy);

        Ok(CurrentUser {
            user,
            actor,
            hierarchy,
            scope,
        })
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        CurrentUser::load(state, auth.user_id).await
    }
}
