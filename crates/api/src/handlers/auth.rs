//! Handlers for `/auth` (login, refresh, logout, session).

use axum::extract::State;
use axum::http::header::{SET_COOKIE, USER_AGENT};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::Json;
use chrono::{Duration, Utc};
use projectflows_core::error::CoreError;
use projectflows_core::roles::{Permission, Role};
use projectflows_core::scope::AccessibleScope;
use projectflows_core::types::Timestamp;
use projectflows_core::validation::{normalize_email, USER_STATUS_ACTIVE};
use projectflows_db::models::session::CreateSession;
use projectflows_db::models::user::{User, UserResponse};
use projectflows_db::repositories::{SessionRepo, UserRepo};
use serde::{Deserialize, Serialize};

use crate::auth::cookie::{clear_session_cookie, session_cookie};
use crate::auth::jwt::{generate_access_token, generate_refresh_token, hash_refresh_token};
use crate::auth::password::verify_password;
use crate::error::{AppError, AppResult, ValidJson};
use crate::middleware::auth::{AuthUser, CurrentUser};
use crate::response::DataResponse;
use crate::state::AppState;

/// Consecutive failed logins before the account is locked.
const MAX_FAILED_ATTEMPTS: i32 = 5;

/// Lock duration after too many failed logins.
const LOCK_DURATION_MINS: i64 = 15;

type CookieHeader = [(HeaderName, HeaderValue); 1];

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Returned by login and refresh. The access token is also set as the
/// `session_token` cookie.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    /// When the refresh token stops being accepted.
    pub expires_at: Timestamp,
    pub user: SessionUser,
}

/// The caller as seen by the client: profile, roles and scope.
#[derive(Debug, Serialize)]
pub struct SessionUser {
    #[serde(flatten)]
    pub profile: UserResponse,
    pub effective_role: Role,
    pub permissions: Vec<Permission>,
    pub scope: AccessibleScope,
}

impl From<&CurrentUser> for SessionUser {
    fn from(current: &CurrentUser) -> Self {
        let effective_role = current.actor.effective_role();
        SessionUser {
            profile: UserResponse::from(&current.user),
            effective_role,
            permissions: effective_role.permissions().to_vec(),
            scope: current.scope.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/auth/login
///
/// Authenticate with email + password. Five consecutive failures lock the
/// account for fifteen minutes.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidJson(input): ValidJson<LoginRequest>,
) -> AppResult<(CookieHeader, Json<DataResponse<AuthResponse>>)> {
    let email = normalize_email(&input.email);

    // 1. Find user by email.
    let user = UserRepo::find_by_email(&state.pool, &email)
        .await?
        .ok_or_else(invalid_credentials)?;

    // 2. Only ACTIVE accounts may sign in.
    if user.status != USER_STATUS_ACTIVE {
        tracing::info!(user_id = user.id, status = %user.status, "Login refused for inactive account");
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "Account is {}",
            user.status.to_lowercase()
        ))));
    }

    // 3. Check the temporary lock.
    if user.locked_until.is_some_and(|until| until > Utc::now()) {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is temporarily locked. Try again later.".into(),
        )));
    }

    // 4. Verify password.
    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;

    if !password_valid {
        let failed = UserRepo::increment_failed_login(&state.pool, user.id).await?;
        if failed >= MAX_FAILED_ATTEMPTS {
            let lock_until = Utc::now() + Duration::minutes(LOCK_DURATION_MINS);
            UserRepo::lock_account(&state.pool, user.id, lock_until).await?;
            tracing::warn!(user_id = user.id, failed, "Account locked after failed logins");
        }
        return Err(invalid_credentials());
    }

    // 5. Reset counters and drop dead sessions.
    UserRepo::record_successful_login(&state.pool, user.id).await?;
    SessionRepo::cleanup_for_user(&state.pool, user.id).await?;

    // 6. Issue tokens.
    let (refresh_token, refresh_hash) = generate_refresh_token();
    let session = session_input(&state, &headers, &user, refresh_hash);
    SessionRepo::create(&state.pool, &session).await?;

    tracing::info!(user_id = user.id, "User logged in");
    auth_response(&state, &user, refresh_token, session.expires_at).await
}

/// POST /api/auth/refresh
///
/// Exchange a live refresh token for a new pair. The old token is revoked.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidJson(input): ValidJson<RefreshRequest>,
) -> AppResult<(CookieHeader, Json<DataResponse<AuthResponse>>)> {
    let session = SessionRepo::find_by_refresh_token_hash(
        &state.pool,
        &hash_refresh_token(&input.refresh_token),
    )
    .await?
    .ok_or_else(invalid_refresh_token)?;

    let user = UserRepo::find_by_id(&state.pool, session.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User no longer exists".into())))?;

    if user.status != USER_STATUS_ACTIVE {
        SessionRepo::revoke_all_for_user(&state.pool, user.id).await?;
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "Account is {}",
            user.status.to_lowercase()
        ))));
    }

    let (refresh_token, refresh_hash) = generate_refresh_token();
    let next = session_input(&state, &headers, &user, refresh_hash);
    SessionRepo::rotate(&state.pool, session.id, &next)
        .await?
        .ok_or_else(invalid_refresh_token)?;

    auth_response(&state, &user, refresh_token, next.expires_at).await
}

/// POST /api/auth/logout
///
/// Revoke every session of the caller and clear the cookie.
pub async fn logout(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<(StatusCode, CookieHeader)> {
    let revoked = SessionRepo::revoke_all_for_user(&state.pool, auth_user.user_id).await?;
    tracing::info!(user_id = auth_user.user_id, revoked, "User logged out");
    Ok((
        StatusCode::NO_CONTENT,
        [(SET_COOKIE, clear_session_cookie(state.config.cookie_secure))],
    ))
}

/// GET /api/auth/session
pub async fn session(current: CurrentUser) -> Json<DataResponse<SessionUser>> {
    Json(DataResponse::new(SessionUser::from(&current)))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn invalid_credentials() -> AppError {
    AppError::Core(CoreError::Unauthorized("Invalid email or password".into()))
}

fn invalid_refresh_token() -> AppError {
    AppError::Core(CoreError::Unauthorized(
        "Invalid or expired refresh token".into(),
    ))
}

fn session_input(
    state: &AppState,
    headers: &HeaderMap,
    user: &User,
    refresh_token_hash: String,
) -> CreateSession {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.chars().take(500).collect::<String>())
    };
    CreateSession {
        user_id: user.id,
        refresh_token_hash,
        expires_at: state.config.jwt.refresh_expires_at(),
        user_agent: header(USER_AGENT.as_str()),
        ip_address: header("x-forwarded-for")
            .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string())),
    }
}

async fn auth_response(
    state: &AppState,
    user: &User,
    refresh_token: String,
    expires_at: Timestamp,
) -> AppResult<(CookieHeader, Json<DataResponse<AuthResponse>>)> {
    let access_token = generate_access_token(user.id, &user.role, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;
    let expires_in = state.config.jwt.access_ttl().num_seconds();

    let current = CurrentUser::load(state, user.id).await?;
    let cookie = session_cookie(&access_token, expires_in, state.config.cookie_secure);

    Ok((
        [(SET_COOKIE, cookie)],
        Json(DataResponse::new(AuthResponse {
            access_token,
            refresh_token,
            expires_in,
            expires_at,
            user: SessionUser::from(&current),
        })),
    ))
}
