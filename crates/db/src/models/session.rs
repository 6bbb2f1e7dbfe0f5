//! Refresh-token sessions backing `/api/auth/refresh` and logout.

use projectflows_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// One issued refresh token. Rotation revokes the row and inserts a new one.
#[derive(Debug, Clone, FromRow)]
pub struct UserSession {
    pub id: DbId,
    pub user_id: DbId,
    pub refresh_token_hash: String,
    pub expires_at: Timestamp,
    pub is_revoked: bool,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Insert payload; `refresh_token_hash` is the SHA-256 hex of the raw token.
pub struct CreateSession {
    pub user_id: DbId,
    pub refresh_token_hash: String,
    pub expires_at: Timestamp,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}
