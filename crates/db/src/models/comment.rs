//! Task comment model.

use projectflows_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A comment joined with its author's name.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Comment {
    pub id: DbId,
    pub task_id: DbId,
    pub user_id: DbId,
    pub author_name: String,
    pub content: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A comment on a service request joined with its author's name.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RequestComment {
    pub id: DbId,
    pub request_id: DbId,
    pub user_id: DbId,
    pub author_name: String,
    pub content: String,
    pub created_at: Timestamp,
}
