//! Notification entity model and DTOs.

use projectflows_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `notifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: DbId,
    pub user_id: DbId,
    pub triggered_by_user_id: Option<DbId>,
    pub notification_type: String,
    pub message: String,
    pub task_id: Option<DbId>,
    pub service_request_id: Option<DbId>,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// A notification to insert.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: DbId,
    pub triggered_by_user_id: Option<DbId>,
    pub notification_type: &'static str,
    pub message: String,
    pub task_id: Option<DbId>,
    pub service_request_id: Option<DbId>,
}

impl NewNotification {
    pub fn task(
        user_id: DbId,
        triggered_by: DbId,
        notification_type: &'static str,
        message: String,
        task_id: DbId,
    ) -> Self {
        NewNotification {
            user_id,
            triggered_by_user_id: Some(triggered_by),
            notification_type,
            message,
            task_id: Some(task_id),
            service_request_id: None,
        }
    }

    pub fn request(
        user_id: DbId,
        triggered_by: Option<DbId>,
        notification_type: &'static str,
        message: String,
        request_id: DbId,
    ) -> Self {
        NewNotification {
            user_id,
            triggered_by_user_id: triggered_by,
            notification_type,
            message,
            task_id: None,
            service_request_id: Some(request_id),
        }
    }
}
