//! Best-effort delivery of in-app notifications.
//!
//! Notifications are written after the triggering change has committed.
//! A failed insert is logged and never fails the request that caused it.

use projectflows_db::models::notification::NewNotification;
use projectflows_db::repositories::NotificationRepo;
use projectflows_db::DbPool;

pub async fn dispatch(pool: &DbPool, notifications: Vec<NewNotification>) {
    if notifications.is_empty() {
        return;
    }
    match NotificationRepo::create_many(pool, &notifications).await {
        Ok(created) => tracing::debug!(created, "Notifications created"),
        Err(e) => tracing::warn!(error = %e, count = notifications.len(), "Failed to create notifications"),
    }
}
