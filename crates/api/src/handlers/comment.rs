//! Handlers for task comments.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use projectflows_core::notification::{comment_added, TYPE_COMMENT_ADDED};
use projectflows_core::task::MAX_DESCRIPTION_LENGTH;
use projectflows_core::types::DbId;
use projectflows_db::models::comment::Comment;
use projectflows_db::models::notification::NewNotification;
use projectflows_db::repositories::CommentRepo;
use serde::Deserialize;

use crate::error::{AppError, AppResult, ValidJson};
use crate::handlers::task::visible_task;
use crate::middleware::auth::CurrentUser;
use crate::notify;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
}

/// GET /api/tasks/{id}/comments
pub async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(task_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Comment>>>> {
    visible_task(&state, &current, task_id).await?;
    let comments = CommentRepo::list_by_task(&state.pool, task_id).await?;
    Ok(Json(DataResponse::new(comments)))
}

/// POST /api/tasks/{id}/comments
///
/// The creator and assignees are notified, except the author.
pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(task_id): Path<DbId>,
    ValidJson(input): ValidJson<CreateCommentRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Comment>>)> {
    let (task, _) = visible_task(&state, &current, task_id).await?;

    let content = input.content.trim();
    if content.is_empty() {
        return Err(AppError::validation("Comment must not be empty"));
    }
    if content.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(AppError::validation(format!(
            "Comment must be at most {MAX_DESCRIPTION_LENGTH} characters"
        )));
    }

    let comment = CommentRepo::create(&state.pool, task_id, current.id(), content).await?;

    let mut recipients = vec![task.creator_user_id];
    recipients.extend(task.assignee_user_ids.iter().copied());
    recipients.sort_unstable();
    recipients.dedup();
    let notifications = recipients
        .into_iter()
        .filter(|user_id| *user_id != current.id())
        .map(|user_id| {
            NewNotification::task(
                user_id,
                current.id(),
                TYPE_COMMENT_ADDED,
                comment_added(&current.user.full_name, &task.name),
                task_id,
            )
        })
        .collect();
    notify::dispatch(&state.pool, notifications).await;

    Ok((StatusCode::CREATED, Json(DataResponse::new(comment))))
}
