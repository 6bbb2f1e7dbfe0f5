//! Activity feeds and statistics built from task history, notifications
//! and comments.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use projectflows_core::activity::{
    average_per_day, clamp_feed_limit, fill_daily_counts, merge_newest_first, parse_period,
    period_start, ActivityItem, ActivitySource, DailyCount, DEFAULT_RECENT_LIMIT,
    MAX_RECENT_LIMIT, TOP_LIMIT,
};
use projectflows_core::pagination::{clamp_limit, clamp_page, offset_for, PageMeta};
use projectflows_core::types::{DbId, Timestamp};
use projectflows_db::models::activity::{
    Activity, ActivityFilter, TaskActivityCount, UserActivityCount,
};
use projectflows_db::repositories::{CommentRepo, HistoryRepo, NotificationRepo};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::handlers::project::visible_project;
use crate::handlers::user::visible_user;
use crate::middleware::auth::CurrentUser;
use crate::response::{DataResponse, PageResponse};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ActivityPageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecentParams {
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsParams {
    /// Day count such as `7d`; defaults to seven days.
    pub period: Option<String>,
    pub project_id: Option<DbId>,
    pub user_id: Option<DbId>,
}

#[derive(Debug, Serialize)]
pub struct ActivityTotals {
    pub total_activities: i64,
    pub total_comments: i64,
    pub total_notifications: i64,
    pub average_per_day: f64,
}

#[derive(Debug, Serialize)]
pub struct ActivityStats {
    pub period_days: i64,
    pub since: Timestamp,
    pub totals: ActivityTotals,
    pub top_users: Vec<UserActivityCount>,
    pub top_tasks: Vec<TaskActivityCount>,
    pub daily: Vec<DailyCount>,
}

/// Activity the caller may see: their scope's projects plus projects they own.
fn scoped_filter(current: &CurrentUser) -> ActivityFilter {
    ActivityFilter {
        department_ids: (!current.scope.is_admin).then(|| current.scope.department_list()),
        viewer_id: current.id(),
        ..Default::default()
    }
}

async fn activity_page(
    state: &AppState,
    filter: &ActivityFilter,
    params: &ActivityPageParams,
) -> AppResult<Json<PageResponse<Activity>>> {
    let page = clamp_page(params.page);
    let limit = clamp_limit(params.limit);
    let activities =
        HistoryRepo::list_activities(&state.pool, filter, limit, offset_for(page, limit)).await?;
    let total = HistoryRepo::count_activities(&state.pool, filter).await?;
    Ok(Json(PageResponse::new(activities, PageMeta::new(page, limit, total))))
}

/// GET /api/activities
///
/// Every history line in the caller's scope, newest first.
pub async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<ActivityPageParams>,
) -> AppResult<Json<PageResponse<Activity>>> {
    if !current.access().can_view_reports() {
        return Err(AppError::forbidden("view activity"));
    }
    activity_page(&state, &scoped_filter(&current), &params).await
}

/// GET /api/activities/recent
///
/// The caller's own actions, their notifications and comments others left
/// on tasks assigned to them, merged newest first.
pub async fn recent(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<RecentParams>,
) -> AppResult<Json<DataResponse<Vec<ActivityItem>>>> {
    let limit = clamp_feed_limit(params.limit, DEFAULT_RECENT_LIMIT, MAX_RECENT_LIMIT);
    let own = ActivityFilter {
        viewer_id: current.id(),
        user_id: Some(current.id()),
        ..Default::default()
    };

    let histories = HistoryRepo::list_activities(&state.pool, &own, limit, 0)
        .await?
        .into_iter()
        .map(|h| ActivityItem {
            source: ActivitySource::History,
            id: h.id,
            task_id: h.task_id,
            actor_user_id: Some(h.user_id),
            text: h.history_text,
            created_at: h.created_at,
        })
        .collect();
    let notifications = NotificationRepo::list_for_user(&state.pool, current.id(), false, limit, 0)
        .await?
        .into_iter()
        .map(|n| ActivityItem {
            source: ActivitySource::Notification,
            id: n.id,
            task_id: n.task_id,
            actor_user_id: n.triggered_by_user_id,
            text: n.message,
            created_at: n.created_at,
        })
        .collect();
    let comments = CommentRepo::list_on_assigned_tasks(&state.pool, current.id(), limit)
        .await?
        .into_iter()
        .map(|c| ActivityItem {
            source: ActivitySource::Comment,
            id: c.id,
            task_id: Some(c.task_id),
            actor_user_id: Some(c.user_id),
            text: format!("{}: {}", c.author_name, c.content),
            created_at: c.created_at,
        })
        .collect();

    let merged = merge_newest_first(vec![histories, notifications, comments], limit as usize);
    Ok(Json(DataResponse::new(merged)))
}

/// GET /api/activities/stats
pub async fn stats(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<StatsParams>,
) -> AppResult<Json<DataResponse<ActivityStats>>> {
    if !current.access().can_view_reports() {
        return Err(AppError::forbidden("view activity statistics"));
    }
    let days = parse_period(params.period.as_deref()).map_err(AppError::validation)?;
    if let Some(project_id) = params.project_id {
        visible_project(&state, &current, project_id).await?;
    }
    if let Some(user_id) = params.user_id {
        visible_user(&state, &current, user_id).await?;
    }

    let now = Utc::now();
    let since = period_start(days, now);
    let filter = ActivityFilter {
        project_id: params.project_id,
        user_id: params.user_id,
        since: Some(since),
        ..scoped_filter(&current)
    };

    let total_activities = HistoryRepo::count_activities(&state.pool, &filter).await?;
    let total_comments = CommentRepo::count_matching(&state.pool, &filter).await?;
    let total_notifications = NotificationRepo::count_matching(&state.pool, &filter).await?;
    let top_users = HistoryRepo::top_users(&state.pool, &filter, TOP_LIMIT).await?;
    let top_tasks = HistoryRepo::top_tasks(&state.pool, &filter, TOP_LIMIT).await?;
    let daily_rows: Vec<_> = HistoryRepo::daily_counts(&state.pool, &filter)
        .await?
        .into_iter()
        .map(|row| (row.day, row.count))
        .collect();

    Ok(Json(DataResponse::new(ActivityStats {
        period_days: days,
        since,
        totals: ActivityTotals {
            total_activities,
            total_comments,
            total_notifications,
            average_per_day: average_per_day(total_activities, days),
        },
        top_users,
        top_tasks,
        daily: fill_daily_counts(&daily_rows, days, now.date_naive()),
    })))
}

/// GET /api/projects/{id}/activities
pub async fn project_activities(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(project_id): Path<DbId>,
    Query(params): Query<ActivityPageParams>,
) -> AppResult<Json<PageResponse<Activity>>> {
    visible_project(&state, &current, project_id).await?;
    let filter = ActivityFilter {
        viewer_id: current.id(),
        project_id: Some(project_id),
        ..Default::default()
    };
    activity_page(&state, &filter, &params).await
}

/// GET /api/users/{id}/activities
///
/// Limited to projects the caller can see.
pub async fn user_activities(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(user_id): Path<DbId>,
    Query(params): Query<ActivityPageParams>,
) -> AppResult<Json<PageResponse<Activity>>> {
    visible_user(&state, &current, user_id).await?;
    let filter = ActivityFilter {
        user_id: Some(user_id),
        ..scoped_filter(&current)
    };
    activity_page(&state, &filter, &params).await
}
