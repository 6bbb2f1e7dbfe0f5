pub mod activity;
pub mod auth;
pub mod health;
pub mod notification;
pub mod organization;
pub mod project;
pub mod report;
pub mod service_request;
pub mod task;
pub mod user;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login, /auth/refresh                     public
/// /auth/logout, /auth/session
///
/// /users                                         list, create
/// /users/me                                      current profile
/// /users/me/change-password
/// /users/me/pinned-tasks                         list, pin
/// /users/me/pinned-tasks/{task_id}               unpin
/// /users/{id}                                    get, update, delete
/// /users/{id}/status                             set status
/// /users/{id}/permissions                        role, permissions, scope
/// /users/{id}/activities                         the user's history
///
/// /organization                                  scope-filtered hierarchy
/// /organization/mission-groups                   list, create (admin)
/// /organization/divisions                        list, create (admin)
/// /organization/departments                      list, create
/// /organization/departments/{id}                 update, delete
/// /workspace                                     hierarchy + visible projects
///
/// /projects                                      list, create
/// /projects/progress/batch                       progress of up to 50 projects
/// /projects/{id}                                 get, update, delete
/// /projects/{id}/progress                        weighted progress
/// /projects/{id}/board                           tasks grouped by status
/// /projects/{id}/activities                      project history
/// /projects/{id}/statuses                        list, create
/// /projects/{id}/statuses/batch                  create several
/// /projects/{id}/statuses/{status_id}            update, delete
/// /projects/{id}/phases                          list, create
/// /projects/{id}/phases/batch                    create several
/// /projects/{id}/tasks                           list, create
///
/// /tasks                                         scoped cross-project list
/// /tasks/bulk-update                             update up to 100 tasks
/// /tasks/{id}                                    get, update, delete
/// /tasks/{id}/close, /tasks/{id}/reopen
/// /tasks/{id}/history
/// /tasks/{id}/comments                           list, create
/// /tasks/{id}/checklists                         list, create
/// /tasks/{id}/checklists/{item_id}               update, delete
///
/// /departments/{id}/tasks                        department task list
/// /divisions/{id}/overview                       division health summary
///
/// /notifications                                 list
/// /notifications/unread-count
/// /notifications/mark-all-read
/// /notifications/{id}                            mark read, delete
///
/// /service-requests                              list, create
/// /service-requests/feedback/stats               rating summary (admin)
/// /service-requests/{id}                         get, update, cancel
/// /service-requests/{id}/approve, /reject
/// /service-requests/{id}/timeline
/// /service-requests/{id}/comments                list, create
/// /service-requests/{id}/feedback                get, submit
///
/// /activities                                   scoped history feed
/// /activities/recent                             caller's merged feed
/// /activities/stats                              counts over a period
///
/// /reports/tasks                                 scoped task report
/// /dashboard                                     caller's stats and activity
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", user::router())
        .nest("/organization", organization::router())
        .nest("/workspace", organization::workspace_router())
        .nest("/projects", project::router())
        .nest("/tasks", task::router())
        .nest("/departments", task::department_router())
        .nest("/divisions", report::division_router())
        .nest("/notifications", notification::router())
        .nest("/service-requests", service_request::router())
        .nest("/activities", activity::router())
        .nest("/reports", report::router())
        .nest("/dashboard", report::dashboard_router())
}
