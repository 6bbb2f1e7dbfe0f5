//! Route definitions for reports, division overviews and the personal dashboard.

use axum::routing::get;
use axum::Router;

use crate::handlers::report;
use crate::state::AppState;

/// Routes mounted at `/reports`.
pub fn router() -> Router<AppState> {
    Router::new().route("/tasks", get(report::tasks))
}

/// Routes mounted at `/divisions`.
pub fn division_router() -> Router<AppState> {
    Router::new().route("/{id}/overview", get(report::division_overview))
}

/// Routes mounted at `/dashboard`.
pub fn dashboard_router() -> Router<AppState> {
    Router::new().route("/", get(report::dashboard))
}
