//! Route definitions for `/activities`.

use axum::routing::get;
use axum::Router;

use crate::handlers::activity;
use crate::state::AppState;

/// ```text
/// GET    /          -> list
/// GET    /recent    -> recent
/// GET    /stats     -> stats
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(activity::list))
        .route("/recent", get(activity::recent))
        .route("/stats", get(activity::stats))
}
