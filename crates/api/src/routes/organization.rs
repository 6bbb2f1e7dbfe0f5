//! Route definitions for `/organization` and `/workspace`.

use axum::routing::{get, patch};
use axum::Router;

use crate::handlers::organization;
use crate::state::AppState;

/// Routes mounted at `/organization`.
///
/// ```text
/// GET    /                    -> hierarchy
/// GET    /mission-groups      -> list_mission_groups
/// POST   /mission-groups      -> create_mission_group (admin)
/// GET    /divisions           -> list_divisions
/// POST   /divisions           -> create_division (admin)
/// GET    /departments         -> list_departments
/// POST   /departments         -> create_department
/// PATCH  /departments/{id}    -> update_department
/// DELETE /departments/{id}    -> delete_department
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(organization::hierarchy))
        .route(
            "/mission-groups",
            get(organization::list_mission_groups).post(organization::create_mission_group),
        )
        .route(
            "/divisions",
            get(organization::list_divisions).post(organization::create_division),
        )
        .route(
            "/departments",
            get(organization::list_departments).post(organization::create_department),
        )
        .route(
            "/departments/{id}",
            patch(organization::update_department).delete(organization::delete_department),
        )
}

/// Routes mounted at `/workspace`.
pub fn workspace_router() -> Router<AppState> {
    Router::new().route("/", get(organization::workspace))
}
