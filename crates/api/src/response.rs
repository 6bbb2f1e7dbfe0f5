//! Shared response envelope types for API handlers.
//!
//! Successful responses use a `{ "success": true, "data": ... }` envelope.
//! Use [`DataResponse::new`] instead of ad-hoc `serde_json::json!` so the
//! shape stays consistent across handlers.

use projectflows_core::pagination::PageMeta;
use serde::Serialize;

/// Standard `{ "success": true, "data": T }` response envelope.
///
/// ```ignore
/// Ok(Json(DataResponse::new(items)))
/// ```
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> DataResponse<T> {
    pub fn new(data: T) -> Self {
        DataResponse {
            success: true,
            data,
        }
    }
}

/// Paginated list envelope: `{ "success": true, "data": [...], "pagination": {...} }`.
#[derive(Debug, Serialize)]
pub struct PageResponse<T: Serialize> {
    pub success: bool,
    pub data: Vec<T>,
    pub pagination: PageMeta,
}

impl<T: Serialize> PageResponse<T> {
    pub fn new(data: Vec<T>, pagination: PageMeta) -> Self {
        PageResponse {
            success: true,
            data,
            pagination,
        }
    }
}
