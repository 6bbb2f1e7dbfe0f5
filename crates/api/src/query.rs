//! Shared query and body helpers for API handlers.

use serde::{Deserialize, Deserializer};

/// Page-based pagination (`?page=&limit=`).
///
/// Values are clamped with `projectflows_core::pagination` before use.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Offset-based pagination (`?limit=&offset=`).
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Deserialize a PATCH field so that an absent key, an explicit `null` and
/// a value can be told apart:
///
/// - missing -> `None` (via `#[serde(default)]`)
/// - `null` -> `Some(None)`
/// - value -> `Some(Some(value))`
///
/// ```ignore
/// #[serde(default, deserialize_with = "double_option")]
/// pub due_date: Option<Option<String>>,
/// ```
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
