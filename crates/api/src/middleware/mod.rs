//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- Validated access token (Bearer header or session cookie).
//! - [`auth::CurrentUser`] -- The live user row with their resolved scope.
//! - [`rbac::RequireAdmin`] -- Requires the `ADMIN` role.

pub mod auth;
pub mod rbac;
