//! Row models and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` entity struct matching the database row (`Serialize` unless
//!   the row carries secrets)
//! - Create DTOs for inserts
//! - Update DTOs (all `Option` fields) for patches

pub mod activity;
pub mod checklist;
pub mod comment;
pub mod history;
pub mod notification;
pub mod organization;
pub mod phase;
pub mod project;
pub mod report;
pub mod service_request;
pub mod session;
pub mod status;
pub mod task;
pub mod user;
