//! Pure domain logic for ProjectFlows.
//!
//! Nothing in this crate performs I/O. The DB and API layers feed rows in
//! and act on the decisions returned here.

pub mod activity;
pub mod error;
pub mod fiscal_year;
pub mod notification;
pub mod overview;
pub mod pagination;
pub mod permissions;
pub mod progress;
pub mod report;
pub mod roles;
pub mod scope;
pub mod service_request;
pub mod task;
pub mod types;
pub mod validation;
