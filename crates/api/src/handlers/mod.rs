pub mod activity;
pub mod auth;
pub mod checklist;
pub mod comment;
pub mod notification;
pub mod organization;
pub mod phase;
pub mod pin;
pub mod project;
pub mod report;
pub mod service_request;
pub mod status;
pub mod task;
pub mod user;
