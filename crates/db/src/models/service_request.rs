//! Service request, timeline and feedback models.

use projectflows_core::service_request::RequestStatus;
use projectflows_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `service_requests` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ServiceRequest {
    pub id: DbId,
    pub request_number: String,
    pub request_type: String,
    pub status: String,
    pub urgency: String,
    pub subject: String,
    pub description: String,
    pub purposes: Vec<String>,
    pub other_purpose: Option<String>,
    pub location: Option<String>,
    pub requester_user_id: DbId,
    pub approver_user_id: Option<DbId>,
    pub approved_at: Option<Timestamp>,
    pub rejection_reason: Option<String>,
    pub task_id: Option<DbId>,
    pub fiscal_year: i32,
    pub completed_at: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ServiceRequest {
    /// Parsed status. Rows always satisfy the CHECK constraint.
    pub fn status(&self) -> Option<RequestStatus> {
        RequestStatus::parse(&self.status)
    }
}

/// DTO for inserting a request. The number is allocated by the repository.
#[derive(Debug, Clone)]
pub struct CreateServiceRequest {
    pub request_type: String,
    pub urgency: String,
    pub subject: String,
    pub description: String,
    pub purposes: Vec<String>,
    pub other_purpose: Option<String>,
    pub location: Option<String>,
    pub requester_user_id: DbId,
    pub fiscal_year: i32,
}

/// DTO for editing a PENDING request. All fields are optional.
#[derive(Debug, Clone, Default)]
pub struct UpdateServiceRequest {
    pub urgency: Option<String>,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub purposes: Option<Vec<String>>,
    pub other_purpose: Option<String>,
    pub location: Option<String>,
}

/// Filters for the request list.
#[derive(Debug, Clone, Default)]
pub struct ServiceRequestFilter {
    pub request_type: Option<String>,
    pub status: Option<String>,
    pub fiscal_years: Vec<i32>,
    pub search: Option<String>,
    pub requester_user_id: Option<DbId>,
    /// `None` places no restriction on the requester's department.
    pub requester_department_ids: Option<Vec<DbId>>,
}

/// A row from the `request_timelines` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RequestTimeline {
    pub id: DbId,
    pub request_id: DbId,
    pub action: String,
    pub description: String,
    pub user_id: Option<DbId>,
    pub created_at: Timestamp,
}

/// A timeline line to record alongside a mutation.
#[derive(Debug, Clone)]
pub struct NewTimeline {
    pub action: &'static str,
    pub description: String,
    pub user_id: Option<DbId>,
}

/// A row from the `service_request_feedback` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Feedback {
    pub id: DbId,
    pub request_id: DbId,
    pub user_id: DbId,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Approval inputs resolved by the handler.
#[derive(Debug, Clone)]
pub struct ApproveRequest {
    pub approver_user_id: DbId,
    pub project_id: DbId,
    pub status_id: DbId,
    pub task_name: String,
    pub task_description: String,
    pub assignee_user_ids: Vec<DbId>,
    /// History line recorded on the new task.
    pub history_text: String,
}
