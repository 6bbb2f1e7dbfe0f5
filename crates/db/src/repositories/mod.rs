//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument. Writes spanning several
//! rows open their own transaction.

pub mod checklist_repo;
pub mod comment_repo;
pub mod feedback_repo;
pub mod history_repo;
pub mod notification_repo;
pub mod organization_repo;
pub mod phase_repo;
pub mod pinned_task_repo;
pub mod project_repo;
pub mod report_repo;
pub mod request_comment_repo;
pub mod service_request_repo;
pub mod session_repo;
pub mod status_repo;
pub mod task_repo;
pub mod user_repo;

pub use checklist_repo::ChecklistRepo;
pub use comment_repo::CommentRepo;
pub use feedback_repo::FeedbackRepo;
pub use history_repo::HistoryRepo;
pub use notification_repo::NotificationRepo;
pub use organization_repo::OrganizationRepo;
pub use phase_repo::PhaseRepo;
pub use pinned_task_repo::PinnedTaskRepo;
pub use project_repo::ProjectRepo;
pub use report_repo::ReportRepo;
pub use request_comment_repo::RequestCommentRepo;
pub use service_request_repo::ServiceRequestRepo;
pub use session_repo::SessionRepo;
pub use status_repo::StatusRepo;
pub use task_repo::TaskRepo;
pub use user_repo::UserRepo;
