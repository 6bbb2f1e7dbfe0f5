//! In-app notification types and message text.

pub const TYPE_TASK_ASSIGNED: &str = "TASK_ASSIGNED";
pub const TYPE_TASK_CLOSED: &str = "TASK_CLOSED";
pub const TYPE_TASK_REOPENED: &str = "TASK_REOPENED";
pub const TYPE_COMMENT_ADDED: &str = "COMMENT_ADDED";
pub const TYPE_SERVICE_REQUEST_SUBMITTED: &str = "SERVICE_REQUEST_SUBMITTED";
pub const TYPE_SERVICE_REQUEST_APPROVED: &str = "SERVICE_REQUEST_APPROVED";
pub const TYPE_SERVICE_REQUEST_REJECTED: &str = "SERVICE_REQUEST_REJECTED";
pub const TYPE_SERVICE_REQUEST_COMPLETED: &str = "SERVICE_REQUEST_COMPLETED";
pub const TYPE_SERVICE_REQUEST_CANCELLED: &str = "SERVICE_REQUEST_CANCELLED";
pub const TYPE_SERVICE_REQUEST_LOW_RATING: &str = "SERVICE_REQUEST_LOW_RATING";
pub const TYPE_SERVICE_REQUEST_COMMENT: &str = "SERVICE_REQUEST_COMMENT";

pub fn task_assigned(actor: &str, task: &str) -> String {
    format!("{actor} assigned \"{task}\" to you")
}

pub fn task_reassigned(actor: &str, task: &str, names: &[String]) -> String {
    format!("{actor} assigned your task \"{task}\" to {}", names.join(", "))
}

pub fn task_closed(actor: &str, task: &str, completed: bool) -> String {
    if completed {
        format!("{actor} completed \"{task}\"")
    } else {
        format!("{actor} aborted \"{task}\"")
    }
}

pub fn task_reopened(actor: &str, task: &str) -> String {
    format!("{actor} reopened \"{task}\"")
}

pub fn comment_added(actor: &str, task: &str) -> String {
    format!("{actor} commented on \"{task}\"")
}

pub fn request_submitted(requester: &str, number: &str, subject: &str) -> String {
    format!("{requester} submitted {number}: {subject}")
}

pub fn request_approved(number: &str) -> String {
    format!("Your request {number} was approved")
}

pub fn request_rejected(number: &str, reason: &str) -> String {
    format!("Your request {number} was rejected: {reason}")
}

pub fn request_completed(number: &str) -> String {
    format!("Your request {number} has been completed")
}

pub fn request_cancelled(number: &str) -> String {
    format!("Your request {number} was cancelled")
}

pub fn request_comment(actor: &str, number: &str) -> String {
    format!("{actor} commented on request {number}")
}

pub fn low_rating(number: &str, rating: i32) -> String {
    format!("Request {number} received a low rating ({rating}/10)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(task_assigned("Somchai", "Audit"), "Somchai assigned \"Audit\" to you");
        assert_eq!(
            task_reassigned("Somchai", "Audit", &["Anan".to_string(), "Mali".to_string()]),
            "Somchai assigned your task \"Audit\" to Anan, Mali"
        );
        assert_eq!(
            request_comment("Mali", "SR-2025-00003"),
            "Mali commented on request SR-2025-00003"
        );
        assert_eq!(low_rating("SR-2025-00001", 2), "Request SR-2025-00001 received a low rating (2/10)");
    }
}
