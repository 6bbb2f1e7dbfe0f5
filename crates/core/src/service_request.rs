//! Service request workflow rules.
//!
//! A request is submitted as `PENDING`, then approved (creating a linked
//! task), rejected, or cancelled by its requester. Closing the linked task
//! finishes the request. Requesters rate completed requests.

use serde::{Deserialize, Serialize};

use crate::roles::Role;

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

pub const TYPE_DATA: &str = "DATA";
pub const TYPE_PROGRAM: &str = "PROGRAM";
pub const TYPE_HARDWARE: &str = "HARDWARE";
pub const TYPE_NETWORK: &str = "NETWORK";
pub const TYPE_IT_ISSUE: &str = "IT_ISSUE";

pub const VALID_TYPES: &[&str] = &[
    TYPE_DATA,
    TYPE_PROGRAM,
    TYPE_HARDWARE,
    TYPE_NETWORK,
    TYPE_IT_ISSUE,
];

pub const URGENCY_LOW: &str = "LOW";
pub const URGENCY_MEDIUM: &str = "MEDIUM";
pub const URGENCY_HIGH: &str = "HIGH";
pub const URGENCY_CRITICAL: &str = "CRITICAL";

pub const VALID_URGENCIES: &[&str] = &[URGENCY_LOW, URGENCY_MEDIUM, URGENCY_HIGH, URGENCY_CRITICAL];

pub const DEFAULT_URGENCY: &str = URGENCY_MEDIUM;

pub const PURPOSE_OTHER: &str = "OTHER";
pub const VALID_PURPOSES: &[&str] = &["EXECUTIVE", "EDUCATION", "CAPABILITY", PURPOSE_OTHER];

/// Lifecycle state of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    InProgress,
    Completed,
    Cancelled,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 6] = [
        RequestStatus::Pending,
        RequestStatus::Approved,
        RequestStatus::Rejected,
        RequestStatus::InProgress,
        RequestStatus::Completed,
        RequestStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::Approved => "APPROVED",
            RequestStatus::Rejected => "REJECTED",
            RequestStatus::InProgress => "IN_PROGRESS",
            RequestStatus::Completed => "COMPLETED",
            RequestStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(value: &str) -> Option<RequestStatus> {
        RequestStatus::ALL.into_iter().find(|s| s.as_str() == value)
    }

    /// Whether the request may move to `next`.
    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        use RequestStatus::*;
        matches!(
            (self, next),
            (Pending, Approved)
                | (Pending, Rejected)
                | (Pending, Cancelled)
                | (Approved, InProgress)
                | (Approved, Completed)
                | (Approved, Cancelled)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
        )
    }
}

/// Timeline entry kinds written to `request_timelines.action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimelineAction {
    Created,
    Approved,
    Rejected,
    TaskCreated,
    Completed,
    Cancelled,
    FeedbackSubmitted,
    FeedbackUpdated,
}

impl TimelineAction {
    pub fn as_str(self) -> &'static str {
        match self {
            TimelineAction::Created => "CREATED",
            TimelineAction::Approved => "APPROVED",
            TimelineAction::Rejected => "REJECTED",
            TimelineAction::TaskCreated => "TASK_CREATED",
            TimelineAction::Completed => "COMPLETED",
            TimelineAction::Cancelled => "CANCELLED",
            TimelineAction::FeedbackSubmitted => "FEEDBACK_SUBMITTED",
            TimelineAction::FeedbackUpdated => "FEEDBACK_UPDATED",
        }
    }
}

// ---------------------------------------------------------------------------
// Request numbers
// ---------------------------------------------------------------------------

/// Prefix shared by every request number issued in `year`.
pub fn request_number_prefix(year: i32) -> String {
    format!("SR-{year}-")
}

/// `SR-YYYY-NNNNN`, zero-padded to five digits.
pub fn format_request_number(year: i32, sequence: u32) -> String {
    format!("SR-{year}-{sequence:05}")
}

/// Parse `SR-YYYY-NNNNN` into `(year, sequence)`.
pub fn parse_request_number(number: &str) -> Option<(i32, u32)> {
    let mut parts = number.split('-');
    if parts.next()? != "SR" {
        return None;
    }
    let year = parts.next()?.parse().ok()?;
    let sequence = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((year, sequence))
}

/// Next number given the highest number already issued for `year`.
pub fn next_request_number(year: i32, last: Option<&str>) -> String {
    let next = last
        .and_then(parse_request_number)
        .filter(|(y, _)| *y == year)
        .map_or(1, |(_, seq)| seq + 1);
    format_request_number(year, next)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub const SUBJECT_MIN: usize = 5;
pub const SUBJECT_MAX: usize = 200;
pub const DESCRIPTION_MIN: usize = 20;
pub const DESCRIPTION_MAX: usize = 2000;
pub const OTHER_PURPOSE_MAX: usize = 200;
pub const LOCATION_MAX: usize = 100;
pub const MAX_REASON_LENGTH: usize = 1000;

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 10;

/// Ratings at or below this notify administrators.
pub const LOW_RATING_THRESHOLD: i32 = 3;

/// Priority given to the task created on approval.
pub const APPROVED_TASK_PRIORITY: i32 = 2;

/// Submission fields after trimming.
#[derive(Debug, Clone)]
pub struct RequestDraft<'a> {
    pub request_type: &'a str,
    pub subject: &'a str,
    pub description: &'a str,
    pub urgency: &'a str,
    pub purposes: &'a [String],
    pub other_purpose: Option<&'a str>,
    pub location: Option<&'a str>,
}

fn check_len(field: &str, value: &str, min: usize, max: usize) -> Result<(), String> {
    let len = value.trim().chars().count();
    if len < min {
        return Err(format!("{field} must be at least {min} characters"));
    }
    if len > max {
        return Err(format!("{field} must be at most {max} characters"));
    }
    Ok(())
}

fn check_one_of(field: &str, value: &str, valid: &[&str]) -> Result<(), String> {
    if valid.contains(&value) {
        Ok(())
    } else {
        Err(format!(
            "Invalid {field} '{value}'. Must be one of: {}",
            valid.join(", ")
        ))
    }
}

pub fn validate_request_type(value: &str) -> Result<(), String> {
    check_one_of("type", value, VALID_TYPES)
}

pub fn validate_urgency(value: &str) -> Result<(), String> {
    check_one_of("urgency", value, VALID_URGENCIES)
}

/// Validate a new or edited request.
///
/// DATA and PROGRAM requests need at least one purpose; `other_purpose`
/// only makes sense alongside `OTHER`.
pub fn validate_request(draft: &RequestDraft<'_>) -> Result<(), String> {
    validate_request_type(draft.request_type)?;
    check_len("Subject", draft.subject, SUBJECT_MIN, SUBJECT_MAX)?;
    check_len("Description", draft.description, DESCRIPTION_MIN, DESCRIPTION_MAX)?;
    validate_urgency(draft.urgency)?;

    for purpose in draft.purposes {
        check_one_of("purpose", purpose, VALID_PURPOSES)?;
    }
    if matches!(draft.request_type, TYPE_DATA | TYPE_PROGRAM) && draft.purposes.is_empty() {
        return Err("At least one purpose is required".to_string());
    }
    if let Some(other) = draft.other_purpose {
        check_len("Other purpose", other, 0, OTHER_PURPOSE_MAX)?;
    }
    if let Some(location) = draft.location {
        check_len("Location", location, 0, LOCATION_MAX)?;
    }
    Ok(())
}

pub fn validate_rating(rating: i32) -> Result<(), String> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(format!(
            "Rating must be between {MIN_RATING} and {MAX_RATING}"
        ))
    }
}

pub fn validate_reject_reason(reason: &str) -> Result<(), String> {
    let len = reason.trim().chars().count();
    if len == 0 {
        return Err("A rejection reason is required".to_string());
    }
    if len > MAX_REASON_LENGTH {
        return Err(format!(
            "Reason must be at most {MAX_REASON_LENGTH} characters"
        ));
    }
    Ok(())
}

pub fn is_low_rating(rating: i32) -> bool {
    rating <= LOW_RATING_THRESHOLD
}

// ---------------------------------------------------------------------------
// Feedback statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingBucket {
    pub rating: i32,
    pub count: i64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackSummary {
    pub total: i64,
    pub average_rating: f64,
    pub low_rating_count: i64,
    /// One bucket per rating from [`MIN_RATING`] to [`MAX_RATING`].
    pub distribution: Vec<RatingBucket>,
}

/// Summarize `(rating, count)` pairs. Ratings outside the scale are ignored.
pub fn summarize_feedback(counts: &[(i32, i64)]) -> FeedbackSummary {
    let valid = || counts.iter().filter(|(r, _)| (MIN_RATING..=MAX_RATING).contains(r));
    let total: i64 = valid().map(|(_, c)| c).sum();
    let rating_sum: i64 = valid().map(|(r, c)| i64::from(*r) * c).sum();
    let low_rating_count = valid().filter(|(r, _)| is_low_rating(*r)).map(|(_, c)| c).sum();

    let distribution = (MIN_RATING..=MAX_RATING)
        .map(|rating| {
            let count: i64 = valid().filter(|(r, _)| *r == rating).map(|(_, c)| c).sum();
            let percentage = if total > 0 {
                round2(count as f64 * 100.0 / total as f64)
            } else {
                0.0
            };
            RatingBucket {
                rating,
                count,
                percentage,
            }
        })
        .collect();

    let average_rating = if total > 0 {
        round2(rating_sum as f64 / total as f64)
    } else {
        0.0
    };

    FeedbackSummary {
        total,
        average_rating,
        low_rating_count,
        distribution,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Derived values
// ---------------------------------------------------------------------------

/// Display name of a request type.
pub fn type_label(request_type: &str) -> &'static str {
    match request_type {
        TYPE_DATA => "Data",
        TYPE_PROGRAM => "Program",
        TYPE_HARDWARE => "Hardware",
        TYPE_NETWORK => "Network",
        TYPE_IT_ISSUE => "IT issue",
        _ => "Service",
    }
}

/// Name of the task created when a request is approved.
pub fn approved_task_name(request_type: &str, request_number: &str, subject: &str) -> String {
    format!("{} request #{request_number} - {subject}", type_label(request_type))
}

/// How a request should react when its linked task is closed.
pub fn status_after_task_close(close_type: crate::task::CloseType) -> RequestStatus {
    match close_type {
        crate::task::CloseType::Completed => RequestStatus::Completed,
        crate::task::CloseType::Aborted => RequestStatus::Cancelled,
    }
}

/// Which requesters a non-admin approver sees in a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestVisibility {
    Own,
    All,
    MissionGroup,
    Division,
    Department,
}

/// Visibility for the request list.
///
/// `my_requests` narrows every role to their own requests.
pub fn request_visibility(role: Role, my_requests: bool) -> RequestVisibility {
    if my_requests {
        return RequestVisibility::Own;
    }
    match role {
        Role::Admin => RequestVisibility::All,
        Role::Chief => RequestVisibility::MissionGroup,
        Role::Leader => RequestVisibility::Division,
        Role::Head | Role::Member | Role::User => RequestVisibility::Department,
    }
}

pub mod timeline {
    //! Descriptions stored in `service_request_timelines.description`.

    pub fn created(requester: &str) -> String {
        format!("Submitted by {requester}")
    }

    pub fn approved(approver: &str) -> String {
        format!("Approved by {approver}")
    }

    pub fn task_created(task: &str) -> String {
        format!("Created task \"{task}\"")
    }

    pub fn rejected(approver: &str, reason: &str) -> String {
        format!("Rejected by {approver}: {}", reason.trim())
    }

    pub fn cancelled(actor: &str) -> String {
        format!("Cancelled by {actor}")
    }

    pub fn task_completed(task: &str) -> String {
        format!("Task \"{task}\" completed")
    }

    pub fn task_aborted(task: &str) -> String {
        format!("Task \"{task}\" aborted")
    }

    pub fn feedback(rating: i32) -> String {
        format!("Rated {rating}/10")
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::task::CloseType;

    fn draft<'a>(request_type: &'a str, purposes: &'a [String]) -> RequestDraft<'a> {
        RequestDraft {
            request_type,
            subject: "Need sales data",
            description: "Monthly sales broken down by province.",
            urgency: "HIGH",
            purposes,
            other_purpose: None,
            location: None,
        }
    }

    #[test]
    fn test_request_number_format() {
        assert_eq!(format_request_number(2025, 7), "SR-2025-00007");
        assert_eq!(parse_request_number("SR-2025-00123"), Some((2025, 123)));
        assert_eq!(parse_request_number("XX-2025-1"), None);
        assert_eq!(parse_request_number("SR-2025-1-2"), None);
    }

    #[test]
    fn test_next_request_number() {
        assert_eq!(next_request_number(2025, None), "SR-2025-00001");
        assert_eq!(next_request_number(2025, Some("SR-2025-00041")), "SR-2025-00042");
        assert_eq!(next_request_number(2026, Some("SR-2025-00041")), "SR-2026-00001");
    }

    #[test]
    fn test_valid_data_request() {
        let purposes = vec!["EXECUTIVE".to_string()];
        assert!(validate_request(&draft(TYPE_DATA, &purposes)).is_ok());
    }

    #[test]
    fn test_data_request_needs_purpose() {
        let err = validate_request(&draft(TYPE_DATA, &[])).unwrap_err();
        assert!(err.contains("purpose"));
        assert!(validate_request(&draft(TYPE_IT_ISSUE, &[])).is_ok());
    }

    #[test]
    fn test_subject_and_description_lengths() {
        let mut d = draft(TYPE_HARDWARE, &[]);
        d.subject = "abc";
        assert!(validate_request(&d).is_err());
        let mut d = draft(TYPE_HARDWARE, &[]);
        d.description = "too short";
        assert!(validate_request(&d).is_err());
    }

    #[test]
    fn test_unknown_purpose_rejected() {
        let purposes = vec!["FUN".to_string()];
        assert!(validate_request(&draft(TYPE_PROGRAM, &purposes)).is_err());
    }

    #[test]
    fn test_rating_bounds() {
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(10).is_ok());
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(11).is_err());
        assert!(is_low_rating(3));
        assert!(!is_low_rating(4));
    }

    #[test]
    fn test_transitions() {
        assert!(RequestStatus::Pending.can_transition_to(RequestStatus::Approved));
        assert!(RequestStatus::Pending.can_transition_to(RequestStatus::Cancelled));
        assert!(!RequestStatus::Rejected.can_transition_to(RequestStatus::Approved));
        assert!(!RequestStatus::Completed.can_transition_to(RequestStatus::Cancelled));
    }

    #[test]
    fn test_status_after_task_close() {
        assert_eq!(status_after_task_close(CloseType::Completed), RequestStatus::Completed);
        assert_eq!(status_after_task_close(CloseType::Aborted), RequestStatus::Cancelled);
    }

    #[test]
    fn test_visibility() {
        assert_matches!(request_visibility(Role::Admin, false), RequestVisibility::All);
        assert_matches!(request_visibility(Role::Admin, true), RequestVisibility::Own);
        assert_matches!(request_visibility(Role::Chief, false), RequestVisibility::MissionGroup);
        assert_matches!(request_visibility(Role::Member, false), RequestVisibility::Department);
    }

    #[test]
    fn test_reject_reason() {
        assert!(validate_reject_reason("  ").is_err());
        assert!(validate_reject_reason("Out of scope").is_ok());
    }

    #[test]
    fn test_feedback_summary() {
        let summary = summarize_feedback(&[(10, 2), (2, 1), (11, 5)]);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.low_rating_count, 1);
        assert_eq!(summary.average_rating, 7.33);
        assert_eq!(summary.distribution.len(), 10);
        assert_eq!(summary.distribution[9].count, 2);
        assert_eq!(summary.distribution[9].percentage, 66.67);
    }

    #[test]
    fn test_feedback_summary_empty() {
        let summary = summarize_feedback(&[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.average_rating, 0.0);
        assert!(summary.distribution.iter().all(|b| b.count == 0));
    }

    #[test]
    fn test_approved_task_name() {
        assert_eq!(
            approved_task_name(TYPE_DATA, "SR-2025-00001", "Sales data"),
            "Data request #SR-2025-00001 - Sales data"
        );
    }

    #[test]
    fn test_timeline_text() {
        assert_eq!(timeline::rejected("Anan", "  out of scope "), "Rejected by Anan: out of scope");
        assert_eq!(timeline::task_completed("Fix VPN"), "Task \"Fix VPN\" completed");
    }
}
