//! Task, status and project lifecycle rules.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::DbId;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

pub const MIN_PRIORITY: i32 = 1;
pub const MAX_PRIORITY: i32 = 4;
pub const DEFAULT_PRIORITY: i32 = 3;

pub const MAX_NAME_LENGTH: usize = 255;
pub const MAX_DESCRIPTION_LENGTH: usize = 5000;

/// Upper bound on task ids in one bulk update.
pub const MAX_BULK_TASKS: usize = 100;

/// Upper bound on project ids in one batch progress request.
pub const MAX_BATCH_PROGRESS_PROJECTS: usize = 50;

static HEX_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#[0-9a-fA-F]{6}$").expect("hex color pattern is valid")
});

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Terminal outcome of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CloseType {
    Completed,
    Aborted,
}

impl CloseType {
    pub fn as_str(self) -> &'static str {
        match self {
            CloseType::Completed => "COMPLETED",
            CloseType::Aborted => "ABORTED",
        }
    }

    pub fn parse(value: &str) -> Option<CloseType> {
        match value {
            "COMPLETED" => Some(CloseType::Completed),
            "ABORTED" => Some(CloseType::Aborted),
            _ => None,
        }
    }
}

/// Board column category of a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusType {
    NotStarted,
    InProgress,
    Done,
}

impl StatusType {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusType::NotStarted => "NOT_STARTED",
            StatusType::InProgress => "IN_PROGRESS",
            StatusType::Done => "DONE",
        }
    }

    pub fn parse(value: &str) -> Option<StatusType> {
        match value {
            "NOT_STARTED" => Some(StatusType::NotStarted),
            "IN_PROGRESS" => Some(StatusType::InProgress),
            "DONE" => Some(StatusType::Done),
            _ => None,
        }
    }
}

pub const PROJECT_STATUS_ACTIVE: &str = "ACTIVE";
pub const PROJECT_STATUS_COMPLETED: &str = "COMPLETED";
pub const PROJECT_STATUS_ON_HOLD: &str = "ON_HOLD";
pub const PROJECT_STATUS_ARCHIVED: &str = "ARCHIVED";

pub const VALID_PROJECT_STATUSES: &[&str] = &[
    PROJECT_STATUS_ACTIVE,
    PROJECT_STATUS_COMPLETED,
    PROJECT_STATUS_ON_HOLD,
    PROJECT_STATUS_ARCHIVED,
];

// ---------------------------------------------------------------------------
// Default statuses
// ---------------------------------------------------------------------------

/// A status seeded into every new project.
#[derive(Debug, Clone, Copy)]
pub struct DefaultStatus {
    pub name: &'static str,
    pub color: &'static str,
    pub order: i32,
    pub status_type: StatusType,
}

pub const DEFAULT_STATUSES: [DefaultStatus; 3] = [
    DefaultStatus {
        name: "Todo",
        color: "#94a3b8",
        order: 1,
        status_type: StatusType::NotStarted,
    },
    DefaultStatus {
        name: "In Progress",
        color: "#3b82f6",
        order: 2,
        status_type: StatusType::InProgress,
    },
    DefaultStatus {
        name: "Done",
        color: "#22c55e",
        order: 3,
        status_type: StatusType::Done,
    },
];

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub fn validate_priority(priority: i32) -> Result<(), String> {
    if (MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
        Ok(())
    } else {
        Err(format!(
            "Priority must be between {MIN_PRIORITY} and {MAX_PRIORITY}"
        ))
    }
}

pub fn validate_difficulty(difficulty: i32) -> Result<(), String> {
    use crate::progress::{MAX_DIFFICULTY, MIN_DIFFICULTY};
    if (MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&difficulty) {
        Ok(())
    } else {
        Err(format!(
            "Difficulty must be between {MIN_DIFFICULTY} and {MAX_DIFFICULTY}"
        ))
    }
}

/// Names are trimmed before the length check; blank names are rejected.
pub fn validate_name(field: &str, name: &str) -> Result<(), String> {
    let len = name.trim().chars().count();
    if len == 0 {
        return Err(format!("{field} is required"));
    }
    if len > MAX_NAME_LENGTH {
        return Err(format!(
            "{field} must be at most {MAX_NAME_LENGTH} characters"
        ));
    }
    Ok(())
}

pub fn validate_description(description: &str) -> Result<(), String> {
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(format!(
            "Description must be at most {MAX_DESCRIPTION_LENGTH} characters"
        ));
    }
    Ok(())
}

pub fn validate_color(color: &str) -> Result<(), String> {
    if HEX_COLOR.is_match(color) {
        Ok(())
    } else {
        Err(format!("Invalid color '{color}'. Expected #RRGGBB"))
    }
}

pub fn validate_project_status(status: &str) -> Result<(), String> {
    if VALID_PROJECT_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(format!(
            "Invalid project status '{status}'. Must be one of: {}",
            VALID_PROJECT_STATUSES.join(", ")
        ))
    }
}

/// Accepts `YYYY-MM-DD` (midnight UTC) or a full RFC 3339 timestamp.
pub fn parse_date_input(value: &str) -> Result<DateTime<Utc>, String> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| format!("Invalid date '{value}'. Expected YYYY-MM-DD or ISO 8601"))
}

/// Start must not come after due.
pub fn validate_date_order(
    start: Option<DateTime<Utc>>,
    due: Option<DateTime<Utc>>,
) -> Result<(), String> {
    match (start, due) {
        (Some(s), Some(d)) if s > d => Err("Start date must be before due date".to_string()),
        _ => Ok(()),
    }
}

pub fn validate_bulk_task_ids(task_ids: &[DbId]) -> Result<(), String> {
    if task_ids.is_empty() {
        return Err("At least one task id is required".to_string());
    }
    if task_ids.len() > MAX_BULK_TASKS {
        return Err(format!(
            "At most {MAX_BULK_TASKS} tasks can be updated at once"
        ));
    }
    Ok(())
}

pub fn validate_batch_project_ids(project_ids: &[DbId]) -> Result<(), String> {
    if project_ids.is_empty() {
        return Err("At least one project id is required".to_string());
    }
    if project_ids.len() > MAX_BATCH_PROGRESS_PROJECTS {
        return Err(format!(
            "At most {MAX_BATCH_PROGRESS_PROJECTS} projects can be requested at once"
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Assignees
// ---------------------------------------------------------------------------

/// Drop duplicates while keeping first-seen order.
pub fn dedupe_ids(ids: &[DbId]) -> Vec<DbId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Change between the current and requested assignee sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssigneeDiff {
    pub added: Vec<DbId>,
    pub removed: Vec<DbId>,
    /// The requested set, deduplicated, in request order.
    pub next: Vec<DbId>,
}

impl AssigneeDiff {
    pub fn compute(current: &[DbId], requested: &[DbId]) -> Self {
        let next = dedupe_ids(requested);
        let added = next
            .iter()
            .copied()
            .filter(|id| !current.contains(id))
            .collect();
        let removed = dedupe_ids(current)
            .into_iter()
            .filter(|id| !next.contains(id))
            .collect();
        AssigneeDiff {
            added,
            removed,
            next,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// The legacy single-assignee column mirrors the first assignee.
    pub fn primary(&self) -> Option<DbId> {
        self.next.first().copied()
    }
}

/// Who hears about an assignment change: everyone newly added except the
/// actor, plus the creator when they are neither the actor nor newly added.
pub fn assignment_recipients(diff: &AssigneeDiff, actor: DbId, creator: DbId) -> Vec<DbId> {
    let mut recipients: Vec<DbId> = diff.added.iter().copied().filter(|id| *id != actor).collect();
    if !diff.added.is_empty() && creator != actor && !diff.added.contains(&creator) {
        recipients.push(creator);
    }
    recipients
}

/// Who hears about a closed task: the primary assignee unless they closed
/// it, and the creator unless they closed it or are that assignee.
pub fn close_recipients(closer: DbId, creator: DbId, primary_assignee: Option<DbId>) -> Vec<DbId> {
    let mut recipients = Vec::new();
    if let Some(assignee) = primary_assignee.filter(|a| *a != closer) {
        recipients.push(assignee);
    }
    if creator != closer && Some(creator) != primary_assignee {
        recipients.push(creator);
    }
    recipients
}

// ---------------------------------------------------------------------------
// History text
// ---------------------------------------------------------------------------

pub fn priority_label(priority: i32) -> &'static str {
    match priority {
        1 => "Urgent",
        2 => "High",
        3 => "Normal",
        4 => "Low",
        _ => "Unknown",
    }
}

pub fn difficulty_label(difficulty: i32) -> &'static str {
    match difficulty {
        1 => "Very easy",
        2 => "Easy",
        3 => "Normal",
        4 => "Hard",
        5 => "Very hard",
        _ => "Unknown",
    }
}

pub mod history {
    //! One-line descriptions stored in `histories.history_text`.

    use super::{difficulty_label, priority_label, CloseType};

    pub fn created(task: &str) -> String {
        format!("Created task \"{task}\"")
    }

    pub fn renamed(before: &str, after: &str) -> String {
        format!("Renamed task \"{before}\" to \"{after}\"")
    }

    pub fn description_changed(task: &str) -> String {
        format!("Edited the description of \"{task}\"")
    }

    pub fn status_changed(task: &str, from: &str, to: &str) -> String {
        format!("Moved \"{task}\" from \"{from}\" to \"{to}\"")
    }

    pub fn assigned(task: &str, names: &[String]) -> String {
        format!("Assigned \"{task}\" to {}", names.join(", "))
    }

    pub fn unassigned(task: &str, names: &[String]) -> String {
        format!("Unassigned {} from \"{task}\"", names.join(", "))
    }

    pub fn priority_changed(task: &str, priority: i32) -> String {
        format!("Set priority of \"{task}\" to {}", priority_label(priority))
    }

    pub fn difficulty_changed(task: &str, difficulty: i32) -> String {
        format!(
            "Set difficulty of \"{task}\" to {}",
            difficulty_label(difficulty)
        )
    }

    pub fn start_date_changed(task: &str, date: Option<&str>) -> String {
        match date {
            Some(d) => format!("Set start date of \"{task}\" to {d}"),
            None => format!("Cleared start date of \"{task}\""),
        }
    }

    pub fn due_date_changed(task: &str, date: Option<&str>) -> String {
        match date {
            Some(d) => format!("Set due date of \"{task}\" to {d}"),
            None => format!("Cleared due date of \"{task}\""),
        }
    }

    pub fn closed(task: &str, close_type: CloseType, reason: Option<&str>) -> String {
        let base = match close_type {
            CloseType::Completed => format!("Closed \"{task}\" as completed"),
            CloseType::Aborted => format!("Closed \"{task}\" as aborted"),
        };
        match reason.map(str::trim).filter(|r| !r.is_empty()) {
            Some(r) => format!("{base}: {r}"),
            None => base,
        }
    }

    pub fn reopened(task: &str) -> String {
        format!("Reopened \"{task}\"")
    }

    pub fn deleted(task: &str) -> String {
        format!("Deleted task \"{task}\"")
    }

    pub fn bulk_updated(changes: &[String]) -> String {
        format!("Bulk update: {}", changes.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_bounds() {
        assert!(validate_priority(1).is_ok());
        assert!(validate_priority(4).is_ok());
        assert!(validate_priority(0).is_err());
        assert!(validate_priority(5).is_err());
    }

    #[test]
    fn test_difficulty_bounds() {
        assert!(validate_difficulty(5).is_ok());
        assert!(validate_difficulty(6).is_err());
    }

    #[test]
    fn test_name_validation() {
        assert!(validate_name("Name", "  ").is_err());
        assert!(validate_name("Name", "Write report").is_ok());
        assert!(validate_name("Name", &"x".repeat(256)).is_err());
    }

    #[test]
    fn test_color_validation() {
        assert!(validate_color("#22c55e").is_ok());
        assert!(validate_color("22c55e").is_err());
        assert!(validate_color("#22c55").is_err());
    }

    #[test]
    fn test_parse_date_input() {
        let d = parse_date_input("2025-03-01").unwrap();
        assert_eq!(d.to_rfc3339(), "2025-03-01T00:00:00+00:00");
        let iso = parse_date_input("2025-03-01T10:30:00+07:00").unwrap();
        assert_eq!(iso.to_rfc3339(), "2025-03-01T03:30:00+00:00");
        assert!(parse_date_input("01/03/2025").is_err());
    }

    #[test]
    fn test_date_order() {
        let a = parse_date_input("2025-01-01").ok();
        let b = parse_date_input("2025-02-01").ok();
        assert!(validate_date_order(a, b).is_ok());
        assert!(validate_date_order(b, a).is_err());
        assert!(validate_date_order(None, a).is_ok());
    }

    #[test]
    fn test_bulk_limits() {
        assert!(validate_bulk_task_ids(&[]).is_err());
        assert!(validate_bulk_task_ids(&vec![1; 100]).is_ok());
        assert!(validate_bulk_task_ids(&vec![1; 101]).is_err());
        assert!(validate_batch_project_ids(&vec![1; 51]).is_err());
    }

    #[test]
    fn test_assignee_diff() {
        let diff = AssigneeDiff::compute(&[1, 2, 3], &[3, 4, 4, 5]);
        assert_eq!(diff.added, vec![4, 5]);
        assert_eq!(diff.removed, vec![1, 2]);
        assert_eq!(diff.next, vec![3, 4, 5]);
        assert_eq!(diff.primary(), Some(3));
        assert!(AssigneeDiff::compute(&[1], &[1]).is_empty());
    }

    #[test]
    fn test_assignment_recipients() {
        let diff = AssigneeDiff::compute(&[], &[2, 9]);
        // actor 9 excluded, creator 5 appended
        assert_eq!(assignment_recipients(&diff, 9, 5), vec![2, 5]);
        // creator is the actor
        assert_eq!(assignment_recipients(&diff, 5, 5), vec![2, 9]);
        // nothing added, nobody notified
        let none = AssigneeDiff::compute(&[2], &[]);
        assert!(assignment_recipients(&none, 9, 5).is_empty());
    }

    #[test]
    fn test_close_recipients() {
        assert_eq!(close_recipients(1, 2, Some(3)), vec![3, 2]);
        assert_eq!(close_recipients(3, 2, Some(3)), vec![2]);
        assert_eq!(close_recipients(1, 3, Some(3)), vec![3]);
        assert_eq!(close_recipients(1, 1, None), Vec::<DbId>::new());
    }

    #[test]
    fn test_history_texts() {
        assert_eq!(history::created("A"), "Created task \"A\"");
        assert_eq!(
            history::closed("A", CloseType::Aborted, Some(" duplicate ")),
            "Closed \"A\" as aborted: duplicate"
        );
        assert_eq!(history::priority_changed("A", 1), "Set priority of \"A\" to Urgent");
    }

    #[test]
    fn test_close_type_parse() {
        assert_eq!(CloseType::parse("COMPLETED"), Some(CloseType::Completed));
        assert_eq!(CloseType::parse("completed"), None);
        assert_eq!(StatusType::parse("DONE"), Some(StatusType::Done));
    }

    #[test]
    fn test_default_statuses() {
        let orders: Vec<i32> = DEFAULT_STATUSES.iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![1, 2, 3]);
        assert_eq!(DEFAULT_STATUSES[0].status_type, StatusType::NotStarted);
    }
}
