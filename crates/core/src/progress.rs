//! Weighted project progress.
//!
//! ```text
//! progress = sum(status_order * difficulty) / sum(s_max * difficulty) * 100
//! ```
//!
//! ABORTED tasks are excluded, COMPLETED tasks count at `s_max`, and open
//! tasks count at the order of their current status.

use serde::Serialize;

use crate::task::CloseType;

/// Difficulty used when a task has none, or an out-of-range value.
pub const DEFAULT_DIFFICULTY: i32 = 2;

/// Lowest and highest accepted difficulty.
pub const MIN_DIFFICULTY: i32 = 1;
pub const MAX_DIFFICULTY: i32 = 5;

/// The task facts the formula reads.
#[derive(Debug, Clone, Copy)]
pub struct ProgressTask {
    pub difficulty: Option<i32>,
    pub status_order: Option<i32>,
    pub close_type: Option<CloseType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressResult {
    /// Percentage rounded to two decimals.
    pub progress: f64,
    pub completed_weight: i64,
    pub total_weight: i64,
    pub max_status_order: i32,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub aborted_tasks: usize,
    pub open_tasks: usize,
}

fn effective_difficulty(difficulty: Option<i32>) -> i64 {
    match difficulty {
        Some(d) if (MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&d) => i64::from(d),
        _ => i64::from(DEFAULT_DIFFICULTY),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Compute progress for a task list given every status order of the project.
pub fn calculate_progress(tasks: &[ProgressTask], status_orders: &[i32]) -> ProgressResult {
    let aborted_tasks = tasks
        .iter()
        .filter(|t| t.close_type == Some(CloseType::Aborted))
        .count();
    let total_tasks = tasks.len() - aborted_tasks;

    let mut result = ProgressResult {
        progress: 0.0,
        completed_weight: 0,
        total_weight: 0,
        max_status_order: 0,
        total_tasks,
        completed_tasks: 0,
        aborted_tasks,
        open_tasks: 0,
    };
    if total_tasks == 0 {
        return result;
    }

    let max_status_order = status_orders.iter().copied().max().unwrap_or(1).max(1);
    result.max_status_order = max_status_order;

    for task in tasks {
        let difficulty = effective_difficulty(task.difficulty);
        let order = match task.close_type {
            Some(CloseType::Aborted) => continue,
            Some(CloseType::Completed) => {
                result.completed_tasks += 1;
                max_status_order
            }
            None => {
                result.open_tasks += 1;
                task.status_order.filter(|o| *o > 0).unwrap_or(1)
            }
        };
        result.completed_weight += i64::from(order) * difficulty;
        result.total_weight += i64::from(max_status_order) * difficulty;
    }

    if result.total_weight > 0 {
        result.progress =
            round2(result.completed_weight as f64 / result.total_weight as f64 * 100.0);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(order: i32, difficulty: Option<i32>) -> ProgressTask {
        ProgressTask { difficulty, status_order: Some(order), close_type: None }
    }

    fn closed(close_type: CloseType, difficulty: Option<i32>) -> ProgressTask {
        ProgressTask { difficulty, status_order: Some(1), close_type: Some(close_type) }
    }

    #[test]
    fn test_all_completed_is_100() {
        let tasks = vec![
            closed(CloseType::Completed, Some(1)),
            closed(CloseType::Completed, Some(5)),
            closed(CloseType::Completed, None),
        ];
        let result = calculate_progress(&tasks, &[1, 2, 3]);
        assert_eq!(result.progress, 100.0);
        assert_eq!(result.completed_tasks, 3);
    }

    #[test]
    fn test_empty_is_zero() {
        let result = calculate_progress(&[], &[1, 2, 3]);
        assert_eq!(result.progress, 0.0);
        assert_eq!(result.total_weight, 0);
        assert_eq!(result.max_status_order, 0);
        assert_eq!(result.total_tasks, 0);
    }

    #[test]
    fn test_aborted_tasks_are_ignored() {
        let tasks = vec![
            closed(CloseType::Completed, Some(2)),
            closed(CloseType::Aborted, Some(5)),
        ];
        let result = calculate_progress(&tasks, &[1, 2, 3]);
        assert_eq!(result.progress, 100.0);
        assert_eq!(result.aborted_tasks, 1);
        assert_eq!(result.total_tasks, 1);
    }

    #[test]
    fn test_only_aborted_is_zero() {
        let result = calculate_progress(&[closed(CloseType::Aborted, None)], &[1, 2, 3]);
        assert_eq!(result.progress, 0.0);
        assert_eq!(result.total_tasks, 0);
        assert_eq!(result.aborted_tasks, 1);
        assert_eq!(result.max_status_order, 0);
    }

    #[test]
    fn test_weighted_mix() {
        // 1*2 + 3*4 = 14 over 3*2 + 3*4 = 18 -> 77.78
        let tasks = vec![open(1, Some(2)), closed(CloseType::Completed, Some(4))];
        let result = calculate_progress(&tasks, &[1, 2, 3]);
        assert_eq!(result.completed_weight, 14);
        assert_eq!(result.total_weight, 18);
        assert_eq!(result.progress, 77.78);
        assert_eq!(result.open_tasks, 1);
    }

    #[test]
    fn test_invalid_difficulty_defaults_to_two() {
        let a = calculate_progress(&[open(2, Some(9)), open(1, Some(0))], &[1, 2]);
        let b = calculate_progress(&[open(2, None), open(1, None)], &[1, 2]);
        assert_eq!(a, b);
        assert_eq!(a.total_weight, 8);
    }

    #[test]
    fn test_no_statuses_uses_smax_one() {
        let result = calculate_progress(&[open(1, None)], &[]);
        assert_eq!(result.max_status_order, 1);
        assert_eq!(result.progress, 100.0);
    }

    #[test]
    fn test_missing_status_order_counts_as_one() {
        let task = ProgressTask { difficulty: None, status_order: None, close_type: None };
        let result = calculate_progress(&[task], &[1, 2, 4]);
        assert_eq!(result.progress, 25.0);
    }
}
