//! # Goal Metrics
//!
//! Progress, lateness and deadlines for manually tracked goals.
//!
//! ## Derived Status
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  stored status   now > end_date   →  effective status                  │
//! │  ─────────────   ──────────────      ────────────────                  │
//! │  completed       any                  completed  (never revoked)        │
//! │  active / late   yes                  late                              │
//! │  late            no                   late       (kept as stored)       │
//! │  active          no                   active                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The effective status is recomputed on every read and never written back.
//! Progress comes from `current_value`, which a person types in; nothing
//! here derives it from sales. [`progress_update`] prepares the record an
//! external writer persists when that person submits a new value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{Goal, GoalKind, GoalStatus, Priority};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

// =============================================================================
// Progress
// =============================================================================

/// `current / target`, unclamped. Zero for a non-positive target.
pub fn progress_ratio(goal: &Goal) -> f64 {
    ratio(goal.current_value, goal.target_value)
}

/// Progress in percent, clamped to `0..=100`.
///
/// A zero target cannot happen in valid data; it yields 0% instead of a
/// division fault.
pub fn progress_percent(goal: &Goal) -> f64 {
    (progress_ratio(goal) * 100.0).clamp(0.0, 100.0)
}

fn ratio(current: f64, target: f64) -> f64 {
    if !target.is_finite() || target <= 0.0 || !current.is_finite() {
        return 0.0;
    }
    current / target
}

// =============================================================================
// Lateness
// =============================================================================

/// Past the end date and not completed.
pub fn is_goal_late(goal: &Goal, now: DateTime<Utc>) -> bool {
    now > goal.end_date && goal.status != GoalStatus::Completed
}

/// Status as the dashboards should show it at `now`.
pub fn effective_status(goal: &Goal, now: DateTime<Utc>) -> GoalStatus {
    match goal.status {
        GoalStatus::Completed => GoalStatus::Completed,
        _ if is_goal_late(goal, now) => GoalStatus::Late,
        stored => stored,
    }
}

/// Whole days until the end date, rounded up. Zero or negative once the end
/// date has passed.
pub fn days_remaining(goal: &Goal, now: DateTime<Utc>) -> i64 {
    let millis = (goal.end_date - now).num_milliseconds();
    // ceil(millis / day) for a positive divisor
    -((-millis).div_euclid(MILLIS_PER_DAY))
}

/// Days past the end date; zero while the goal is still running.
pub fn days_overdue(goal: &Goal, now: DateTime<Utc>) -> i64 {
    (-days_remaining(goal, now)).max(0)
}

// =============================================================================
// Progress Update
// =============================================================================

/// What to persist after a person records a new current value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct GoalProgressUpdate {
    pub current_value: f64,
    pub status: GoalStatus,
}

/// Completed when the new value reaches the target, otherwise active.
///
/// Lateness is left to [`effective_status`] so it is never persisted.
pub fn progress_update(goal: &Goal, new_value: f64) -> GoalProgressUpdate {
    let current_value = if new_value.is_finite() {
        new_value.max(0.0)
    } else {
        0.0
    };

    let status = if current_value >= goal.target_value {
        GoalStatus::Completed
    } else {
        GoalStatus::Active
    };

    GoalProgressUpdate {
        current_value,
        status,
    }
}

// =============================================================================
// Views and Breakdowns
// =============================================================================

/// One goal as the dashboards list it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct GoalStatusView {
    pub id: String,
    pub title: String,
    pub kind: GoalKind,
    pub priority: Priority,
    pub target_value: f64,
    pub current_value: f64,
    pub progress_percent: f64,
    /// Display status: stored status with a past-due goal shown as `Late`.
    /// A goal stored as `Late` keeps it even before its end date.
    pub status: GoalStatus,
    /// Lateness predicate only: past the end date and not completed.
    /// Can be false while `status` reads `Late`.
    pub late: bool,
    pub days_remaining: i64,
    #[ts(as = "String")]
    pub end_date: DateTime<Utc>,
}

impl GoalStatusView {
    pub fn new(goal: &Goal, now: DateTime<Utc>) -> Self {
        GoalStatusView {
            id: goal.id.clone(),
            title: goal.title.clone(),
            kind: goal.kind,
            priority: goal.priority,
            target_value: goal.target_value,
            current_value: goal.current_value,
            progress_percent: progress_percent(goal),
            status: effective_status(goal, now),
            late: is_goal_late(goal, now),
            days_remaining: days_remaining(goal, now),
            end_date: goal.end_date,
        }
    }
}

/// Aggregate figures over a set of goals.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct GoalTotals {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
    pub late: usize,
    /// Completed over total, in percent.
    pub success_rate: f64,
    pub target_sum: f64,
    pub current_sum: f64,
    /// Current sum over target sum, in percent. Not clamped.
    pub overall_progress: f64,
}

impl GoalTotals {
    pub fn compute(goals: &[Goal], now: DateTime<Utc>) -> Self {
        let mut totals = GoalTotals {
            total: goals.len(),
            ..GoalTotals::default()
        };

        for goal in goals {
            match effective_status(goal, now) {
                GoalStatus::Completed => totals.completed += 1,
                GoalStatus::Active => totals.active += 1,
                GoalStatus::Late => totals.late += 1,
            }
            totals.target_sum += goal.target_value;
            totals.current_sum += goal.current_value;
        }

        totals.success_rate = ratio(totals.completed as f64, totals.total as f64) * 100.0;
        totals.overall_progress = ratio(totals.current_sum, totals.target_sum) * 100.0;
        totals
    }
}

/// Goals of one kind, by effective status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct KindBreakdown {
    pub kind: GoalKind,
    pub count: usize,
    pub completed: usize,
    pub active: usize,
    pub late: usize,
}

/// Goals of one priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PriorityBreakdown {
    pub priority: Priority,
    pub count: usize,
    pub completed: usize,
}

/// Per-kind counts in [`GoalKind::ALL`] order, empty kinds omitted.
pub fn breakdown_by_kind(goals: &[Goal], now: DateTime<Utc>) -> Vec<KindBreakdown> {
    GoalKind::ALL
        .iter()
        .map(|&kind| {
            let mut entry = KindBreakdown {
                kind,
                count: 0,
                completed: 0,
                active: 0,
                late: 0,
            };
            for goal in goals.iter().filter(|g| g.kind == kind) {
                entry.count += 1;
                match effective_status(goal, now) {
                    GoalStatus::Completed => entry.completed += 1,
                    GoalStatus::Active => entry.active += 1,
                    GoalStatus::Late => entry.late += 1,
                }
            }
            entry
        })
        .filter(|entry| entry.count > 0)
        .collect()
}

/// Per-priority counts, highest priority first, empty priorities omitted.
pub fn breakdown_by_priority(goals: &[Goal]) -> Vec<PriorityBreakdown> {
    Priority::DESCENDING
        .iter()
        .map(|&priority| {
            let matching = goals.iter().filter(|g| g.priority == priority);
            PriorityBreakdown {
                priority,
                count: matching.clone().count(),
                completed: matching
                    .filter(|g| g.status == GoalStatus::Completed)
                    .count(),
            }
        })
        .filter(|entry| entry.count > 0)
        .collect()
}

/// Late goals, latest end date first.
pub fn late_goals(goals: &[Goal], now: DateTime<Utc>) -> Vec<Goal> {
    let mut late: Vec<Goal> = goals
        .iter()
        .filter(|g| effective_status(g, now) == GoalStatus::Late)
        .cloned()
        .collect();
    late.sort_by(|a, b| b.end_date.cmp(&a.end_date));
    late
}

// =============================================================================
// Unit Tests
// =============================================================================
