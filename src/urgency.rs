//! Time-based priority escalation.
//!
//! A task's effective priority rises as its deadline approaches:
//! one level once half of the span between creation and due date has
//! elapsed, two levels at 90%. Tasks past their due date keep their
//! stored priority.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::priority::Priority;
use crate::task::TaskRecord;

const ONE_LEVEL_THRESHOLD: f64 = 0.5;
const TWO_LEVEL_THRESHOLD: f64 = 0.9;

/// Due dates are calendar days; the deadline is midnight UTC of that day.
pub fn due_instant(due: NaiveDate) -> DateTime<Utc> {
    due.and_time(NaiveTime::MIN).and_utc()
}

/// Effective priority of `task` at `now`.
pub fn effective_priority(task: &TaskRecord, now: DateTime<Utc>) -> Priority {
    escalate(task.priority, task.created_at, task.due_date, now)
}

/// Effective numeric level (1..=4) of `task` at `now`.
pub fn effective_level(task: &TaskRecord, now: DateTime<Utc>) -> u8 {
    effective_priority(task, now).level()
}

pub fn escalate(
    stored: Priority,
    created_at: DateTime<Utc>,
    due_date: Option<NaiveDate>,
    now: DateTime<Utc>,
) -> Priority {
    let Some(due) = due_date else {
        return stored;
    };

    let total_span = (due_instant(due) - created_at).num_milliseconds();
    let elapsed = (now - created_at).num_milliseconds();

    if elapsed > total_span {
        return stored;
    }

    // A zero (or negative) span can't be divided; treat it as fully elapsed.
    if total_span <= 0 {
        return stored.escalate(2);
    }

    let percent_elapsed = elapsed as f64 / total_span as f64;
    if percent_elapsed >= TWO_LEVEL_THRESHOLD {
        stored.escalate(2)
    } else if percent_elapsed >= ONE_LEVEL_THRESHOLD {
        stored.escalate(1)
    } else {
        stored
    }
}
