//! Dashboard ordering, time buckets and counters.
//!
//! Open tasks are sorted (dated before undated, earlier dates first, ties
//! by descending effective urgency) and then partitioned relative to
//! `today`:
//!
//! | bucket     | due date                         |
//! |------------|----------------------------------|
//! | overdue    | before today                     |
//! | today      | today                            |
//! | tomorrow   | today + 1                        |
//! | this_week  | after tomorrow, up to today + 7  |
//! | this_month | after that, up to today + 1 month|
//! | later      | beyond, or no due date           |

use std::cmp::Ordering;

use chrono::{DateTime, Days, Months, NaiveDate, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::priority::Priority;
use crate::session::Session;
use crate::store::{self, Store};
use crate::task::{TaskRecord, TaskView};
use crate::urgency;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Overdue,
    Today,
    Tomorrow,
    ThisWeek,
    ThisMonth,
    Later,
}

impl Bucket {
    pub const ALL: [Bucket; 6] = [
        Bucket::Overdue,
        Bucket::Today,
        Bucket::Tomorrow,
        Bucket::ThisWeek,
        Bucket::ThisMonth,
        Bucket::Later,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Bucket::Overdue => "Overdue",
            Bucket::Today => "Today",
            Bucket::Tomorrow => "Tomorrow",
            Bucket::ThisWeek => "This week",
            Bucket::ThisMonth => "This month",
            Bucket::Later => "Later",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskBuckets {
    pub overdue: Vec<TaskView>,
    pub today: Vec<TaskView>,
    pub tomorrow: Vec<TaskView>,
    pub this_week: Vec<TaskView>,
    pub this_month: Vec<TaskView>,
    pub later: Vec<TaskView>,
}

impl TaskBuckets {
    pub fn get(&self, bucket: Bucket) -> &[TaskView] {
        match bucket {
            Bucket::Overdue => &self.overdue,
            Bucket::Today => &self.today,
            Bucket::Tomorrow => &self.tomorrow,
            Bucket::ThisWeek => &self.this_week,
            Bucket::ThisMonth => &self.this_month,
            Bucket::Later => &self.later,
        }
    }

    fn get_mut(&mut self, bucket: Bucket) -> &mut Vec<TaskView> {
        match bucket {
            Bucket::Overdue => &mut self.overdue,
            Bucket::Today => &mut self.today,
            Bucket::Tomorrow => &mut self.tomorrow,
            Bucket::ThisWeek => &mut self.this_week,
            Bucket::ThisMonth => &mut self.this_month,
            Bucket::Later => &mut self.later,
        }
    }

    pub fn len(&self) -> usize {
        Bucket::ALL.iter().map(|bucket| self.get(*bucket).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct DashboardStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    /// Open tasks stored as High or Urgent
    pub high_priority: usize,
    pub overdue: usize,
    pub due_today: usize,
    /// Tomorrow plus the rest of the week
    pub next_seven_days: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub today: NaiveDate,
    pub stats: DashboardStats,
    pub buckets: TaskBuckets,
}

/// Which bucket an open task with `due_date` falls in relative to `today`.
pub fn bucket_for(due_date: Option<NaiveDate>, today: NaiveDate) -> Bucket {
    let Some(due) = due_date else {
        return Bucket::Later;
    };
    let tomorrow = today.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX);
    let week_end = today.checked_add_days(Days::new(7)).unwrap_or(NaiveDate::MAX);
    // checked_add_months clamps to the last day of shorter months.
    let month_end = today.checked_add_months(Months::new(1)).unwrap_or(NaiveDate::MAX);

    if due < today {
        Bucket::Overdue
    } else if due == today {
        Bucket::Today
    } else if due == tomorrow {
        Bucket::Tomorrow
    } else if due <= week_end {
        Bucket::ThisWeek
    } else if due <= month_end {
        Bucket::ThisMonth
    } else {
        Bucket::Later
    }
}

/// Dashboard order: dated first, by date, then most urgent first.
pub fn dashboard_order(left: &TaskRecord, right: &TaskRecord, now: DateTime<Utc>) -> Ordering {
    let by_date = match (left.due_date, right.due_date) {
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (Some(l), Some(r)) => l.cmp(&r),
        (None, None) => Ordering::Equal,
    };
    by_date.then_with(|| {
        urgency::effective_level(right, now).cmp(&urgency::effective_level(left, now))
    })
}

pub fn sort_for_dashboard(tasks: &mut [TaskRecord], now: DateTime<Utc>) {
    tasks.sort_by(|left, right| dashboard_order(left, right, now));
}

/// Partition open tasks into buckets; done tasks are skipped.
///
/// `overdue` on each view follows the bucket, so it is measured against
/// `today` rather than the UTC date of `now`.
pub fn bucket_tasks(mut tasks: Vec<TaskRecord>, today: NaiveDate, now: DateTime<Utc>) -> TaskBuckets {
    sort_for_dashboard(&mut tasks, now);
    let mut buckets = TaskBuckets::default();
    for task in tasks.into_iter().filter(|task| !task.done) {
        let bucket = bucket_for(task.due_date, today);
        let mut view = TaskView::new(task, now);
        view.overdue = bucket == Bucket::Overdue;
        buckets.get_mut(bucket).push(view);
    }
    buckets
}

pub fn compute_stats(tasks: &[TaskRecord], buckets: &TaskBuckets) -> DashboardStats {
    let completed = tasks.iter().filter(|task| task.done).count();
    DashboardStats {
        total: tasks.len(),
        completed,
        pending: tasks.len() - completed,
        high_priority: tasks
            .iter()
            .filter(|task| !task.done && task.priority >= Priority::High)
            .count(),
        overdue: buckets.overdue.len(),
        due_today: buckets.today.len(),
        next_seven_days: buckets.tomorrow.len() + buckets.this_week.len(),
    }
}

pub fn build(tasks: Vec<TaskRecord>, today: NaiveDate, now: DateTime<Utc>) -> Dashboard {
    let all = tasks.clone();
    let buckets = bucket_tasks(tasks, today, now);
    let stats = compute_stats(&all, &buckets);
    Dashboard {
        today,
        stats,
        buckets,
    }
}

/// Dashboard over all of the caller's tasks.
pub fn dashboard(store: &Store, session: &Session, today: NaiveDate, now: DateTime<Utc>) -> Result<Dashboard> {
    let tasks = {
        let conn = store.conn()?;
        store::tasks::list_for_owner(&conn, session.user_id)?
    };
    Ok(build(tasks, today, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn task(id: i64, due: Option<NaiveDate>, priority: Priority, done: bool) -> TaskRecord {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().expect("ts");
        TaskRecord {
            id,
            owner_id: 1,
            project_id: None,
            title: format!("task {id}"),
            done,
            priority,
            due_date: due,
            is_public: false,
            created_at: created,
            updated_at: created,
        }
    }

    fn ids(views: &[TaskView]) -> Vec<i64> {
        views.iter().map(|view| view.task.id).collect()
    }

    #[test]
    fn bucket_boundaries() {
        let today = date(2024, 1, 15);
        assert_eq!(bucket_for(Some(date(2024, 1, 14)), today), Bucket::Overdue);
        assert_eq!(bucket_for(Some(today), today), Bucket::Today);
        assert_eq!(bucket_for(Some(date(2024, 1, 16)), today), Bucket::Tomorrow);
        assert_eq!(bucket_for(Some(date(2024, 1, 17)), today), Bucket::ThisWeek);
        assert_eq!(bucket_for(Some(date(2024, 1, 22)), today), Bucket::ThisWeek);
        assert_eq!(bucket_for(Some(date(2024, 1, 23)), today), Bucket::ThisMonth);
        assert_eq!(bucket_for(Some(date(2024, 2, 15)), today), Bucket::ThisMonth);
        assert_eq!(bucket_for(Some(date(2024, 2, 16)), today), Bucket::Later);
        assert_eq!(bucket_for(None, today), Bucket::Later);
    }

    #[test]
    fn month_end_clamps_for_short_months() {
        let today = date(2024, 1, 31);
        assert_eq!(bucket_for(Some(date(2024, 2, 29)), today), Bucket::ThisMonth);
        assert_eq!(bucket_for(Some(date(2024, 3, 1)), today), Bucket::Later);
    }

    #[test]
    fn sort_puts_dated_first_then_urgency() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).single().expect("ts");
        let mut tasks = vec![
            task(1, None, Priority::Low, false),
            task(2, Some(date(2024, 3, 1)), Priority::Low, false),
            task(3, Some(date(2024, 3, 1)), Priority::Urgent, false),
            task(4, Some(date(2024, 2, 1)), Priority::Medium, false),
            task(5, None, Priority::High, false),
        ];
        sort_for_dashboard(&mut tasks, now);
        assert_eq!(
            tasks.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![4, 3, 2, 5, 1]
        );
    }

    #[test]
    fn done_tasks_are_counted_but_never_bucketed() {
        let today = date(2024, 1, 15);
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).single().expect("ts");
        let tasks = vec![
            task(1, Some(date(2024, 1, 10)), Priority::High, false),
            task(2, Some(today), Priority::Medium, false),
            task(3, Some(today), Priority::Urgent, true),
            task(4, Some(date(2024, 1, 16)), Priority::Low, false),
            task(5, Some(date(2024, 1, 20)), Priority::Urgent, false),
            task(6, None, Priority::Low, false),
        ];
        let dashboard = build(tasks, today, now);

        assert_eq!(ids(&dashboard.buckets.overdue), vec![1]);
        assert_eq!(ids(&dashboard.buckets.today), vec![2]);
        assert_eq!(ids(&dashboard.buckets.tomorrow), vec![4]);
        assert_eq!(ids(&dashboard.buckets.this_week), vec![5]);
        assert!(dashboard.buckets.this_month.is_empty());
        assert_eq!(ids(&dashboard.buckets.later), vec![6]);
        assert_eq!(dashboard.buckets.len(), 5);

        assert_eq!(
            dashboard.stats,
            DashboardStats {
                total: 6,
                completed: 1,
                pending: 5,
                high_priority: 2,
                overdue: 1,
                due_today: 1,
                next_seven_days: 2,
            }
        );
    }

    #[test]
    fn overdue_flag_follows_the_local_day() {
        // Evening west of UTC: the UTC date has already moved on.
        let today = date(2024, 1, 15);
        let now = Utc.with_ymd_and_hms(2024, 1, 16, 3, 0, 0).single().expect("ts");
        let buckets = bucket_tasks(
            vec![
                task(1, Some(today), Priority::Medium, false),
                task(2, Some(date(2024, 1, 14)), Priority::Medium, false),
            ],
            today,
            now,
        );
        assert_eq!(ids(&buckets.today), vec![1]);
        assert!(!buckets.today[0].overdue);
        assert!(buckets.overdue[0].overdue);
    }
}
