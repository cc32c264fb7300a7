//! Notification counts, filtering and age labels.
//!
//! Notifications are read-only input: marking one as read is the CRUD
//! layer's job.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::period::Calendar;
use crate::types::{Notification, NotificationKind, Priority};

pub fn unread_count(notifications: &[Notification]) -> usize {
    notifications.iter().filter(|n| !n.read).count()
}

pub fn read_count(notifications: &[Notification]) -> usize {
    notifications.iter().filter(|n| n.read).count()
}

pub fn high_priority_count(notifications: &[Notification]) -> usize {
    notifications
        .iter()
        .filter(|n| n.priority == Priority::High)
        .count()
}

/// Notifications of `kind` (any kind when `None`), newest first.
/// Read ones are dropped unless `include_read` is set.
pub fn filter_notifications(
    notifications: &[Notification],
    kind: Option<NotificationKind>,
    include_read: bool,
) -> Vec<Notification> {
    let mut filtered: Vec<Notification> = notifications
        .iter()
        .filter(|n| kind.map_or(true, |k| n.kind == k))
        .filter(|n| include_read || !n.read)
        .cloned()
        .collect();
    filtered.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    filtered
}

/// How long ago something happened, coarsened for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", tag = "unit", content = "value")]
#[ts(export)]
pub enum NotificationAge {
    /// Under a minute, or in the future.
    JustNow,
    Minutes(i64),
    Hours(i64),
    Days(i64),
    /// A week or older: shown as a calendar date.
    On {
        #[ts(as = "String")]
        date: NaiveDate,
    },
}

/// Buckets the age of `created_at` at `calendar.now()`.
pub fn relative_age(created_at: DateTime<Utc>, calendar: &Calendar) -> NotificationAge {
    let elapsed = calendar.now() - created_at;
    let minutes = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    if minutes < 1 {
        NotificationAge::JustNow
    } else if minutes < 60 {
        NotificationAge::Minutes(minutes)
    } else if hours < 24 {
        NotificationAge::Hours(hours)
    } else if days < 7 {
        NotificationAge::Days(days)
    } else {
        NotificationAge::On {
            date: calendar.date_of(created_at),
        }
    }
}

/// Header counts for the notifications tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NotificationSummary {
    pub unread: usize,
    pub read: usize,
    pub high_priority: usize,
}

impl NotificationSummary {
    pub fn compute(notifications: &[Notification]) -> Self {
        NotificationSummary {
            unread: unread_count(notifications),
            read: read_count(notifications),
            high_priority: high_priority_count(notifications),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    fn notification(id: &str, kind: NotificationKind, read: bool, age: Duration) -> Notification {
        Notification {
            id: id.into(),
            title: id.into(),
            message: String::new(),
            kind,
            priority: if id.starts_with('!') {
                Priority::High
            } else {
                Priority::Low
            },
            read,
            created_at: now() - age,
            read_at: None,
        }
    }

    fn sample() -> Vec<Notification> {
        vec![
            notification("a", NotificationKind::Stock, false, Duration::hours(3)),
            notification("!b", NotificationKind::Goal, true, Duration::minutes(5)),
            notification("c", NotificationKind::Stock, true, Duration::days(2)),
            notification("!d", NotificationKind::Stock, false, Duration::minutes(1)),
        ]
    }

    #[test]
    fn test_counts() {
        let summary = NotificationSummary::compute(&sample());
        assert_eq!(
            summary,
            NotificationSummary {
                unread: 2,
                read: 2,
                high_priority: 2
            }
        );
        assert_eq!(NotificationSummary::compute(&[]), NotificationSummary::default());
    }

    #[test]
    fn test_filter_by_kind_and_read_state() {
        let ids = |v: Vec<Notification>| v.into_iter().map(|n| n.id).collect::<Vec<_>>();

        assert_eq!(
            ids(filter_notifications(&sample(), Some(NotificationKind::Stock), false)),
            vec!["!d", "a"]
        );
        assert_eq!(
            ids(filter_notifications(&sample(), Some(NotificationKind::Stock), true)),
            vec!["!d", "a", "c"]
        );
        assert_eq!(filter_notifications(&sample(), None, true).len(), 4);
    }

    #[test]
    fn test_relative_age() {
        let cal = Calendar::utc(now());
        assert_eq!(relative_age(now() - Duration::seconds(30), &cal), NotificationAge::JustNow);
        assert_eq!(relative_age(now() + Duration::hours(1), &cal), NotificationAge::JustNow);
        assert_eq!(relative_age(now() - Duration::minutes(59), &cal), NotificationAge::Minutes(59));
        assert_eq!(relative_age(now() - Duration::minutes(61), &cal), NotificationAge::Hours(1));
        assert_eq!(relative_age(now() - Duration::hours(30), &cal), NotificationAge::Days(1));
        assert_eq!(
            relative_age(now() - Duration::days(7), &cal),
            NotificationAge::On {
                date: NaiveDate::from_ymd_opt(2026, 10, 12).unwrap()
            }
        );
    }
}
