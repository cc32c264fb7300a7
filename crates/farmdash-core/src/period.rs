//! # Period Filter
//!
//! Selects the records that fall inside a reporting window.
//!
//! ## Window Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  last7days at now = 2026-10-19 14:30                                    │
//! │                                                                         │
//! │  lower bound = now − 7 × 24h = 2026-10-12 14:30 (inclusive)            │
//! │                                                                         │
//! │  2026-10-12 14:29  ✗   (one minute too early)                          │
//! │  2026-10-12 14:30  ✓   (boundary is inclusive)                         │
//! │  2026-10-19 09:00  ✓                                                   │
//! │                                                                         │
//! │  Comparisons are on full instants, not calendar days.                  │
//! │  `all` has no lower bound and returns every record.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::{Goal, TransactionRecord};

// =============================================================================
// Calendar
// =============================================================================

/// "Now" plus the UTC offset whose calendar days the dashboards show.
///
/// Passed into every time-dependent operation so that the core never reads
/// the system clock and two calls with the same calendar agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    now: DateTime<Utc>,
    offset: FixedOffset,
}

impl Calendar {
    /// Uses the offset carried by `now`.
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Calendar {
            now: now.with_timezone(&Utc),
            offset: *now.offset(),
        }
    }

    /// A calendar whose days are UTC days.
    pub fn utc(now: DateTime<Utc>) -> Self {
        Calendar {
            now,
            offset: Utc.fix(),
        }
    }

    /// Same instant, different day boundaries.
    pub fn with_offset(self, offset: FixedOffset) -> Self {
        Calendar { offset, ..self }
    }

    #[inline]
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    #[inline]
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Today's date in the calendar's offset.
    pub fn today(&self) -> NaiveDate {
        self.date_of(self.now)
    }

    /// The local calendar date an instant falls on.
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    /// Midnight at the start of `date` in the calendar's offset.
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        let midnight = date.and_time(NaiveTime::MIN);
        match self.offset.from_local_datetime(&midnight).single() {
            Some(local) => local.with_timezone(&Utc),
            None => midnight.and_utc(),
        }
    }
}

// =============================================================================
// Period
// =============================================================================

/// Relative window for sales reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum Period {
    #[default]
    #[serde(rename = "last7days")]
    Last7Days,
    #[serde(rename = "last30days")]
    Last30Days,
    #[serde(rename = "last90days")]
    Last90Days,
    #[serde(rename = "all")]
    All,
}

impl Period {
    /// Length of the window in days, `None` for `All`.
    pub const fn window_days(&self) -> Option<i64> {
        match self {
            Period::Last7Days => Some(7),
            Period::Last30Days => Some(30),
            Period::Last90Days => Some(90),
            Period::All => None,
        }
    }

    /// Earliest instant still inside the window (inclusive).
    pub fn lower_bound(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.window_days().map(|days| now - Duration::days(days))
    }

    /// Whether an instant lies inside the window.
    pub fn contains(&self, instant: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self.lower_bound(now) {
            Some(bound) => instant >= bound,
            None => true,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Last7Days => write!(f, "last7days"),
            Period::Last30Days => write!(f, "last30days"),
            Period::Last90Days => write!(f, "last90days"),
            Period::All => write!(f, "all"),
        }
    }
}

impl FromStr for Period {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "last7days" | "7dias" => Ok(Period::Last7Days),
            "last30days" | "30dias" => Ok(Period::Last30Days),
            "last90days" | "90dias" => Ok(Period::Last90Days),
            "all" | "todos" => Ok(Period::All),
            _ => Err(CoreError::invalid_period(s)),
        }
    }
}

/// Keeps the transactions inside `period`, preserving input order.
pub fn filter_by_period(
    records: &[TransactionRecord],
    period: Period,
    now: DateTime<Utc>,
) -> Vec<TransactionRecord> {
    if period == Period::All {
        return records.to_vec();
    }

    records
        .iter()
        .filter(|r| period.contains(r.occurred_at, now))
        .cloned()
        .collect()
}

/// Parses a period code, then filters.
///
/// Unknown codes fail with `InvalidPeriod` rather than returning everything.
pub fn filter_by_period_code(
    records: &[TransactionRecord],
    code: &str,
    now: DateTime<Utc>,
) -> CoreResult<Vec<TransactionRecord>> {
    let period: Period = code.parse()?;
    Ok(filter_by_period(records, period, now))
}

// =============================================================================
// Goal Period
// =============================================================================

/// Calendar-anchored window for the goals report, applied to `created_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum GoalPeriod {
    Month,
    Quarter,
    Year,
    #[default]
    All,
}

impl GoalPeriod {
    /// First day of the current month/quarter/year, `None` for `All`.
    pub fn start_date(&self, today: NaiveDate) -> Option<NaiveDate> {
        let (year, month) = match self {
            GoalPeriod::Month => (today.year(), today.month()),
            GoalPeriod::Quarter => (today.year(), (today.month0() / 3) * 3 + 1),
            GoalPeriod::Year => (today.year(), 1),
            GoalPeriod::All => return None,
        };
        NaiveDate::from_ymd_opt(year, month, 1)
    }

    /// Keeps goals created on or after the start of the window.
    pub fn filter(&self, goals: &[Goal], calendar: &Calendar) -> Vec<Goal> {
        match self.start_date(calendar.today()) {
            Some(start) => {
                let bound = calendar.start_of_day(start);
                goals
                    .iter()
                    .filter(|g| g.created_at >= bound)
                    .cloned()
                    .collect()
            }
            None => goals.to_vec(),
        }
    }
}

impl FromStr for GoalPeriod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "month" | "mes" | "mês" => Ok(GoalPeriod::Month),
            "quarter" | "trimestre" => Ok(GoalPeriod::Quarter),
            "year" | "ano" => Ok(GoalPeriod::Year),
            "all" | "todos" => Ok(GoalPeriod::All),
            _ => Err(CoreError::invalid_period(s)),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
