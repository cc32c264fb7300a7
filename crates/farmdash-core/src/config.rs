//! # Engine Configuration
//!
//! Tunables recognized by the metrics engine. This is plain data: loading it
//! from files and the environment is the feed crate's job.
//!
//! ## Recognized Options
//! ```toml
//! flat_margin_rate = 0.30          # profit estimate when no catalog link
//! low_stock_threshold = 10         # stock strictly below this is "low"
//! default_period = "last7days"     # last7days | last30days | last90days | all
//! top_n = 5                        # products in the ranking
//! daily_series_window_days = 7     # days in the sales time series
//! timestamp_fallback = "now"       # now | reject
//! utc_offset_minutes = -180        # optional; day boundaries for bucketing
//! ```

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::aggregate::SeriesWindow;
use crate::error::{CoreError, CoreResult};
use crate::period::{Calendar, Period};
use crate::types::MarginRate;

// =============================================================================
// Timestamp Fallback Policy
// =============================================================================

/// What the normalizer does with a missing or unreadable timestamp.
///
/// ## Policies
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  NOW (default)                                                          │
/// │  • The record is stamped with the normalization instant                │
/// │  • The dashboard keeps rendering                                        │
/// │  • Known skew: an undated sale shows up as "today" in the series       │
/// │                                                                         │
/// │  REJECT                                                                 │
/// │  • Normalization fails with MalformedRecord                            │
/// │  • Use when time-series attribution matters more than availability     │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampFallback {
    #[default]
    Now,
    Reject,
}

impl fmt::Display for TimestampFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampFallback::Now => write!(f, "now"),
            TimestampFallback::Reject => write!(f, "reject"),
        }
    }
}

impl FromStr for TimestampFallback {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "now" => Ok(TimestampFallback::Now),
            "reject" | "strict" => Ok(TimestampFallback::Reject),
            other => Err(CoreError::InvalidConfig(format!(
                "Unknown timestamp fallback: '{}'. Valid options: now, reject",
                other
            ))),
        }
    }
}

// =============================================================================
// Engine Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Fraction of revenue counted as profit by the flat-margin strategy.
    #[serde(default = "default_flat_margin_rate")]
    pub flat_margin_rate: f64,

    /// Items with stock strictly below this count as low stock.
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i64,

    /// Period used when a request does not pick one.
    #[serde(default)]
    pub default_period: Period,

    /// Length of product rankings. Signed so that a negative value in a
    /// config file is reported instead of wrapping.
    #[serde(default = "default_top_n")]
    pub top_n: i64,

    /// Days in the sales time series.
    #[serde(default = "default_daily_window")]
    pub daily_series_window_days: i64,

    /// Missing-timestamp policy for the normalizer.
    #[serde(default)]
    pub timestamp_fallback: TimestampFallback,

    /// Offset whose calendar days bucket the series. `None` keeps the
    /// offset of the "now" the caller passes in.
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
}

fn default_flat_margin_rate() -> f64 {
    crate::DEFAULT_FLAT_MARGIN_BPS as f64 / 10_000.0
}

fn default_low_stock_threshold() -> i64 {
    crate::DEFAULT_LOW_STOCK_THRESHOLD
}

fn default_top_n() -> i64 {
    crate::DEFAULT_TOP_N as i64
}

fn default_daily_window() -> i64 {
    crate::DEFAULT_DAILY_WINDOW_DAYS as i64
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            flat_margin_rate: default_flat_margin_rate(),
            low_stock_threshold: default_low_stock_threshold(),
            default_period: Period::default(),
            top_n: default_top_n(),
            daily_series_window_days: default_daily_window(),
            timestamp_fallback: TimestampFallback::default(),
            utc_offset_minutes: None,
        }
    }
}

impl EngineConfig {
    /// Checks every option. Configuration defects are caller bugs and are
    /// surfaced, never coerced.
    pub fn validate(&self) -> CoreResult<()> {
        if !(0.0..=1.0).contains(&self.flat_margin_rate) {
            return Err(CoreError::InvalidConfig(format!(
                "flat_margin_rate must be between 0 and 1, got {}",
                self.flat_margin_rate
            )));
        }

        if self.top_n < 0 {
            return Err(CoreError::InvalidConfig(format!(
                "top_n must not be negative, got {}",
                self.top_n
            )));
        }

        if self.daily_series_window_days <= 0
            || self.daily_series_window_days > i64::from(crate::MAX_DAILY_WINDOW_DAYS)
        {
            return Err(CoreError::InvalidConfig(format!(
                "daily_series_window_days must be between 1 and {}, got {}",
                crate::MAX_DAILY_WINDOW_DAYS,
                self.daily_series_window_days
            )));
        }

        if self.low_stock_threshold < 0 {
            return Err(CoreError::InvalidConfig(format!(
                "low_stock_threshold must not be negative, got {}",
                self.low_stock_threshold
            )));
        }

        if let Some(minutes) = self.utc_offset_minutes {
            if self.utc_offset().is_none() {
                return Err(CoreError::InvalidConfig(format!(
                    "utc_offset_minutes out of range: {}",
                    minutes
                )));
            }
        }

        Ok(())
    }

    /// The flat margin as basis points.
    pub fn margin_rate(&self) -> MarginRate {
        MarginRate::from_fraction(self.flat_margin_rate)
    }

    /// Ranking length. Negative values are rejected by `validate`.
    pub fn top_n_limit(&self) -> usize {
        usize::try_from(self.top_n).unwrap_or(0)
    }

    /// The configured series window.
    pub fn series_window(&self) -> SeriesWindow {
        SeriesWindow::Days(u32::try_from(self.daily_series_window_days).unwrap_or(1).max(1))
    }

    /// The configured day-boundary offset, if any.
    pub fn utc_offset(&self) -> Option<FixedOffset> {
        self.utc_offset_minutes
            .and_then(|m| m.checked_mul(60))
            .and_then(FixedOffset::east_opt)
    }

    /// Builds the calendar for a report computed at `now`.
    pub fn calendar(&self, now: DateTime<FixedOffset>) -> Calendar {
        let calendar = Calendar::new(now);
        match self.utc_offset() {
            Some(offset) => calendar.with_offset(offset),
            None => calendar,
        }
    }

    /// Same as [`calendar`](Self::calendar) for a UTC instant.
    pub fn calendar_utc(&self, now: DateTime<Utc>) -> Calendar {
        self.calendar(now.fixed_offset())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.margin_rate().bps(), 3000);
        assert_eq!(config.low_stock_threshold, 10);
        assert_eq!(config.default_period, Period::Last7Days);
        assert_eq!(config.top_n_limit(), 5);
        assert_eq!(config.series_window(), SeriesWindow::Days(7));
        assert_eq!(config.timestamp_fallback, TimestampFallback::Now);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_caller_bugs() {
        let mut config = EngineConfig::default();
        config.top_n = -1;
        assert!(matches!(config.validate(), Err(CoreError::InvalidConfig(_))));

        let mut config = EngineConfig::default();
        config.daily_series_window_days = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.daily_series_window_days = i64::from(u32::MAX);
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.daily_series_window_days = i64::from(crate::MAX_DAILY_WINDOW_DAYS);
        assert!(config.validate().is_ok());

        let mut config = EngineConfig::default();
        config.flat_margin_rate = 1.5;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.utc_offset_minutes = Some(24 * 60);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"top_n": 3, "default_period": "last30days"}"#).unwrap();
        assert_eq!(config.top_n_limit(), 3);
        assert_eq!(config.default_period, Period::Last30Days);
        assert_eq!(config.low_stock_threshold, 10);
    }

    #[test]
    fn test_configured_offset_overrides_now() {
        let mut config = EngineConfig::default();
        config.utc_offset_minutes = Some(-180);
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 1, 0, 0).unwrap();
        let cal = config.calendar_utc(now);
        assert_eq!(cal.today().to_string(), "2026-10-18");
    }

    #[test]
    fn test_fallback_parsing() {
        assert_eq!("reject".parse::<TimestampFallback>().unwrap(), TimestampFallback::Reject);
        assert_eq!("NOW".parse::<TimestampFallback>().unwrap(), TimestampFallback::Now);
        assert!("later".parse::<TimestampFallback>().is_err());
    }
}
