//! # farmdash-core: Metrics Engine for the Farm Dashboards
//!
//! Turns raw, denormalized store records into the analytics the sales,
//! inventory and goals dashboards render. Everything here is a pure function
//! of its inputs.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        FarmDash Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Dashboards (charts, summary cards, tables)             │   │
//! │  └─────────────────────────────▲───────────────────────────────────┘   │
//! │                                │ Arc<ReportSnapshot>                    │
//! │  ┌─────────────────────────────┴───────────────────────────────────┐   │
//! │  │           farmdash-feed (config, store, live feed)              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ full collection snapshots              │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ farmdash-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   normalize ──► period ──► aggregate ──► rank ──┐               │   │
//! │  │       │                                         ├──► report     │   │
//! │  │       └───────► metrics / goals / notifications ┘               │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO CLOCK • NO SHARED STATE • PURE FUNCTIONS         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`normalize`] - Raw store documents → canonical records
//! - [`period`] - Reporting windows and the report calendar
//! - [`aggregate`] - Daily series, category and product rollups
//! - [`rank`] - Top-N selection
//! - [`metrics`] - Sales totals, profit, stock
//! - [`goals`] - Goal progress, lateness, breakdowns
//! - [`notifications`] - Notification counts and age labels
//! - [`report`] - Per-dashboard snapshots
//! - [`money`] - Integer-cent money
//! - [`config`] - Engine tunables
//! - [`error`] - Error types
//!
//! ## Design Principles
//!
//! 1. **Snapshots In, Snapshots Out**: callers pass complete collections and
//!    "now"; nothing is cached or shared between calls
//! 2. **Lenient Data, Strict Callers**: dirty records are coerced, bad
//!    period codes and config values are errors
//! 3. **Integer Money**: all monetary values are cents (i64)
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use farmdash_core::config::EngineConfig;
//! use farmdash_core::period::Calendar;
//! use farmdash_core::report::{compose_report, ProfitStrategy, RecordSet, ReportRequest};
//!
//! let config = EngineConfig::default();
//! let calendar = Calendar::utc(Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap());
//! let request = ReportRequest::with_defaults(&config, ProfitStrategy::FlatMargin);
//!
//! let snapshot = compose_report(&RecordSet::default(), &request, &config, &calendar)?;
//! assert_eq!(snapshot.daily_series.len(), 7);
//! assert!(snapshot.top_products.is_empty());
//! # Ok::<(), farmdash_core::CoreError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod aggregate;
pub mod config;
pub mod error;
pub mod goals;
pub mod metrics;
pub mod money;
pub mod normalize;
pub mod notifications;
pub mod period;
pub mod rank;
pub mod report;
pub mod types;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use config::{EngineConfig, TimestampFallback};
pub use error::{CoreError, CoreResult};
pub use money::Money;
pub use normalize::{Normalizer, RawRecord};
pub use period::{Calendar, GoalPeriod, Period};
pub use report::{ProfitStrategy, RecordSet, ReportRequest, ReportSnapshot};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Share of revenue counted as profit when no catalog link is used (30%).
pub const DEFAULT_FLAT_MARGIN_BPS: u32 = 3000;

/// Stock strictly below this is "low".
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;

/// Length of product rankings.
pub const DEFAULT_TOP_N: usize = 5;

/// Days in the sales time series.
pub const DEFAULT_DAILY_WINDOW_DAYS: u32 = 7;

/// Longest daily series the engine builds (about ten years).
pub const MAX_DAILY_WINDOW_DAYS: u32 = 3660;
