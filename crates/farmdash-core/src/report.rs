//! # Report Composer
//!
//! Assembles one immutable snapshot per dashboard from the other modules.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   RecordSet (normalized, complete)        ReportRequest                │
//! │        │                                   (period, profit strategy)   │
//! │        ├──► filter_by_period ──► product_sales_rollup ──► top_n        │
//! │        │                    └──► SalesMetrics, profit                  │
//! │        ├──► daily_series (own window, all sales)                       │
//! │        ├──► category_rollup, low_stock_count                           │
//! │        ├──► GoalStatusView per goal                                    │
//! │        └──► NotificationSummary                                        │
//! │                                   │                                     │
//! │                                   ▼                                     │
//! │                            ReportSnapshot                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing is cached: every call recomputes from the record set it is given,
//! so two calls with the same inputs produce equal snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;
use ts_rs::TS;

use crate::aggregate::{
    category_counts, category_rollup, daily_series, product_sales_by_id, product_sales_rollup,
};
use crate::config::EngineConfig;
use crate::error::{CoreError, CoreResult};
use crate::goals::{
    breakdown_by_kind, breakdown_by_priority, late_goals, GoalStatusView, GoalTotals,
    KindBreakdown, PriorityBreakdown,
};
use crate::metrics::{
    inventory_value, low_stock_count, low_stock_items, profit_catalog_linked,
    profit_flat_margin, recent_transactions, sales_exceeding_stock, SalesMetrics,
};
use crate::money::Money;
use crate::notifications::NotificationSummary;
use crate::period::{filter_by_period, Calendar, GoalPeriod, Period};
use crate::rank::{top_by_quantity, top_goals_by_progress, top_n};
use crate::types::{
    CatalogItem, CountEntry, DailyBucket, Goal, GoalKind, Notification, ProductSales,
    RollupEntry, TransactionRecord,
};

/// Newest sales listed on the sales dashboard.
pub const SALES_RECENT_LIMIT: usize = 10;
/// Newest sales listed on the inventory dashboard.
pub const INVENTORY_RECENT_LIMIT: usize = 5;
/// Goals listed in the goal report's ranking.
pub const GOAL_RANKING_LIMIT: usize = 5;

// =============================================================================
// Inputs
// =============================================================================

/// A complete, normalized snapshot of every collection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordSet {
    pub sales: Vec<TransactionRecord>,
    pub catalog: Vec<CatalogItem>,
    pub goals: Vec<Goal>,
    pub notifications: Vec<Notification>,
}

/// How profit is computed. Always chosen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ProfitStrategy {
    /// `(sale − cost) × quantity` from the catalog.
    CatalogLinked,
    /// A configured share of revenue.
    FlatMargin,
}

impl fmt::Display for ProfitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfitStrategy::CatalogLinked => write!(f, "catalog_linked"),
            ProfitStrategy::FlatMargin => write!(f, "flat_margin"),
        }
    }
}

impl FromStr for ProfitStrategy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "catalog_linked" | "catalog" => Ok(ProfitStrategy::CatalogLinked),
            "flat_margin" | "flat" => Ok(ProfitStrategy::FlatMargin),
            other => Err(CoreError::InvalidConfig(format!(
                "Unknown profit strategy: '{}'. Valid options: catalog_linked, flat_margin",
                other
            ))),
        }
    }
}

/// What the sales dashboard asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReportRequest {
    pub period: Period,
    pub profit_strategy: ProfitStrategy,
}

impl ReportRequest {
    pub fn new(period: Period, profit_strategy: ProfitStrategy) -> Self {
        ReportRequest {
            period,
            profit_strategy,
        }
    }

    /// The configured default period with the given strategy.
    pub fn with_defaults(config: &EngineConfig, profit_strategy: ProfitStrategy) -> Self {
        ReportRequest::new(config.default_period, profit_strategy)
    }
}

// =============================================================================
// Sales Dashboard
// =============================================================================

/// Everything the sales dashboard renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReportSnapshot {
    pub period: Period,
    pub profit_strategy: ProfitStrategy,
    #[ts(as = "String")]
    pub generated_at: DateTime<Utc>,
    pub daily_series: Vec<DailyBucket>,
    pub category_rollup: Vec<RollupEntry>,
    pub top_products: Vec<RollupEntry>,
    pub metrics: SalesMetrics,
    pub profit: Money,
    pub low_stock_count: usize,
    pub goals: Vec<GoalStatusView>,
    pub recent_sales: Vec<TransactionRecord>,
    pub notifications: NotificationSummary,
}

/// Composes the sales dashboard.
///
/// The period bounds the metrics and the product ranking. The daily series
/// has its own window from the config. Fails with `InvalidConfig` when
/// `config` does not validate.
pub fn compose_report(
    records: &RecordSet,
    request: &ReportRequest,
    config: &EngineConfig,
    calendar: &Calendar,
) -> CoreResult<ReportSnapshot> {
    config.validate()?;

    let now = calendar.now();
    let in_period = filter_by_period(&records.sales, request.period, now);

    let profit = match request.profit_strategy {
        ProfitStrategy::CatalogLinked => profit_catalog_linked(&in_period, &records.catalog),
        ProfitStrategy::FlatMargin => profit_flat_margin(&in_period, config.margin_rate()),
    };

    debug!(
        period = %request.period,
        sales = in_period.len(),
        catalog = records.catalog.len(),
        goals = records.goals.len(),
        "Composing sales report"
    );

    Ok(ReportSnapshot {
        period: request.period,
        profit_strategy: request.profit_strategy,
        generated_at: now,
        daily_series: daily_series(&records.sales, config.series_window(), calendar),
        category_rollup: category_rollup(&records.catalog),
        top_products: top_n(&product_sales_rollup(&in_period), config.top_n_limit()),
        metrics: SalesMetrics::compute(&in_period),
        profit,
        low_stock_count: low_stock_count(&records.catalog, config.low_stock_threshold),
        goals: records
            .goals
            .iter()
            .map(|g| GoalStatusView::new(g, now))
            .collect(),
        recent_sales: recent_transactions(&in_period, SALES_RECENT_LIMIT),
        notifications: NotificationSummary::compute(&records.notifications),
    })
}

// =============================================================================
// Inventory Dashboard
// =============================================================================

/// Everything the inventory dashboard renders. Covers all sales.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InventoryReport {
    #[ts(as = "String")]
    pub generated_at: DateTime<Utc>,
    pub product_count: usize,
    pub total_sales_count: usize,
    pub total_sales_value: Money,
    /// Always catalog-linked: this dashboard has the catalog at hand.
    pub profit: Money,
    pub inventory_value: Money,
    pub low_stock_count: usize,
    pub low_stock_items: Vec<CatalogItem>,
    /// Sales that sold more units than the item holds. Flagged only.
    pub sales_exceeding_stock: Vec<TransactionRecord>,
    pub category_counts: Vec<CountEntry>,
    pub category_rollup: Vec<RollupEntry>,
    pub top_products: Vec<ProductSales>,
    pub recent_sales: Vec<TransactionRecord>,
}

/// Composes the inventory dashboard. Fails when `config` does not validate.
pub fn compose_inventory_report(
    records: &RecordSet,
    config: &EngineConfig,
    calendar: &Calendar,
) -> CoreResult<InventoryReport> {
    config.validate()?;

    let metrics = SalesMetrics::compute(&records.sales);
    let by_product = product_sales_by_id(&records.sales, &records.catalog);

    Ok(InventoryReport {
        generated_at: calendar.now(),
        product_count: records.catalog.len(),
        total_sales_count: metrics.total_sales_count,
        total_sales_value: metrics.total_sales_value,
        profit: profit_catalog_linked(&records.sales, &records.catalog),
        inventory_value: inventory_value(&records.catalog),
        low_stock_count: low_stock_count(&records.catalog, config.low_stock_threshold),
        low_stock_items: low_stock_items(&records.catalog, config.low_stock_threshold),
        sales_exceeding_stock: sales_exceeding_stock(&records.sales, &records.catalog),
        category_counts: category_counts(&records.catalog),
        category_rollup: category_rollup(&records.catalog),
        top_products: top_by_quantity(&by_product, config.top_n_limit()),
        recent_sales: recent_transactions(&records.sales, INVENTORY_RECENT_LIMIT),
    })
}

// =============================================================================
// Goal Report
// =============================================================================

/// Which goals the report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct GoalFilter {
    pub period: GoalPeriod,
    /// `None` covers every kind.
    pub kind: Option<GoalKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct GoalReport {
    #[ts(as = "String")]
    pub generated_at: DateTime<Utc>,
    pub filter: GoalFilter,
    pub totals: GoalTotals,
    pub by_kind: Vec<KindBreakdown>,
    pub by_priority: Vec<PriorityBreakdown>,
    pub top_goals: Vec<GoalStatusView>,
    pub late_goals: Vec<GoalStatusView>,
}

pub fn compose_goal_report(goals: &[Goal], filter: &GoalFilter, calendar: &Calendar) -> GoalReport {
    let now = calendar.now();
    let selected: Vec<Goal> = filter
        .period
        .filter(goals, calendar)
        .into_iter()
        .filter(|g| filter.kind.map_or(true, |k| g.kind == k))
        .collect();

    let views = |list: Vec<Goal>| -> Vec<GoalStatusView> {
        list.iter().map(|g| GoalStatusView::new(g, now)).collect()
    };

    GoalReport {
        generated_at: now,
        filter: *filter,
        totals: GoalTotals::compute(&selected, now),
        by_kind: breakdown_by_kind(&selected, now),
        by_priority: breakdown_by_priority(&selected),
        top_goals: views(top_goals_by_progress(&selected, GOAL_RANKING_LIMIT)),
        late_goals: views(late_goals(&selected, now)),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
