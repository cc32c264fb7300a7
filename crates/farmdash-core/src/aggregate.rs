//! # Aggregator
//!
//! Groups normalized records and reduces them to sums and counts.
//!
//! ## Aggregation Modes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DAILY SERIES          transactions → [DailyBucket; window]             │
//! │    key   = local calendar date of occurred_at                          │
//! │    value = Σ total_price                                               │
//! │    order = ascending date, zero-filled, always ends today              │
//! │                                                                         │
//! │  CATEGORY ROLLUP       catalog → [RollupEntry]                          │
//! │    key   = category                                                    │
//! │    value = Σ sale_price × stock_quantity   (inventory value!)          │
//! │    order = value descending, ties in first-encounter order             │
//! │                                                                         │
//! │  PRODUCT ROLLUP        transactions → [RollupEntry]                     │
//! │    key   = product_name  (tolerates deleted catalog items)             │
//! │    value = Σ total_price                                               │
//! │    order = first encounter; the Ranker sorts                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every mode returns a well-formed (possibly empty or zero-filled) vector
//! for empty input. Results never depend on the order of the input records
//! except where first-encounter order is the documented tie-break.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use ts_rs::TS;

use crate::money::Money;
use crate::period::Calendar;
use crate::types::{CatalogItem, CountEntry, DailyBucket, ProductSales, RollupEntry, TransactionRecord};

/// Label used when a sale neither resolves to a catalog item nor carries a
/// product name of its own.
pub const UNKNOWN_PRODUCT_LABEL: &str = "Produto não encontrado";

// =============================================================================
// Series Window
// =============================================================================

/// How many days a daily series spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", tag = "type", content = "days")]
#[ts(export)]
pub enum SeriesWindow {
    /// The last `n` calendar days, today included.
    Days(u32),
    /// From the earliest transaction's day through today.
    ObservedRange,
}

impl Default for SeriesWindow {
    fn default() -> Self {
        SeriesWindow::Days(crate::DEFAULT_DAILY_WINDOW_DAYS)
    }
}

impl SeriesWindow {
    /// First day of the series. The last day is always `calendar.today()`.
    ///
    /// The span is capped at [`MAX_DAILY_WINDOW_DAYS`](crate::MAX_DAILY_WINDOW_DAYS)
    /// days for both variants.
    fn first_day(&self, records: &[TransactionRecord], calendar: &Calendar) -> NaiveDate {
        let today = calendar.today();
        let max_span = i64::from(crate::MAX_DAILY_WINDOW_DAYS) - 1;
        let earliest_allowed = today
            .checked_sub_signed(Duration::days(max_span))
            .unwrap_or(NaiveDate::MIN);

        match self {
            SeriesWindow::Days(n) => {
                let span = (i64::from((*n).max(1)) - 1).min(max_span);
                today
                    .checked_sub_signed(Duration::days(span))
                    .unwrap_or(earliest_allowed)
            }
            SeriesWindow::ObservedRange => records
                .iter()
                .map(|r| calendar.date_of(r.occurred_at))
                .min()
                .map_or(today, |earliest| earliest.clamp(earliest_allowed, today)),
        }
    }
}

// =============================================================================
// Daily Series
// =============================================================================

/// Sums `total_price` per local calendar day over the window.
///
/// Records outside the window (older, or dated in the future) are left out
/// so the series length depends on the window alone.
pub fn daily_series(
    records: &[TransactionRecord],
    window: SeriesWindow,
    calendar: &Calendar,
) -> Vec<DailyBucket> {
    let first = window.first_day(records, calendar);
    let today = calendar.today();

    let mut sums: HashMap<NaiveDate, Money> = HashMap::new();
    for record in records {
        let day = calendar.date_of(record.occurred_at);
        if day >= first && day <= today {
            *sums.entry(day).or_default() += record.total_price;
        }
    }

    first
        .iter_days()
        .take_while(|day| *day <= today)
        .map(|date| DailyBucket {
            date,
            value: sums.get(&date).copied().unwrap_or_default(),
        })
        .collect()
}

// =============================================================================
// Grouping Helper
// =============================================================================

/// Insertion-ordered grouping: output follows the first appearance of each
/// key, regardless of how often the key repeats later.
struct Grouped<V> {
    index: HashMap<String, usize>,
    entries: Vec<(String, V)>,
}

impl<V: Default> Grouped<V> {
    fn new() -> Self {
        Grouped {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    fn slot(&mut self, key: &str) -> &mut V {
        let position = match self.index.get(key) {
            Some(&i) => i,
            None => {
                self.entries.push((key.to_string(), V::default()));
                self.index.insert(key.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        &mut self.entries[position].1
    }

    fn into_entries(self) -> Vec<(String, V)> {
        self.entries
    }
}

// =============================================================================
// Rollups
// =============================================================================

/// Inventory value (`sale_price × stock_quantity`) per category, largest
/// first.
pub fn category_rollup(catalog: &[CatalogItem]) -> Vec<RollupEntry> {
    let mut groups: Grouped<Money> = Grouped::new();
    for item in catalog {
        *groups.slot(&item.category) += item.inventory_value();
    }

    let mut entries: Vec<RollupEntry> = groups
        .into_entries()
        .into_iter()
        .map(|(label, value)| RollupEntry::new(label, value))
        .collect();
    // sort_by is stable: equal values keep first-encounter order
    entries.sort_by(|a, b| b.value.cmp(&a.value));
    entries
}

/// Number of catalog items per category, first-encounter order.
pub fn category_counts(catalog: &[CatalogItem]) -> Vec<CountEntry> {
    let mut groups: Grouped<usize> = Grouped::new();
    for item in catalog {
        *groups.slot(&item.category) += 1;
    }

    groups
        .into_entries()
        .into_iter()
        .map(|(label, count)| CountEntry { label, count })
        .collect()
}

/// Revenue per product name, first-encounter order.
pub fn product_sales_rollup(records: &[TransactionRecord]) -> Vec<RollupEntry> {
    let mut groups: Grouped<Money> = Grouped::new();
    for record in records {
        *groups.slot(&record.product_name) += record.total_price;
    }

    groups
        .into_entries()
        .into_iter()
        .map(|(label, value)| RollupEntry::new(label, value))
        .collect()
}

/// Units and revenue per catalog reference, first-encounter order.
///
/// Labels come from the catalog when the reference resolves; dangling
/// references fall back to the name frozen on the first sale. A group is
/// flagged when any of its sales exceeded the item's current stock.
pub fn product_sales_by_id(
    records: &[TransactionRecord],
    catalog: &[CatalogItem],
) -> Vec<ProductSales> {
    let items: HashMap<&str, &CatalogItem> = catalog
        .iter()
        .map(|item| (item.id.as_str(), item))
        .collect();

    let mut groups: Grouped<(i64, Money, String, bool)> = Grouped::new();
    for record in records {
        let item = items.get(record.product_id.as_str());
        let (quantity, value, fallback, exceeds_stock) = groups.slot(&record.product_id);
        *quantity = quantity.saturating_add(record.quantity);
        *value += record.total_price;
        if fallback.is_empty() {
            fallback.clone_from(&record.product_name);
        }
        if item.is_some_and(|item| record.exceeds_stock(item)) {
            *exceeds_stock = true;
        }
    }

    groups
        .into_entries()
        .into_iter()
        .map(|(product_id, (quantity, value, fallback, exceeds_stock))| {
            let label = match items.get(product_id.as_str()) {
                Some(item) => item.name.clone(),
                None if !fallback.is_empty() => fallback,
                None => UNKNOWN_PRODUCT_LABEL.to_string(),
            };
            ProductSales {
                product_id,
                label,
                quantity,
                value,
                exceeds_stock,
            }
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
