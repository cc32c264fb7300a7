//! # Metrics Calculator
//!
//! Scalar business metrics over normalized sales and catalog snapshots.
//!
//! ## Profit Strategies
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CATALOG-LINKED                    FLAT MARGIN                         │
//! │  ──────────────                    ───────────                         │
//! │  Σ (sale − cost) × quantity        Σ total_price × rate                │
//! │  per sale, by product_id           rate from config (default 30%)      │
//! │  dangling product_id → 0           needs no catalog                    │
//! │                                                                         │
//! │  Same data, different numbers. Callers pick one explicitly; nothing   │
//! │  here chooses for them.                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use ts_rs::TS;

use crate::money::Money;
use crate::types::{CatalogItem, MarginRate, TransactionRecord};

// =============================================================================
// Sales Metrics
// =============================================================================

/// Count, revenue, units and average ticket over a set of sales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SalesMetrics {
    pub total_sales_count: usize,
    pub total_sales_value: Money,
    pub units_sold: i64,
    /// Zero when there are no sales.
    pub average_ticket: Money,
}

impl SalesMetrics {
    pub fn compute(records: &[TransactionRecord]) -> Self {
        let total_sales_value: Money = records.iter().map(|r| r.total_price).sum();
        let total_sales_count = records.len();

        SalesMetrics {
            total_sales_count,
            total_sales_value,
            units_sold: units_sold(records),
            average_ticket: total_sales_value.divide_evenly(total_sales_count as u64),
        }
    }
}

pub fn total_sales_count(records: &[TransactionRecord]) -> usize {
    records.len()
}

pub fn total_sales_value(records: &[TransactionRecord]) -> Money {
    records.iter().map(|r| r.total_price).sum()
}

/// Saturates at `i64::MAX` like money sums.
pub fn units_sold(records: &[TransactionRecord]) -> i64 {
    records
        .iter()
        .fold(0_i64, |acc, r| acc.saturating_add(r.quantity))
}

pub fn average_ticket(records: &[TransactionRecord]) -> Money {
    total_sales_value(records).divide_evenly(records.len() as u64)
}

// =============================================================================
// Profit
// =============================================================================

/// Profit from catalog cost data: `(sale_price − cost_price) × quantity`
/// per sale. Sales whose product no longer exists contribute nothing.
///
/// A zero cost price is valid here; it is only the margin percentage that
/// is undefined for it.
pub fn profit_catalog_linked(records: &[TransactionRecord], catalog: &[CatalogItem]) -> Money {
    let by_id: HashMap<&str, &CatalogItem> =
        catalog.iter().map(|item| (item.id.as_str(), item)).collect();

    records
        .iter()
        .filter_map(|r| {
            by_id
                .get(r.product_id.as_str())
                .map(|item| item.unit_profit().multiply_quantity(r.quantity))
        })
        .sum()
}

/// Profit estimated as a fixed share of revenue.
///
/// The rate is applied once to the summed revenue so the result is rounded
/// a single time.
pub fn profit_flat_margin(records: &[TransactionRecord], rate: MarginRate) -> Money {
    total_sales_value(records).apply_rate(rate)
}

/// Margin over cost in percent; `None` when the cost price is zero.
pub fn margin_percent(item: &CatalogItem) -> Option<f64> {
    item.margin_percent()
}

// =============================================================================
// Stock
// =============================================================================

/// Items with stock strictly below `threshold`.
pub fn low_stock_count(catalog: &[CatalogItem], threshold: i64) -> usize {
    catalog.iter().filter(|i| i.is_low_stock(threshold)).count()
}

/// The low-stock items themselves, catalog order.
pub fn low_stock_items(catalog: &[CatalogItem], threshold: i64) -> Vec<CatalogItem> {
    catalog
        .iter()
        .filter(|i| i.is_low_stock(threshold))
        .cloned()
        .collect()
}

/// Sales that sold more units than their catalog item holds, input order.
/// Dangling references are never flagged.
pub fn sales_exceeding_stock(
    records: &[TransactionRecord],
    catalog: &[CatalogItem],
) -> Vec<TransactionRecord> {
    let by_id: HashMap<&str, &CatalogItem> =
        catalog.iter().map(|item| (item.id.as_str(), item)).collect();

    records
        .iter()
        .filter(|r| {
            by_id
                .get(r.product_id.as_str())
                .is_some_and(|item| r.exceeds_stock(item))
        })
        .cloned()
        .collect()
}

/// Whole catalog valued at sale price.
pub fn inventory_value(catalog: &[CatalogItem]) -> Money {
    catalog.iter().map(CatalogItem::inventory_value).sum()
}

// =============================================================================
// Recent Activity
// =============================================================================

/// The `n` newest sales. Same-instant sales keep input order.
pub fn recent_transactions(records: &[TransactionRecord], n: usize) -> Vec<TransactionRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
    sorted.truncate(n);
    sorted
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimestampFallback;
    use crate::normalize::{Normalizer, RawRecord};
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    fn sale(product_id: &str, qty: i64, total_cents: i64) -> TransactionRecord {
        TransactionRecord {
            id: format!("s-{product_id}-{total_cents}"),
            product_id: product_id.into(),
            product_name: product_id.to_uppercase(),
            quantity: qty,
            unit_price: Money::from_cents(total_cents / qty.max(1)),
            total_price: Money::from_cents(total_cents),
            occurred_at: Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap(),
        }
    }

    fn item(id: &str, cost: i64, sale: i64, stock: i64) -> CatalogItem {
        CatalogItem {
            id: id.into(),
            name: id.into(),
            category: "Geral".into(),
            cost_price: Money::from_cents(cost),
            sale_price: Money::from_cents(sale),
            stock_quantity: stock,
            unit: "un".into(),
        }
    }

    #[test]
    fn test_empty_metrics_are_zero() {
        let metrics = SalesMetrics::compute(&[]);
        assert_eq!(metrics, SalesMetrics::default());
        assert_eq!(average_ticket(&[]), Money::zero());
    }

    #[test]
    fn test_sales_metrics() {
        let records = vec![sale("a", 2, 1000), sale("b", 1, 500), sale("a", 3, 1)];
        let metrics = SalesMetrics::compute(&records);
        assert_eq!(metrics.total_sales_count, 3);
        assert_eq!(metrics.total_sales_value.cents(), 1501);
        assert_eq!(metrics.units_sold, 6);
        // 1501 / 3 = 500.33 → 500
        assert_eq!(metrics.average_ticket.cents(), 500);
        assert_eq!(total_sales_count(&records), 3);
        assert_eq!(units_sold(&records), 6);
    }

    #[test]
    fn test_huge_totals_saturate() {
        let normalizer = Normalizer::new(
            Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap(),
            TimestampFallback::Now,
        );
        let raw = RawRecord::new(
            "v",
            json!({"totalPrice": "90000000000000000", "quantity": i64::MAX}),
        );
        let sale = normalizer.transaction(&raw).unwrap();
        let metrics = SalesMetrics::compute(&[sale.clone(), sale]);
        assert_eq!(metrics.total_sales_value.cents(), i64::MAX);
        assert_eq!(metrics.units_sold, i64::MAX);
        assert_eq!(metrics.total_sales_count, 2);
    }

    #[test]
    fn test_catalog_profit_with_zero_cost() {
        let catalog = vec![item("p1", 0, 1000, 3)];
        let profit = profit_catalog_linked(&[sale("p1", 1, 1000)], &catalog);
        assert_eq!(profit.cents(), 1000);
        assert_eq!(margin_percent(&catalog[0]), None);
    }

    #[test]
    fn test_catalog_profit_ignores_dangling_sales() {
        let catalog = vec![item("p1", 400, 1000, 3)];
        let records = vec![sale("p1", 2, 2000), sale("gone", 5, 5000)];
        assert_eq!(profit_catalog_linked(&records, &catalog).cents(), 1200);
    }

    #[test]
    fn test_strategies_disagree_on_same_data() {
        let catalog = vec![item("p1", 400, 1000, 3)];
        let records = vec![sale("p1", 2, 2000)];
        let linked = profit_catalog_linked(&records, &catalog);
        let flat = profit_flat_margin(&records, MarginRate::from_bps(3000));
        assert_eq!(linked.cents(), 1200);
        assert_eq!(flat.cents(), 600);
    }

    #[test]
    fn test_low_stock_and_inventory() {
        let catalog = vec![item("a", 0, 100, 9), item("b", 0, 100, 10), item("c", 0, 50, 0)];
        assert_eq!(low_stock_count(&catalog, 10), 2);
        let ids: Vec<_> = low_stock_items(&catalog, 10).into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(inventory_value(&catalog).cents(), 1900);
    }

    #[test]
    fn test_sales_exceeding_stock() {
        let catalog = vec![item("p1", 0, 100, 2)];
        let records = vec![sale("p1", 2, 200), sale("p1", 50, 5000), sale("gone", 80, 800)];
        let flagged = sales_exceeding_stock(&records, &catalog);
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].quantity, 50);
        // still counted everywhere else
        assert_eq!(SalesMetrics::compute(&records).units_sold, 132);
    }

    #[test]
    fn test_recent_transactions_newest_first() {
        let base = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let records: Vec<_> = (0..4)
            .map(|i| {
                let mut s = sale(&format!("p{i}"), 1, 100);
                s.occurred_at = base + Duration::hours(i);
                s
            })
            .collect();
        let recent = recent_transactions(&records, 2);
        assert_eq!(recent[0].product_id, "p3");
        assert_eq!(recent[1].product_id, "p2");
        assert_eq!(recent_transactions(&records, 10).len(), 4);
    }
}
