//! # Domain Types
//!
//! Canonical record types produced by the normalizer and consumed by every
//! downstream component.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌───────────────────┐   ┌─────────────────┐   ┌─────────────────┐     │
//! │  │ TransactionRecord │   │   CatalogItem   │   │      Goal       │     │
//! │  │  ───────────────  │   │  ─────────────  │   │  ─────────────  │     │
//! │  │  product_id ──────┼──►│  id             │   │  target_value   │     │
//! │  │  product_name     │   │  category       │   │  current_value  │     │
//! │  │  total_price      │   │  cost / sale    │   │  end_date       │     │
//! │  │  occurred_at      │   │  stock_quantity │   │  status         │     │
//! │  └───────────────────┘   └─────────────────┘   └─────────────────┘     │
//! │         (may dangle)                                                    │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  Notification   │   │   DailyBucket   │   │   RollupEntry   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Records are immutable once produced. The engine never writes back to the
//! store: goal status and notification read state belong to the CRUD layer.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Margin Rate
// =============================================================================

/// Flat profit margin in basis points (3000 = 30%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MarginRate(u32);

impl MarginRate {
    /// Creates a margin rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        MarginRate(bps)
    }

    /// Creates a margin rate from a fraction (`0.30` → 3000 bps).
    ///
    /// Negative and non-finite fractions clamp to zero; range checks
    /// belong to config validation.
    pub fn from_fraction(fraction: f64) -> Self {
        if !fraction.is_finite() || fraction <= 0.0 {
            return MarginRate(0);
        }
        MarginRate((fraction * 10_000.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a fraction (for display and config files).
    #[inline]
    pub fn fraction(&self) -> f64 {
        self.0 as f64 / 10_000.0
    }
}

impl Default for MarginRate {
    fn default() -> Self {
        MarginRate::from_bps(crate::DEFAULT_FLAT_MARGIN_BPS)
    }
}

// =============================================================================
// Transaction Record
// =============================================================================

/// A single sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TransactionRecord {
    pub id: String,
    /// Catalog reference. May point at a deleted item.
    pub product_id: String,
    /// Product name frozen at the time of sale.
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    /// Never zero when `quantity × unit_price` is not.
    pub total_price: Money,
    #[ts(as = "String")]
    pub occurred_at: DateTime<Utc>,
}

impl TransactionRecord {
    /// Whether more units were sold than `item` has in stock.
    ///
    /// Such sales are flagged, never rejected: stock checks at sale time
    /// belong to the CRUD layer.
    #[inline]
    pub fn exceeds_stock(&self, item: &CatalogItem) -> bool {
        self.quantity > item.stock_quantity
    }
}

// =============================================================================
// Catalog Item
// =============================================================================

/// A product in the farm's catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    /// Free-text label typed by the user.
    pub category: String,
    pub cost_price: Money,
    pub sale_price: Money,
    pub stock_quantity: i64,
    /// Unit of sale ("kg", "un", "dz", ...).
    pub unit: String,
}

impl CatalogItem {
    /// Profit per unit sold. Valid even when `cost_price` is zero.
    #[inline]
    pub fn unit_profit(&self) -> Money {
        self.sale_price - self.cost_price
    }

    /// Margin over cost, in percent.
    ///
    /// `None` when the cost is zero: a margin over nothing is undefined and
    /// must not be shown as infinite or as 100%.
    pub fn margin_percent(&self) -> Option<f64> {
        if self.cost_price.is_zero() {
            return None;
        }
        Some(self.unit_profit().cents() as f64 / self.cost_price.cents() as f64 * 100.0)
    }

    /// Stock valued at sale price.
    #[inline]
    pub fn inventory_value(&self) -> Money {
        self.sale_price.multiply_quantity(self.stock_quantity)
    }

    /// Whether stock is strictly below the threshold.
    #[inline]
    pub fn is_low_stock(&self, threshold: i64) -> bool {
        self.stock_quantity < threshold
    }
}

// =============================================================================
// Goal
// =============================================================================

/// What a goal measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum GoalKind {
    #[default]
    Sales,
    Products,
    Profit,
    Customers,
}

impl GoalKind {
    /// All kinds in display order.
    pub const ALL: [GoalKind; 4] = [
        GoalKind::Sales,
        GoalKind::Products,
        GoalKind::Profit,
        GoalKind::Customers,
    ];

    /// Parses canonical and legacy labels.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "sales" | "vendas" => Some(GoalKind::Sales),
            "products" | "produtos" => Some(GoalKind::Products),
            "profit" | "lucro" => Some(GoalKind::Profit),
            "customers" | "clientes" => Some(GoalKind::Customers),
            _ => None,
        }
    }
}

/// Stored lifecycle state of a goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum GoalStatus {
    #[default]
    Active,
    Completed,
    Late,
}

impl GoalStatus {
    /// Parses canonical and legacy labels.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "active" | "ativa" => Some(GoalStatus::Active),
            "completed" | "concluida" | "concluída" => Some(GoalStatus::Completed),
            "late" | "atrasada" => Some(GoalStatus::Late),
            _ => None,
        }
    }
}

/// Priority shared by goals and notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Highest first, the order the reports list them in.
    pub const DESCENDING: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    /// Parses canonical and legacy labels.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "low" | "baixa" => Some(Priority::Low),
            "medium" | "media" | "média" => Some(Priority::Medium),
            "high" | "alta" => Some(Priority::High),
            _ => None,
        }
    }
}

/// A business goal with manually updated progress.
///
/// `current_value` is typed in by a person; it is never derived from sales.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Goal {
    pub id: String,
    pub title: String,
    pub description: String,
    pub kind: GoalKind,
    pub target_value: f64,
    pub current_value: f64,
    #[ts(as = "String")]
    pub start_date: DateTime<Utc>,
    #[ts(as = "String")]
    pub end_date: DateTime<Utc>,
    pub status: GoalStatus,
    pub priority: Priority,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Notification
// =============================================================================

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum NotificationKind {
    Goal,
    Sale,
    Stock,
    #[default]
    System,
}

impl NotificationKind {
    /// Parses canonical and legacy labels.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "goal" | "meta" => Some(NotificationKind::Goal),
            "sale" | "venda" => Some(NotificationKind::Sale),
            "stock" | "estoque" => Some(NotificationKind::Stock),
            "system" | "sistema" => Some(NotificationKind::System),
            _ => None,
        }
    }
}

/// A notification as stored. Read-only to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub priority: Priority,
    pub read: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub read_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Aggregation Outputs
// =============================================================================

/// One calendar day of a sales time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DailyBucket {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub value: Money,
}

/// A labelled sum (category value, product revenue, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RollupEntry {
    pub label: String,
    pub value: Money,
}

impl RollupEntry {
    pub fn new(label: impl Into<String>, value: Money) -> Self {
        RollupEntry {
            label: label.into(),
            value,
        }
    }
}

/// Units and revenue sold for one catalog reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductSales {
    pub product_id: String,
    pub label: String,
    pub quantity: i64,
    pub value: Money,
    /// At least one sale exceeded the catalog item's stock. Always false for
    /// dangling references.
    pub exceeds_stock: bool,
}

/// A labelled count (products per category).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CountEntry {
    pub label: String,
    pub count: usize,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn item(cost: i64, sale: i64, stock: i64) -> CatalogItem {
        CatalogItem {
            id: "p1".into(),
            name: "Alface".into(),
            category: "Verduras".into(),
            cost_price: Money::from_cents(cost),
            sale_price: Money::from_cents(sale),
            stock_quantity: stock,
            unit: "un".into(),
        }
    }

    #[test]
    fn test_margin_rate_from_fraction() {
        assert_eq!(MarginRate::from_fraction(0.30).bps(), 3000);
        assert_eq!(MarginRate::from_fraction(-1.0).bps(), 0);
        assert_eq!(MarginRate::from_fraction(f64::NAN).bps(), 0);
        assert!((MarginRate::from_bps(2500).fraction() - 0.25).abs() < 1e-9);
        assert_eq!(MarginRate::default().bps(), 3000);
    }

    #[test]
    fn test_margin_undefined_for_zero_cost() {
        let free = item(0, 1000, 1);
        assert_eq!(free.margin_percent(), None);
        assert_eq!(free.unit_profit().cents(), 1000);

        let normal = item(500, 1000, 1);
        assert_eq!(normal.margin_percent(), Some(100.0));
    }

    #[test]
    fn test_inventory_value_and_low_stock() {
        let it = item(100, 250, 4);
        assert_eq!(it.inventory_value().cents(), 1000);
        assert!(it.is_low_stock(10));
        assert!(!it.is_low_stock(4));
    }

    #[test]
    fn test_sale_exceeding_stock() {
        let stocked = item(100, 250, 2);
        let mut sale = TransactionRecord {
            id: "v1".into(),
            product_id: "p1".into(),
            product_name: "Alface".into(),
            quantity: 2,
            unit_price: Money::from_cents(250),
            total_price: Money::from_cents(500),
            occurred_at: DateTime::from_timestamp(1_760_875_200, 0).unwrap(),
        };
        assert!(!sale.exceeds_stock(&stocked));
        sale.quantity = 50;
        assert!(sale.exceeds_stock(&stocked));
    }

    #[test]
    fn test_label_parsing_accepts_legacy_names() {
        assert_eq!(GoalKind::from_label("lucro"), Some(GoalKind::Profit));
        assert_eq!(GoalKind::from_label("Customers"), Some(GoalKind::Customers));
        assert_eq!(GoalStatus::from_label("concluida"), Some(GoalStatus::Completed));
        assert_eq!(Priority::from_label("alta"), Some(Priority::High));
        assert_eq!(
            NotificationKind::from_label("estoque"),
            Some(NotificationKind::Stock)
        );
        assert_eq!(GoalKind::from_label("???"), None);
    }
}
