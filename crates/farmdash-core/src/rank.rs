//! # Ranker
//!
//! Top-N selection over aggregated groups.
//!
//! All functions copy what they return and leave the input untouched. Sorts
//! are stable, so equal values keep the order the groups were produced in
//! (first-encounter order of the grouping key). That also makes ranking
//! idempotent: ranking an already-ranked list returns it unchanged.

use std::cmp::Ordering;

use crate::goals::progress_ratio;
use crate::money::Money;
use crate::types::{Goal, ProductSales, RollupEntry};

/// Something with a single metric to rank by.
pub trait Ranked {
    fn rank_value(&self) -> Money;
}

impl Ranked for RollupEntry {
    fn rank_value(&self) -> Money {
        self.value
    }
}

impl Ranked for ProductSales {
    fn rank_value(&self) -> Money {
        self.value
    }
}

/// The `n` groups with the largest value, descending.
///
/// Fewer than `n` groups are all returned.
pub fn top_n<T: Ranked + Clone>(groups: &[T], n: usize) -> Vec<T> {
    top_by(groups, n, |a, b| b.rank_value().cmp(&a.rank_value()))
}

/// The `n` products with the most units sold, descending.
pub fn top_by_quantity(sales: &[ProductSales], n: usize) -> Vec<ProductSales> {
    top_by(sales, n, |a, b| b.quantity.cmp(&a.quantity))
}

/// The `n` goals closest to (or furthest past) their target.
pub fn top_goals_by_progress(goals: &[Goal], n: usize) -> Vec<Goal> {
    top_by(goals, n, |a, b| {
        progress_ratio(b)
            .partial_cmp(&progress_ratio(a))
            .unwrap_or(Ordering::Equal)
    })
}

fn top_by<T: Clone>(items: &[T], n: usize, compare: impl FnMut(&T, &T) -> Ordering) -> Vec<T> {
    let mut ranked = items.to_vec();
    ranked.sort_by(compare);
    ranked.truncate(n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(label: &str, cents: i64) -> RollupEntry {
        RollupEntry::new(label, Money::from_cents(cents))
    }

    fn goal(id: &str, target: f64, current: f64) -> Goal {
        let at = Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap();
        Goal {
            id: id.into(),
            title: id.into(),
            description: String::new(),
            kind: Default::default(),
            target_value: target,
            current_value: current,
            start_date: at,
            end_date: at,
            status: Default::default(),
            priority: Default::default(),
            created_at: at,
        }
    }

    #[test]
    fn test_top_two_products() {
        let groups = vec![entry("Apple", 5000), entry("Pear", 1000)];
        assert_eq!(top_n(&groups, 2), groups);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let groups = vec![
            entry("Couve", 100),
            entry("Mel", 900),
            entry("Alho", 100),
            entry("Ovo", 100),
        ];
        let labels: Vec<_> = top_n(&groups, 3).into_iter().map(|e| e.label).collect();
        assert_eq!(labels, vec!["Mel", "Couve", "Alho"]);
    }

    #[test]
    fn test_short_input_and_idempotence() {
        let groups = vec![entry("A", 1), entry("B", 3), entry("C", 2)];
        let once = top_n(&groups, 5);
        assert_eq!(once.len(), 3);
        assert_eq!(top_n(&once, 5), once);

        for n in 0..5 {
            let ranked = top_n(&groups, n);
            assert!(ranked.len() <= n.min(groups.len()));
            assert_eq!(top_n(&ranked, n), ranked);
        }
        // input untouched
        assert_eq!(groups[0].label, "A");
    }

    #[test]
    fn test_top_by_quantity() {
        let sales = vec![
            ProductSales {
                product_id: "p1".into(),
                label: "Queijo".into(),
                quantity: 2,
                value: Money::from_cents(9000),
                exceeds_stock: false,
            },
            ProductSales {
                product_id: "p2".into(),
                label: "Ovos".into(),
                quantity: 30,
                value: Money::from_cents(3000),
                exceeds_stock: false,
            },
        ];
        assert_eq!(top_by_quantity(&sales, 1)[0].label, "Ovos");
        assert_eq!(top_n(&sales, 1)[0].label, "Queijo");
    }

    #[test]
    fn test_goals_by_progress_guards_zero_target() {
        let goals = vec![goal("zero", 0.0, 10.0), goal("half", 100.0, 50.0), goal("over", 10.0, 20.0)];
        let ids: Vec<_> = top_goals_by_progress(&goals, 5)
            .into_iter()
            .map(|g| g.id)
            .collect();
        assert_eq!(ids, vec!["over", "half", "zero"]);
    }
}
