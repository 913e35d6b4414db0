//! Monthly summary aggregate and the signed delta applied to it.
//!
//! Invariants maintained here:
//! - `total_amount` equals the sum of `category_breakdown` values
//! - a category key is present iff its summed amount is strictly positive
//! - `expense_count` never goes negative
//! - `avg_per_day` is `total_amount / calendar days`, recomputed on every
//!   mutation of the month

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One aggregate document per (user, "YYYY-MM").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub total_amount: f64,
    pub category_breakdown: BTreeMap<String, f64>,
    pub expense_count: u32,
    pub avg_per_day: f64,
}

impl MonthlySummary {
    /// Empty summary; months reach this shape again when every expense is
    /// removed (the document itself persists once created).
    pub fn empty() -> Self {
        MonthlySummary {
            total_amount: 0.0,
            category_breakdown: BTreeMap::new(),
            expense_count: 0,
            avg_per_day: 0.0,
        }
    }

    /// Apply a signed adjustment and recompute the daily average over the
    /// calendar days of the month.
    pub fn apply(&mut self, delta: &SummaryDelta, days_in_month: u32) {
        self.total_amount += delta.amount;

        for (category, category_delta) in &delta.category_deltas {
            let current = self
                .category_breakdown
                .get(category)
                .copied()
                .unwrap_or(0.0);
            let updated = current + category_delta;
            // Zero or negative category totals drop the key entirely
            if updated > 0.0 {
                self.category_breakdown.insert(category.clone(), updated);
            } else {
                self.category_breakdown.remove(category);
            }
        }

        self.expense_count = if delta.count_delta >= 0 {
            self.expense_count + delta.count_delta as u32
        } else {
            self.expense_count
                .saturating_sub(delta.count_delta.unsigned_abs())
        };

        self.avg_per_day = self.total_amount / days_in_month as f64;
    }

    /// Check the totals-vs-breakdown invariant; used by tests and diagnostics.
    pub fn is_consistent(&self) -> bool {
        let breakdown_sum: f64 = self.category_breakdown.values().sum();
        (self.total_amount - breakdown_sum).abs() < 1e-9
            && self.category_breakdown.values().all(|v| *v > 0.0)
    }
}

/// The signed adjustment a single expense mutation makes to one month.
///
/// Category deltas are ordered: an update that only swaps categories
/// subtracts from the old key before adding to the new one, against the same
/// summary snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryDelta {
    pub amount: f64,
    pub category_deltas: Vec<(String, f64)>,
    pub count_delta: i32,
}

impl SummaryDelta {
    /// Delta for creating an expense.
    pub fn create(category: &str, amount: f64) -> Self {
        SummaryDelta {
            amount,
            category_deltas: vec![(category.to_string(), amount)],
            count_delta: 1,
        }
    }

    /// Delta for deleting an expense.
    pub fn delete(category: &str, amount: f64) -> Self {
        SummaryDelta {
            amount: -amount,
            category_deltas: vec![(category.to_string(), -amount)],
            count_delta: -1,
        }
    }

    /// Delta for an in-month update: remove the old line, add the new one.
    pub fn update(old_category: &str, old_amount: f64, new_category: &str, new_amount: f64) -> Self {
        SummaryDelta {
            amount: new_amount - old_amount,
            category_deltas: vec![
                (old_category.to_string(), -old_amount),
                (new_category.to_string(), new_amount),
            ],
            count_delta: 0,
        }
    }
}
