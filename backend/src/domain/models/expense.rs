//! Domain model for a single logged expense.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted expense document.
///
/// `year_month` and `day` are always derived from `date` by the
/// normalization step, so the three can never disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    /// Store-assigned identifier
    pub id: String,
    /// Category name, stored verbatim as entered
    pub category: String,
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    /// Monetary total for this line (non-negative)
    pub amount: f64,
    pub description: String,
    pub date: DateTime<Utc>,
    /// "YYYY-MM" sharding key into the monthly summaries
    pub year_month: String,
    /// Day-of-month, 1-31
    pub day: u32,
}

/// A normalized expense that has not been assigned a store id yet.
///
/// Produced only by `normalize::normalize_expense_input`; both the online
/// create path and the offline queue carry this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpense {
    pub category: String,
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub amount: f64,
    pub description: String,
    pub date: DateTime<Utc>,
    pub year_month: String,
    pub day: u32,
}

impl NewExpense {
    pub fn into_expense(self, id: String) -> Expense {
        Expense {
            id,
            category: self.category,
            name: self.name,
            quantity: self.quantity,
            unit: self.unit,
            amount: self.amount,
            description: self.description,
            date: self.date,
            year_month: self.year_month,
            day: self.day,
        }
    }
}
