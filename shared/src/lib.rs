use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw expense input as submitted by the presentation layer.
///
/// Numeric fields arrive as strings because that is what the input form
/// produces; the backend's normalization step owns parsing and defaulting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseInput {
    /// Spending category, user-chosen or free-typed (required, non-empty)
    pub category: String,
    /// Short display name for the expense (required, non-empty)
    pub name: String,
    /// Quantity purchased; defaults to 1 when absent or unparseable
    pub quantity: Option<String>,
    /// Unit for the quantity; defaults to "unit"
    pub unit: Option<String>,
    /// Monetary total for this line (required, must parse non-negative)
    pub total: String,
    /// Free-form notes; defaults to empty
    pub description: Option<String>,
    /// Transaction timestamp; defaults to the time of submission
    pub date: Option<DateTime<Utc>>,
}

/// One structured expense candidate produced by the LLM parsing collaborator.
///
/// The collaborator lowercases `category` before handoff and guarantees this
/// exact record shape; each candidate becomes one independent submit call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedExpenseData {
    pub name: String,
    pub category: String,
    pub quantity: f64,
    pub unit: String,
    pub total: f64,
    pub description: String,
}

impl ParsedExpenseData {
    /// Convert an LLM candidate into the raw input shape the submit path takes.
    pub fn into_expense_input(self) -> ExpenseInput {
        ExpenseInput {
            category: self.category,
            name: self.name,
            quantity: Some(self.quantity.to_string()),
            unit: Some(self.unit),
            total: self.total.to_string(),
            description: Some(self.description),
            date: None,
        }
    }
}

/// Outcome of a submit call.
///
/// The UI must message these differently: `Saved` is a committed write,
/// `QueuedOffline` means the expense is durably queued locally and will be
/// replayed when connectivity returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SubmitOutcome {
    /// Expense record and monthly summary were committed in one transaction
    Saved {
        /// Store-assigned expense id
        id: String,
    },
    /// Saved to the local offline queue instead
    QueuedOffline {
        /// Locally-assigned queue id
        queue_id: u64,
    },
}

impl SubmitOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SubmitOutcome::Saved { .. })
    }
}
