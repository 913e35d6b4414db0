//! Offline queue entry for an expense created while disconnected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::expense::NewExpense;

/// Per-entry replay state. Entries are removed from the queue on successful
/// sync rather than marked synced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingStatus {
    Pending,
    Syncing,
    Error,
}

/// A durably queued expense creation awaiting connectivity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingExpense {
    /// Locally-assigned auto-increment queue id
    pub id: u64,
    pub user_id: String,
    pub expense: NewExpense,
    pub status: PendingStatus,
    /// Captured failure message from the last replay attempt
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}
