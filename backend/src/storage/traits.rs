//! # Storage Traits
//!
//! Storage abstraction for the expense tracker core. The domain layer works
//! against these traits so the document store backend can be swapped without
//! touching the aggregation logic.
//!
//! The store contract the domain relies on: single-document writes are
//! atomic, and `run_transaction` gives optimistic read-then-write isolation
//! across the documents touched by one expense mutation.

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::domain::models::{Expense, MonthlySummary, NewExpense, PendingExpense, PendingStatus};

/// Read access to individual expense documents.
///
/// Creation, update and deletion of expense documents happen only inside a
/// transaction (`TransactionContext`), never through this trait, so every
/// record mutation stays paired with its summary adjustment.
pub trait ExpenseStorage: Send + Sync + Clone {
    /// Retrieve a specific expense by id
    fn get_expense(&self, user_id: &str, expense_id: &str) -> Result<Option<Expense>>;

    /// List the most recent expenses, ordered by date descending
    fn query_recent(&self, user_id: &str, limit: usize) -> Result<Vec<Expense>>;

    /// List all expenses in one calendar month, ordered by date ascending
    fn query_by_year_month(&self, user_id: &str, year_month: &str) -> Result<Vec<Expense>>;

    /// List all expenses in an inclusive date range, ordered by date ascending
    fn query_by_date_range(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Expense>>;
}

/// Read access to monthly summary documents.
pub trait SummaryStorage: Send + Sync + Clone {
    /// Retrieve one month's summary, if it was ever created
    fn get_summary(&self, user_id: &str, year_month: &str) -> Result<Option<MonthlySummary>>;

    /// List all of a user's summaries as (year_month, summary) pairs,
    /// ordered by month key. Feeds the category scan and trend queries.
    fn list_summaries(&self, user_id: &str) -> Result<Vec<(String, MonthlySummary)>>;
}

/// Durable local queue of expense creations made while disconnected.
///
/// A separate physical store from the document store: it must stay writable
/// exactly when the document store is unreachable.
pub trait PendingQueueStorage: Send + Sync + Clone {
    /// Append a new entry with status Pending, returning its queue id
    fn enqueue(&self, user_id: &str, expense: &NewExpense) -> Result<u64>;

    /// Retrieve a specific entry by queue id
    fn get_entry(&self, queue_id: u64) -> Result<Option<PendingExpense>>;

    /// List a user's entries in creation (queue id) order
    fn list_by_user(&self, user_id: &str) -> Result<Vec<PendingExpense>>;

    /// List a user's entries with the given status, in creation order
    fn list_by_status(&self, user_id: &str, status: PendingStatus)
        -> Result<Vec<PendingExpense>>;

    /// Update an entry's status, replacing its captured error message
    fn update_status(
        &self,
        queue_id: u64,
        status: PendingStatus,
        error: Option<String>,
    ) -> Result<()>;

    /// Remove an entry (successful sync or manual clear)
    fn remove(&self, queue_id: u64) -> Result<()>;

    /// Drop all of a user's entries
    fn clear_user(&self, user_id: &str) -> Result<()>;
}

/// Capability object handed to a transaction body.
///
/// All reads must precede all writes; implementations reject reads issued
/// after the first staged write. Reads record per-document snapshots and the
/// commit re-verifies them before applying any staged write, so either every
/// write of the transaction lands against unchanged documents or none does.
pub trait TransactionContext {
    fn read_expense(&mut self, expense_id: &str) -> Result<Option<Expense>>;

    fn read_summary(&mut self, year_month: &str) -> Result<Option<MonthlySummary>>;

    /// Stage the creation of a new expense document, returning the
    /// store-assigned id
    fn create_expense(&mut self, expense: &NewExpense) -> Result<String>;

    /// Stage a full replace of an existing expense document
    fn put_expense(&mut self, expense: &Expense) -> Result<()>;

    /// Stage deletion of an expense document
    fn delete_expense(&mut self, expense_id: &str) -> Result<()>;

    /// Stage creation or replacement of one month's summary document
    fn put_summary(&mut self, year_month: &str, summary: &MonthlySummary) -> Result<()>;
}

/// Factory for repositories plus the transaction entry point.
pub trait Connection: Send + Sync + Clone {
    type ExpenseRepository: ExpenseStorage;
    type SummaryRepository: SummaryStorage;
    type QueueRepository: PendingQueueStorage;

    fn create_expense_repository(&self) -> Self::ExpenseRepository;

    fn create_summary_repository(&self) -> Self::SummaryRepository;

    fn create_queue_repository(&self) -> Self::QueueRepository;

    /// Run `body` against a fresh transaction context scoped to one user and
    /// commit its staged writes. Returns whatever id the body produced (the
    /// created expense id on the create path).
    fn run_transaction(
        &self,
        user_id: &str,
        body: &mut dyn FnMut(&mut dyn TransactionContext) -> Result<Option<String>>,
    ) -> Result<Option<String>>;
}
