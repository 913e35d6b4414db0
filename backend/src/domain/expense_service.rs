//! Aggregation engine for expense mutations.
//!
//! Every create/update/delete funnels through this service, which pairs each
//! expense-record mutation with exactly one monthly-summary adjustment inside
//! a single store transaction. Creates degrade to the durable offline queue;
//! updates and deletes require connectivity.

use anyhow::anyhow;
use log::{info, warn};
use std::sync::Arc;

use shared::{ExpenseInput, SubmitOutcome};

use super::calendar::days_in_year_month;
use super::category_cache::CategoryCache;
use super::clock::Clock;
use super::connectivity::{MutationKind, NetworkMonitor};
use super::errors::WalletError;
use super::models::{Expense, MonthlySummary, NewExpense, SummaryDelta};
use super::normalize::normalize_expense_input;
use crate::storage::traits::{Connection, ExpenseStorage, SummaryStorage};
use crate::storage::PendingQueueStorage;

#[derive(Clone)]
pub struct ExpenseService<C: Connection> {
    connection: Arc<C>,
    expense_repository: C::ExpenseRepository,
    summary_repository: C::SummaryRepository,
    queue_repository: C::QueueRepository,
    network: NetworkMonitor,
    clock: Arc<dyn Clock>,
    category_cache: Arc<CategoryCache>,
}

impl<C: Connection> ExpenseService<C> {
    pub fn new(connection: Arc<C>, network: NetworkMonitor, clock: Arc<dyn Clock>) -> Self {
        let expense_repository = connection.create_expense_repository();
        let summary_repository = connection.create_summary_repository();
        let queue_repository = connection.create_queue_repository();
        let category_cache = Arc::new(CategoryCache::new(clock.clone()));
        Self {
            connection,
            expense_repository,
            summary_repository,
            queue_repository,
            network,
            clock,
            category_cache,
        }
    }

    /// Reject operations whose kind has no offline path while disconnected.
    fn require_online(&self, kind: MutationKind) -> Result<(), WalletError> {
        if kind.offline_capable() || self.network.is_online() {
            Ok(())
        } else {
            Err(WalletError::Offline {
                operation: kind.operation_name(),
            })
        }
    }

    /// Submit a new expense.
    ///
    /// Online, the record and its summary delta commit in one transaction.
    /// Offline, or when the online attempt fails, the normalized expense is
    /// queued durably instead; the caller gets a distinguishable
    /// `QueuedOffline` outcome rather than an error, so user input is never
    /// lost.
    pub fn submit(
        &self,
        user_id: &str,
        input: &ExpenseInput,
    ) -> Result<SubmitOutcome, WalletError> {
        let expense = normalize_expense_input(input, self.clock.now())?;

        let outcome = if self.network.is_online() {
            match self.create_online(user_id, &expense) {
                Ok(id) => SubmitOutcome::Saved { id },
                Err(err) => {
                    warn!(
                        "Online create failed for user {}, falling back to offline queue: {}",
                        user_id, err
                    );
                    let queue_id = self.enqueue(user_id, &expense)?;
                    SubmitOutcome::QueuedOffline { queue_id }
                }
            }
        } else {
            info!(
                "Offline, queueing expense '{}' for user {}",
                expense.name, user_id
            );
            let queue_id = self.enqueue(user_id, &expense)?;
            SubmitOutcome::QueuedOffline { queue_id }
        };

        // Write-through so the next autocomplete already has the category
        self.category_cache.add_category(user_id, &expense.category);
        Ok(outcome)
    }

    /// The online create path: one transaction creating the expense document
    /// and applying the create delta to its month.
    ///
    /// Also the replay path for queued mutations — a failure here propagates
    /// so the sync manager can capture it per entry.
    pub fn create_online(&self, user_id: &str, expense: &NewExpense) -> Result<String, WalletError> {
        let delta = SummaryDelta::create(&expense.category, expense.amount);
        let result = self.connection.run_transaction(user_id, &mut |tx| {
            let days = days_in_year_month(&expense.year_month)?;
            let mut summary = tx
                .read_summary(&expense.year_month)?
                .unwrap_or_else(MonthlySummary::empty);
            let id = tx.create_expense(expense)?;
            summary.apply(&delta, days);
            tx.put_summary(&expense.year_month, &summary)?;
            Ok(Some(id))
        });

        match result {
            Ok(Some(id)) => {
                info!(
                    "Created expense {} for user {} in month {}",
                    id, user_id, expense.year_month
                );
                Ok(id)
            }
            Ok(None) => Err(WalletError::Transaction(anyhow!(
                "create transaction produced no expense id"
            ))),
            Err(err) => Err(WalletError::from_transaction_failure(err)),
        }
    }

    fn enqueue(&self, user_id: &str, expense: &NewExpense) -> Result<u64, WalletError> {
        self.queue_repository
            .enqueue(user_id, expense)
            .map_err(WalletError::Transaction)
    }

    /// Replace an expense's fields, keeping the affected month(s) consistent.
    ///
    /// Same month: one summary takes the net amount and category deltas —
    /// the old category's amount is removed before the new category's amount
    /// is added, against the same read snapshot, so a category-only change
    /// can never double-count. Month change: the old month is decremented
    /// like a delete and the new month incremented like a create, each with
    /// its own calendar day count.
    pub fn update(
        &self,
        user_id: &str,
        expense_id: &str,
        input: &ExpenseInput,
        old_year_month: &str,
    ) -> Result<(), WalletError> {
        self.require_online(MutationKind::Update)?;
        let updated = normalize_expense_input(input, self.clock.now())?;

        let result = self.connection.run_transaction(user_id, &mut |tx| {
            let original = tx.read_expense(expense_id)?.ok_or_else(|| {
                anyhow::Error::from(WalletError::NotFound(format!(
                    "Expense {} not found",
                    expense_id
                )))
            })?;
            let mut old_summary = tx.read_summary(old_year_month)?.ok_or_else(|| {
                anyhow::Error::from(WalletError::NotFound(format!(
                    "Monthly summary {} not found",
                    old_year_month
                )))
            })?;

            if updated.year_month == old_year_month {
                let delta = SummaryDelta::update(
                    &original.category,
                    original.amount,
                    &updated.category,
                    updated.amount,
                );
                old_summary.apply(&delta, days_in_year_month(old_year_month)?);

                tx.put_expense(&updated.clone().into_expense(expense_id.to_string()))?;
                tx.put_summary(old_year_month, &old_summary)?;
            } else {
                let mut new_summary = tx
                    .read_summary(&updated.year_month)?
                    .unwrap_or_else(MonthlySummary::empty);

                let decrement = SummaryDelta::delete(&original.category, original.amount);
                let increment = SummaryDelta::create(&updated.category, updated.amount);
                old_summary.apply(&decrement, days_in_year_month(old_year_month)?);
                new_summary.apply(&increment, days_in_year_month(&updated.year_month)?);

                tx.put_expense(&updated.clone().into_expense(expense_id.to_string()))?;
                tx.put_summary(old_year_month, &old_summary)?;
                tx.put_summary(&updated.year_month, &new_summary)?;
            }
            Ok(None)
        });

        match result {
            Ok(_) => {
                info!("Updated expense {} for user {}", expense_id, user_id);
                self.category_cache.add_category(user_id, &updated.category);
                Ok(())
            }
            Err(err) => Err(WalletError::from_transaction_failure(err)),
        }
    }

    /// Delete an expense, reversing its contribution to the month.
    ///
    /// The caller supplies the expense snapshot it is acting on; its month's
    /// summary must exist or a prior invariant violation is surfaced.
    pub fn delete(
        &self,
        user_id: &str,
        expense_id: &str,
        snapshot: &Expense,
    ) -> Result<(), WalletError> {
        self.require_online(MutationKind::Delete)?;

        let delta = SummaryDelta::delete(&snapshot.category, snapshot.amount);
        let year_month = snapshot.year_month.clone();
        let result = self.connection.run_transaction(user_id, &mut |tx| {
            let days = days_in_year_month(&year_month)?;
            let mut summary = tx.read_summary(&year_month)?.ok_or_else(|| {
                anyhow::Error::from(WalletError::NotFound(format!(
                    "Monthly summary {} not found",
                    year_month
                )))
            })?;

            tx.delete_expense(expense_id)?;
            summary.apply(&delta, days);
            tx.put_summary(&year_month, &summary)?;
            Ok(None)
        });

        match result {
            Ok(_) => {
                info!("Deleted expense {} for user {}", expense_id, user_id);
                Ok(())
            }
            Err(err) => Err(WalletError::from_transaction_failure(err)),
        }
    }

    pub fn get_expense(&self, user_id: &str, expense_id: &str) -> Result<Expense, WalletError> {
        self.expense_repository
            .get_expense(user_id, expense_id)
            .map_err(WalletError::Transaction)?
            .ok_or_else(|| WalletError::NotFound(format!("Expense {} not found", expense_id)))
    }

    pub fn get_monthly_summary(
        &self,
        user_id: &str,
        year_month: &str,
    ) -> Result<Option<MonthlySummary>, WalletError> {
        self.summary_repository
            .get_summary(user_id, year_month)
            .map_err(WalletError::Transaction)
    }

    /// Distinct categories for autocomplete. Never fails; degrades to the
    /// fallback list on store errors.
    pub fn get_categories(&self, user_id: &str) -> Vec<String> {
        self.category_cache
            .get_categories(user_id, &self.summary_repository)
    }

    /// Write-through a newly used category into the cache.
    pub fn add_category(&self, user_id: &str, category: &str) {
        self.category_cache.add_category(user_id, category);
    }
}
