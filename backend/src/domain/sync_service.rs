//! Sync manager for the offline expense queue.
//!
//! Replays queued creations through the engine's online create path, one
//! store transaction per entry. A mid-sync crash leaves a mix of synced and
//! pending entries, which is fine: each entry is independently consistent
//! and removed only after its own transaction commits.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use log::{error, info};
use std::sync::{Arc, Mutex};

use super::clock::Clock;
use super::connectivity::NetworkMonitor;
use super::expense_service::ExpenseService;
use super::models::{PendingExpense, PendingStatus};
use crate::storage::traits::{Connection, PendingQueueStorage};

/// Default replay interval while pending entries exist.
pub const DEFAULT_SYNC_INTERVAL_SECS: i64 = 5 * 60;

/// What one sync pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub attempted: usize,
    pub synced: usize,
    pub failed: usize,
    pub skipped_offline: bool,
}

impl SyncReport {
    fn skipped() -> Self {
        SyncReport {
            attempted: 0,
            synced: 0,
            failed: 0,
            skipped_offline: true,
        }
    }
}

#[derive(Clone)]
pub struct SyncService<C: Connection> {
    expense_service: ExpenseService<C>,
    queue_repository: C::QueueRepository,
    network: NetworkMonitor,
    clock: Arc<dyn Clock>,
    sync_interval: Duration,
    last_attempt: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl<C: Connection> SyncService<C> {
    pub fn new(
        connection: Arc<C>,
        expense_service: ExpenseService<C>,
        network: NetworkMonitor,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let queue_repository = connection.create_queue_repository();
        Self {
            expense_service,
            queue_repository,
            network,
            clock,
            sync_interval: Duration::seconds(DEFAULT_SYNC_INTERVAL_SECS),
            last_attempt: Arc::new(Mutex::new(None)),
        }
    }

    /// Drain the user's fresh Pending entries, in creation order.
    ///
    /// No-op while offline. Entries already in Error from a previous pass
    /// wait for manual clearing; each replay failure is captured on its
    /// entry and never aborts the rest of the pass.
    pub fn sync(&self, user_id: &str) -> Result<SyncReport> {
        if !self.network.is_online() {
            info!("Sync requested for user {} while offline, skipping", user_id);
            return Ok(SyncReport::skipped());
        }

        *self.last_attempt.lock().unwrap() = Some(self.clock.now());

        let pending = self
            .queue_repository
            .list_by_status(user_id, PendingStatus::Pending)?;
        if pending.is_empty() {
            return Ok(SyncReport {
                attempted: 0,
                synced: 0,
                failed: 0,
                skipped_offline: false,
            });
        }

        info!(
            "Syncing {} pending expenses for user {}",
            pending.len(),
            user_id
        );

        let mut synced = 0;
        let mut failed = 0;
        for entry in &pending {
            self.queue_repository
                .update_status(entry.id, PendingStatus::Syncing, None)?;

            match self.expense_service.create_online(user_id, &entry.expense) {
                Ok(expense_id) => {
                    self.queue_repository.remove(entry.id)?;
                    synced += 1;
                    info!(
                        "Synced queue entry {} for user {} as expense {}",
                        entry.id, user_id, expense_id
                    );
                }
                Err(err) => {
                    error!(
                        "Failed to sync queue entry {} for user {}: {}",
                        entry.id, user_id, err
                    );
                    self.queue_repository.update_status(
                        entry.id,
                        PendingStatus::Error,
                        Some(err.to_string()),
                    )?;
                    failed += 1;
                }
            }
        }

        Ok(SyncReport {
            attempted: pending.len(),
            synced,
            failed,
            skipped_offline: false,
        })
    }

    /// Feed a connectivity event into the monitor; the offline-to-online
    /// transition triggers an automatic sync.
    pub fn handle_network_change(&self, user_id: &str, online: bool) -> Result<Option<SyncReport>> {
        let was_online = self.network.is_online();
        self.network.set_online(online);

        if online && !was_online {
            info!(
                "Connectivity restored, syncing pending expenses for user {}",
                user_id
            );
            return self.sync(user_id).map(Some);
        }
        Ok(None)
    }

    /// Periodic trigger: replays when online, the queue is non-empty and the
    /// sync interval has elapsed since the last attempt.
    pub fn tick(&self, user_id: &str) -> Result<Option<SyncReport>> {
        if !self.network.is_online() {
            return Ok(None);
        }
        if self.queue_repository.list_by_user(user_id)?.is_empty() {
            return Ok(None);
        }

        let due = match *self.last_attempt.lock().unwrap() {
            Some(last) => self.clock.now() - last >= self.sync_interval,
            None => true,
        };
        if due {
            self.sync(user_id).map(Some)
        } else {
            Ok(None)
        }
    }

    /// All of the user's queue entries, for the pending-count indicator and
    /// the manual-retry UI.
    pub fn list_pending(&self, user_id: &str) -> Result<Vec<PendingExpense>> {
        self.queue_repository.list_by_user(user_id)
    }

    pub fn pending_count(&self, user_id: &str) -> Result<usize> {
        Ok(self.queue_repository.list_by_user(user_id)?.len())
    }

    /// Manually drop all of a user's queue entries, including errored ones.
    pub fn clear_queue(&self, user_id: &str) -> Result<()> {
        self.queue_repository.clear_user(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::test_support::ManualClock;
    use crate::domain::models::NewExpense;
    use crate::storage::json::JsonConnection;
    use chrono::TimeZone;
    use shared::ExpenseInput;
    use tempfile::TempDir;

    struct TestContext {
        sync_service: SyncService<JsonConnection>,
        expense_service: ExpenseService<JsonConnection>,
        queue: crate::storage::json::QueueRepository,
        network: NetworkMonitor,
        clock: Arc<ManualClock>,
        _temp_dir: TempDir,
    }

    fn create_test_service() -> TestContext {
        let temp_dir = TempDir::new().unwrap();
        let connection = Arc::new(JsonConnection::new(temp_dir.path()).unwrap());
        let network = NetworkMonitor::new();
        let clock = ManualClock::at(2024, 3, 15);
        let expense_service =
            ExpenseService::new(connection.clone(), network.clone(), clock.clone());
        let sync_service = SyncService::new(
            connection.clone(),
            expense_service.clone(),
            network.clone(),
            clock.clone(),
        );
        let queue = connection.create_queue_repository();
        TestContext {
            sync_service,
            expense_service,
            queue,
            network,
            clock,
            _temp_dir: temp_dir,
        }
    }

    fn input(category: &str, total: &str) -> ExpenseInput {
        ExpenseInput {
            category: category.to_string(),
            name: "Queued".to_string(),
            quantity: None,
            unit: None,
            total: total.to_string(),
            description: None,
            date: None,
        }
    }

    fn submit_offline(ctx: &TestContext, category: &str, total: &str) {
        assert!(!ctx.network.is_online());
        let outcome = ctx
            .expense_service
            .submit("user-1", &input(category, total))
            .unwrap();
        assert!(matches!(
            outcome,
            shared::SubmitOutcome::QueuedOffline { .. }
        ));
    }

    #[test]
    fn reconnect_drains_the_queue_in_order() {
        let ctx = create_test_service();
        ctx.network.set_online(false);
        submit_offline(&ctx, "food", "100");
        submit_offline(&ctx, "transport", "50");

        let report = ctx
            .sync_service
            .handle_network_change("user-1", true)
            .unwrap()
            .expect("offline-to-online transition must sync");
        assert_eq!(report.attempted, 2);
        assert_eq!(report.synced, 2);
        assert_eq!(report.failed, 0);

        assert_eq!(ctx.sync_service.pending_count("user-1").unwrap(), 0);
        let summary = ctx
            .expense_service
            .get_monthly_summary("user-1", "2024-03")
            .unwrap()
            .unwrap();
        assert_eq!(summary.total_amount, 150.0);
        assert_eq!(summary.expense_count, 2);
        assert!(summary.is_consistent());
    }

    #[test]
    fn sync_while_offline_is_a_no_op() {
        let ctx = create_test_service();
        ctx.network.set_online(false);
        submit_offline(&ctx, "food", "100");

        let report = ctx.sync_service.sync("user-1").unwrap();
        assert!(report.skipped_offline);
        assert_eq!(ctx.sync_service.pending_count("user-1").unwrap(), 1);
        assert!(ctx
            .expense_service
            .get_monthly_summary("user-1", "2024-03")
            .unwrap()
            .is_none());
    }

    #[test]
    fn one_bad_entry_does_not_block_the_rest() {
        let ctx = create_test_service();

        // Corrupt entry: a month key the calendar rejects
        let broken = NewExpense {
            category: "food".to_string(),
            name: "Broken".to_string(),
            quantity: 1.0,
            unit: "unit".to_string(),
            amount: 10.0,
            description: String::new(),
            date: Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap(),
            year_month: "2024-13".to_string(),
            day: 15,
        };
        let broken_id = ctx.queue.enqueue("user-1", &broken).unwrap();

        ctx.network.set_online(false);
        submit_offline(&ctx, "transport", "50");
        ctx.network.set_online(true);

        let report = ctx.sync_service.sync("user-1").unwrap();
        assert_eq!(report.attempted, 2);
        assert_eq!(report.synced, 1);
        assert_eq!(report.failed, 1);

        let entries = ctx.sync_service.list_pending("user-1").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, broken_id);
        assert_eq!(entries[0].status, PendingStatus::Error);
        assert!(entries[0].error.as_deref().unwrap().contains("month"));

        // The good entry landed
        let summary = ctx
            .expense_service
            .get_monthly_summary("user-1", "2024-03")
            .unwrap()
            .unwrap();
        assert_eq!(summary.total_amount, 50.0);
    }

    #[test]
    fn errored_entries_are_not_auto_retried() {
        let ctx = create_test_service();
        let broken = NewExpense {
            category: "food".to_string(),
            name: "Broken".to_string(),
            quantity: 1.0,
            unit: "unit".to_string(),
            amount: 10.0,
            description: String::new(),
            date: Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap(),
            year_month: "2024-13".to_string(),
            day: 15,
        };
        ctx.queue.enqueue("user-1", &broken).unwrap();

        let first = ctx.sync_service.sync("user-1").unwrap();
        assert_eq!(first.failed, 1);

        let second = ctx.sync_service.sync("user-1").unwrap();
        assert_eq!(second.attempted, 0);

        // Manual clear is the way out
        ctx.sync_service.clear_queue("user-1").unwrap();
        assert_eq!(ctx.sync_service.pending_count("user-1").unwrap(), 0);
    }

    #[test]
    fn tick_respects_the_interval_and_queue_state() {
        let ctx = create_test_service();

        // Empty queue: nothing to do
        assert!(ctx.sync_service.tick("user-1").unwrap().is_none());

        ctx.network.set_online(false);
        submit_offline(&ctx, "food", "100");
        // Offline: no tick sync either
        assert!(ctx.sync_service.tick("user-1").unwrap().is_none());

        ctx.network.set_online(true);
        let report = ctx
            .sync_service
            .tick("user-1")
            .unwrap()
            .expect("first tick with pending entries syncs");
        assert_eq!(report.synced, 1);

        // Queue drained; later ticks are quiet again
        ctx.clock.advance(Duration::minutes(6));
        assert!(ctx.sync_service.tick("user-1").unwrap().is_none());
    }

    #[test]
    fn tick_waits_for_the_interval_between_attempts() {
        let ctx = create_test_service();
        let broken = NewExpense {
            category: "food".to_string(),
            name: "Broken".to_string(),
            quantity: 1.0,
            unit: "unit".to_string(),
            amount: 10.0,
            description: String::new(),
            date: Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap(),
            year_month: "2024-13".to_string(),
            day: 15,
        };
        ctx.queue.enqueue("user-1", &broken).unwrap();

        // First pass marks the entry Error and stamps the attempt time
        assert!(ctx.sync_service.tick("user-1").unwrap().is_some());

        // Within the interval the errored entry keeps the queue non-empty,
        // but no new pass starts
        ctx.clock.advance(Duration::minutes(2));
        assert!(ctx.sync_service.tick("user-1").unwrap().is_none());

        // Past the interval a pass runs again (and finds nothing Pending)
        ctx.clock.advance(Duration::minutes(4));
        let report = ctx.sync_service.tick("user-1").unwrap().unwrap();
        assert_eq!(report.attempted, 0);
    }

    #[test]
    fn staying_online_does_not_resync() {
        let ctx = create_test_service();
        ctx.network.set_online(false);
        submit_offline(&ctx, "food", "100");
        ctx.network.set_online(true);

        // online -> online is not a transition
        assert!(ctx
            .sync_service
            .handle_network_change("user-1", true)
            .unwrap()
            .is_none());
        assert_eq!(ctx.sync_service.pending_count("user-1").unwrap(), 1);
    }
}
