//! Optimistic read-then-write transaction over the JSON document store.
//!
//! Reads snapshot the raw bytes of every document they touch (including
//! absence). Writes are staged in memory. Commit takes the store lock,
//! re-verifies every snapshot and only then applies the staged writes, so a
//! document changed out from under the transaction fails the whole commit
//! and nothing is applied.

use anyhow::{anyhow, bail, Result};
use log::debug;
use std::path::PathBuf;
use uuid::Uuid;

use crate::domain::models::{Expense, MonthlySummary, NewExpense};
use crate::storage::json::connection::JsonConnection;
use crate::storage::traits::TransactionContext;

enum StagedWrite {
    Put { path: PathBuf, bytes: Vec<u8> },
    Delete { path: PathBuf },
}

pub struct JsonTransaction {
    connection: JsonConnection,
    user_id: String,
    read_snapshots: Vec<(PathBuf, Option<Vec<u8>>)>,
    staged: Vec<StagedWrite>,
}

impl JsonTransaction {
    pub(super) fn new(connection: JsonConnection, user_id: &str) -> Self {
        JsonTransaction {
            connection,
            user_id: user_id.to_string(),
            read_snapshots: Vec::new(),
            staged: Vec::new(),
        }
    }

    /// Snapshot-read one document. The store's optimistic-concurrency
    /// contract requires every read to happen before the first write.
    fn snapshot_read(&mut self, path: PathBuf) -> Result<Option<Vec<u8>>> {
        if !self.staged.is_empty() {
            bail!(
                "Transaction protocol violation: read of {} issued after a write",
                path.display()
            );
        }
        let bytes = self.connection.read_document(&path)?;
        self.read_snapshots.push((path, bytes.clone()));
        Ok(bytes)
    }

    fn stage_put<T: serde::Serialize>(&mut self, path: PathBuf, document: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(document)?;
        self.staged.push(StagedWrite::Put { path, bytes });
        Ok(())
    }

    /// Verify every read snapshot and apply the staged writes.
    pub(super) fn commit(self) -> Result<()> {
        let _guard = self.connection.lock_store();

        for (path, snapshot) in &self.read_snapshots {
            let current = self.connection.read_document(path)?;
            if current.as_deref() != snapshot.as_deref() {
                return Err(anyhow!(
                    "Transaction conflict: {} changed between read and commit",
                    path.display()
                ));
            }
        }

        for write in &self.staged {
            match write {
                StagedWrite::Put { path, bytes } => self.connection.write_document(path, bytes)?,
                StagedWrite::Delete { path } => self.connection.remove_document(path)?,
            }
        }

        debug!(
            "Committed transaction for user {}: {} reads verified, {} writes applied",
            self.user_id,
            self.read_snapshots.len(),
            self.staged.len()
        );
        Ok(())
    }
}

impl TransactionContext for JsonTransaction {
    fn read_expense(&mut self, expense_id: &str) -> Result<Option<Expense>> {
        let path = self.connection.expense_path(&self.user_id, expense_id);
        match self.snapshot_read(path)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn read_summary(&mut self, year_month: &str) -> Result<Option<MonthlySummary>> {
        let path = self.connection.summary_path(&self.user_id, year_month);
        match self.snapshot_read(path)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn create_expense(&mut self, expense: &NewExpense) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let document = expense.clone().into_expense(id.clone());
        let path = self.connection.expense_path(&self.user_id, &id);
        self.stage_put(path, &document)?;
        Ok(id)
    }

    fn put_expense(&mut self, expense: &Expense) -> Result<()> {
        let path = self.connection.expense_path(&self.user_id, &expense.id);
        self.stage_put(path, expense)
    }

    fn delete_expense(&mut self, expense_id: &str) -> Result<()> {
        let path = self.connection.expense_path(&self.user_id, expense_id);
        self.staged.push(StagedWrite::Delete { path });
        Ok(())
    }

    fn put_summary(&mut self, year_month: &str, summary: &MonthlySummary) -> Result<()> {
        let path = self.connection.summary_path(&self.user_id, year_month);
        self.stage_put(path, summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::json::test_utils::test_connection;
    use crate::storage::traits::Connection;
    use chrono::{TimeZone, Utc};

    fn sample_expense() -> NewExpense {
        NewExpense {
            category: "food".to_string(),
            name: "Lunch".to_string(),
            quantity: 1.0,
            unit: "unit".to_string(),
            amount: 20000.0,
            description: String::new(),
            date: Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap(),
            year_month: "2024-03".to_string(),
            day: 15,
        }
    }

    #[test]
    fn create_and_read_back_inside_transactions() {
        let (connection, _temp_dir) = test_connection();

        let id = connection
            .run_transaction("user-1", &mut |tx| {
                let id = tx.create_expense(&sample_expense())?;
                Ok(Some(id))
            })
            .unwrap()
            .unwrap();

        let read_back = connection
            .run_transaction("user-1", &mut |tx| {
                let expense = tx.read_expense(&id)?.expect("expense should exist");
                assert_eq!(expense.amount, 20000.0);
                Ok(None)
            })
            .unwrap();
        assert!(read_back.is_none());
    }

    #[test]
    fn rejects_read_after_write() {
        let (connection, _temp_dir) = test_connection();

        let result = connection.run_transaction("user-1", &mut |tx| {
            tx.create_expense(&sample_expense())?;
            tx.read_summary("2024-03")?;
            Ok(None)
        });

        let err = result.unwrap_err();
        assert!(err.to_string().contains("protocol violation"));
    }

    #[test]
    fn conflicting_out_of_band_write_fails_the_commit() {
        let (connection, _temp_dir) = test_connection();
        let summary_path = connection.summary_path("user-1", "2024-03");

        let result = connection.run_transaction("user-1", &mut |tx| {
            let summary = tx.read_summary("2024-03")?;
            assert!(summary.is_none());

            // Another writer lands between read and commit
            connection
                .write_document(&summary_path, b"{\"total_amount\":1.0,\"category_breakdown\":{\"x\":1.0},\"expense_count\":1,\"avg_per_day\":0.1}")
                .unwrap();

            tx.put_summary("2024-03", &MonthlySummary::empty())?;
            Ok(None)
        });

        let err = result.unwrap_err();
        assert!(err.to_string().contains("conflict"));
    }

    #[test]
    fn failed_body_stages_nothing() {
        let (connection, _temp_dir) = test_connection();

        let result = connection.run_transaction("user-1", &mut |tx| {
            tx.put_summary("2024-03", &MonthlySummary::empty())?;
            anyhow::bail!("body failed")
        });
        assert!(result.is_err());

        let summary_path = connection.summary_path("user-1", "2024-03");
        assert!(connection.read_document(&summary_path).unwrap().is_none());
    }
}
