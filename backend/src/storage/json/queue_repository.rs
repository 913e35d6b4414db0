//! Durable local queue of pending expense mutations.
//!
//! One JSON file for the whole store, mirroring the single offline database
//! of the client: an auto-increment counter plus the entries, with lookups
//! by user and by status layered over it.

use anyhow::Result;
use chrono::Utc;
use log::info;

use crate::domain::models::{NewExpense, PendingExpense, PendingStatus};
use crate::storage::json::connection::JsonConnection;
use crate::storage::traits::PendingQueueStorage;

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct QueueFile {
    next_id: u64,
    entries: Vec<PendingExpense>,
}

impl Default for QueueFile {
    fn default() -> Self {
        QueueFile {
            next_id: 1,
            entries: Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct QueueRepository {
    connection: JsonConnection,
}

impl QueueRepository {
    pub fn new(connection: JsonConnection) -> Self {
        Self { connection }
    }

    fn load(&self) -> Result<QueueFile> {
        let path = self.connection.queue_path();
        match self.connection.read_document(&path)? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(QueueFile::default()),
        }
    }

    fn save(&self, queue: &QueueFile) -> Result<()> {
        let path = self.connection.queue_path();
        let bytes = serde_json::to_vec_pretty(queue)?;
        self.connection.write_document(&path, &bytes)
    }

    /// Read-modify-write under the store lock.
    fn mutate<T>(&self, apply: impl FnOnce(&mut QueueFile) -> Result<T>) -> Result<T> {
        let _guard = self.connection.lock_store();
        let mut queue = self.load()?;
        let value = apply(&mut queue)?;
        self.save(&queue)?;
        Ok(value)
    }
}

impl PendingQueueStorage for QueueRepository {
    fn enqueue(&self, user_id: &str, expense: &NewExpense) -> Result<u64> {
        self.mutate(|queue| {
            let queue_id = queue.next_id;
            queue.next_id += 1;
            queue.entries.push(PendingExpense {
                id: queue_id,
                user_id: user_id.to_string(),
                expense: expense.clone(),
                status: PendingStatus::Pending,
                error: None,
                created_at: Utc::now(),
            });
            info!("Enqueued pending expense {} for user {}", queue_id, user_id);
            Ok(queue_id)
        })
    }

    fn get_entry(&self, queue_id: u64) -> Result<Option<PendingExpense>> {
        let queue = self.load()?;
        Ok(queue.entries.into_iter().find(|entry| entry.id == queue_id))
    }

    fn list_by_user(&self, user_id: &str) -> Result<Vec<PendingExpense>> {
        let queue = self.load()?;
        Ok(queue
            .entries
            .into_iter()
            .filter(|entry| entry.user_id == user_id)
            .collect())
    }

    fn list_by_status(
        &self,
        user_id: &str,
        status: PendingStatus,
    ) -> Result<Vec<PendingExpense>> {
        let queue = self.load()?;
        Ok(queue
            .entries
            .into_iter()
            .filter(|entry| entry.user_id == user_id && entry.status == status)
            .collect())
    }

    fn update_status(
        &self,
        queue_id: u64,
        status: PendingStatus,
        error: Option<String>,
    ) -> Result<()> {
        self.mutate(|queue| {
            if let Some(entry) = queue.entries.iter_mut().find(|entry| entry.id == queue_id) {
                entry.status = status;
                entry.error = error;
            }
            Ok(())
        })
    }

    fn remove(&self, queue_id: u64) -> Result<()> {
        self.mutate(|queue| {
            queue.entries.retain(|entry| entry.id != queue_id);
            Ok(())
        })
    }

    fn clear_user(&self, user_id: &str) -> Result<()> {
        self.mutate(|queue| {
            queue.entries.retain(|entry| entry.user_id != user_id);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::json::test_utils::test_connection;
    use chrono::TimeZone;

    fn sample_expense(amount: f64) -> NewExpense {
        NewExpense {
            category: "food".to_string(),
            name: "Lunch".to_string(),
            quantity: 1.0,
            unit: "unit".to_string(),
            amount,
            description: String::new(),
            date: Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap(),
            year_month: "2024-03".to_string(),
            day: 15,
        }
    }

    #[test]
    fn enqueue_assigns_increasing_ids_and_pending_status() {
        let (connection, _temp_dir) = test_connection();
        let queue = QueueRepository::new(connection);

        let first = queue.enqueue("user-1", &sample_expense(10.0)).unwrap();
        let second = queue.enqueue("user-1", &sample_expense(20.0)).unwrap();
        assert!(second > first);

        let entries = queue.list_by_user("user-1").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, first);
        assert_eq!(entries[0].status, PendingStatus::Pending);
        assert!(entries[0].error.is_none());
    }

    #[test]
    fn listing_is_scoped_by_user_and_status() {
        let (connection, _temp_dir) = test_connection();
        let queue = QueueRepository::new(connection);

        let mine = queue.enqueue("user-1", &sample_expense(10.0)).unwrap();
        queue.enqueue("user-2", &sample_expense(20.0)).unwrap();
        queue
            .update_status(mine, PendingStatus::Error, Some("boom".to_string()))
            .unwrap();

        assert_eq!(queue.list_by_user("user-1").unwrap().len(), 1);
        assert!(queue
            .list_by_status("user-1", PendingStatus::Pending)
            .unwrap()
            .is_empty());

        let errored = queue
            .list_by_status("user-1", PendingStatus::Error)
            .unwrap();
        assert_eq!(errored.len(), 1);
        assert_eq!(errored[0].error.as_deref(), Some("boom"));
    }

    #[test]
    fn remove_and_clear_user_drop_entries() {
        let (connection, _temp_dir) = test_connection();
        let queue = QueueRepository::new(connection);

        let first = queue.enqueue("user-1", &sample_expense(10.0)).unwrap();
        queue.enqueue("user-1", &sample_expense(20.0)).unwrap();
        queue.enqueue("user-2", &sample_expense(30.0)).unwrap();

        queue.remove(first).unwrap();
        assert_eq!(queue.list_by_user("user-1").unwrap().len(), 1);
        assert!(queue.get_entry(first).unwrap().is_none());

        queue.clear_user("user-1").unwrap();
        assert!(queue.list_by_user("user-1").unwrap().is_empty());
        assert_eq!(queue.list_by_user("user-2").unwrap().len(), 1);
    }

    #[test]
    fn queue_survives_reopening_the_connection() {
        let (connection, temp_dir) = test_connection();
        {
            let queue = QueueRepository::new(connection);
            queue.enqueue("user-1", &sample_expense(10.0)).unwrap();
        }

        let reopened = JsonConnection::new(temp_dir.path()).unwrap();
        let queue = QueueRepository::new(reopened);
        let entries = queue.list_by_user("user-1").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].expense.amount, 10.0);
    }
}
