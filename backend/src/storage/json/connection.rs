//! Connection handle for the file-per-document JSON store.
//!
//! Layout under the base directory:
//!
//! ```text
//! data/
//! ├── offline_queue.json            ← durable local queue (all users)
//! └── {user_id}/
//!     ├── expenses/{expense_id}.json
//!     └── summaries/{YYYY-MM}.json
//! ```

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::storage::json::transaction::JsonTransaction;
use crate::storage::json::{ExpenseRepository, QueueRepository, SummaryRepository};
use crate::storage::traits::{Connection, TransactionContext};

/// JsonConnection manages document paths and serializes store commits.
#[derive(Clone)]
pub struct JsonConnection {
    base_directory: Arc<PathBuf>,
    store_lock: Arc<Mutex<()>>,
}

impl JsonConnection {
    /// Create a new connection with a base directory
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self> {
        let base_path = base_directory.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path)?;
        }

        Ok(Self {
            base_directory: Arc::new(base_path),
            store_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    /// Directory holding one user's documents. User ids are opaque strings
    /// from the authentication collaborator, so they are sanitized before
    /// becoming path components.
    pub(super) fn user_directory(&self, user_id: &str) -> PathBuf {
        let safe_name: String = user_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.base_directory.join(safe_name)
    }

    pub(super) fn expenses_directory(&self, user_id: &str) -> PathBuf {
        self.user_directory(user_id).join("expenses")
    }

    pub(super) fn expense_path(&self, user_id: &str, expense_id: &str) -> PathBuf {
        self.expenses_directory(user_id)
            .join(format!("{}.json", expense_id))
    }

    pub(super) fn summaries_directory(&self, user_id: &str) -> PathBuf {
        self.user_directory(user_id).join("summaries")
    }

    pub(super) fn summary_path(&self, user_id: &str, year_month: &str) -> PathBuf {
        self.summaries_directory(user_id)
            .join(format!("{}.json", year_month))
    }

    pub(super) fn queue_path(&self) -> PathBuf {
        self.base_directory.join("offline_queue.json")
    }

    /// Read one document's raw bytes; `None` when the document is absent.
    pub(super) fn read_document(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Atomically write one document: temp file in the target directory,
    /// then rename over the destination.
    pub(super) fn write_document(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, bytes)?;
        fs::rename(&temp_path, path)?;
        Ok(())
    }

    pub(super) fn remove_document(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    pub(super) fn lock_store(&self) -> MutexGuard<'_, ()> {
        self.store_lock.lock().unwrap()
    }
}

impl Connection for JsonConnection {
    type ExpenseRepository = ExpenseRepository;
    type SummaryRepository = SummaryRepository;
    type QueueRepository = QueueRepository;

    fn create_expense_repository(&self) -> ExpenseRepository {
        ExpenseRepository::new(self.clone())
    }

    fn create_summary_repository(&self) -> SummaryRepository {
        SummaryRepository::new(self.clone())
    }

    fn create_queue_repository(&self) -> QueueRepository {
        QueueRepository::new(self.clone())
    }

    fn run_transaction(
        &self,
        user_id: &str,
        body: &mut dyn FnMut(&mut dyn TransactionContext) -> Result<Option<String>>,
    ) -> Result<Option<String>> {
        let mut transaction = JsonTransaction::new(self.clone(), user_id);
        let value = body(&mut transaction)?;
        transaction.commit()?;
        Ok(value)
    }
}
