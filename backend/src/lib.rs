//! # Wallet Tracker Backend
//!
//! Core library of the expense-tracking application: the monthly-summary
//! aggregation engine, the offline queue with its sync manager, the category
//! cache and the dashboard read model, over a transactional JSON document
//! store. The UI layer, authentication and the LLM parsing service are
//! external collaborators; this crate exposes the services they call.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

pub mod domain;
pub mod storage;

pub use domain::{NetworkMonitor, WalletError};
pub use storage::JsonConnection;

use domain::clock::{system_clock, Clock};
use domain::{DashboardService, ExpenseService, IngestService, SyncService};

/// Main backend struct that orchestrates all services.
pub struct Backend {
    pub expense_service: ExpenseService<JsonConnection>,
    pub sync_service: SyncService<JsonConnection>,
    pub dashboard_service: DashboardService<JsonConnection>,
    pub ingest_service: IngestService<JsonConnection>,
    pub network: NetworkMonitor,
}

impl Backend {
    /// Create a backend over the given data directory with the system clock.
    pub fn new<P: AsRef<Path>>(data_directory: P) -> Result<Self> {
        Self::with_clock(data_directory, system_clock())
    }

    /// Create a backend with an injected clock (tests drive cache expiry and
    /// sync intervals through this).
    pub fn with_clock<P: AsRef<Path>>(data_directory: P, clock: Arc<dyn Clock>) -> Result<Self> {
        let connection = Arc::new(JsonConnection::new(data_directory)?);
        let network = NetworkMonitor::new();

        let expense_service =
            ExpenseService::new(connection.clone(), network.clone(), clock.clone());
        let sync_service = SyncService::new(
            connection.clone(),
            expense_service.clone(),
            network.clone(),
            clock,
        );
        let dashboard_service = DashboardService::new(connection);
        let ingest_service = IngestService::new(expense_service.clone());

        Ok(Backend {
            expense_service,
            sync_service,
            dashboard_service,
            ingest_service,
            network,
        })
    }
}
