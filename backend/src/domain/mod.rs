//! Domain layer: the aggregation engine and its collaborators.

pub mod calendar;
pub mod category_cache;
pub mod clock;
pub mod connectivity;
pub mod dashboard_service;
pub mod errors;
pub mod expense_service;
pub mod ingest_service;
pub mod models;
pub mod normalize;
pub mod sync_service;

pub use category_cache::CategoryCache;
pub use clock::{Clock, SystemClock};
pub use connectivity::{MutationKind, NetworkMonitor};
pub use dashboard_service::DashboardService;
pub use errors::WalletError;
pub use expense_service::ExpenseService;
pub use ingest_service::{IngestService, MediaProcessingProbe};
pub use sync_service::{SyncReport, SyncService};
