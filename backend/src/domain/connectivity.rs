//! Connectivity state and the offline capability policy.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Which expense mutation is being attempted. The offline capability of each
/// kind lives here so the online/offline decision is auditable in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl MutationKind {
    /// Creates degrade to the durable local queue; updates and deletes have
    /// no offline reconciliation path and must fail fast.
    pub fn offline_capable(self) -> bool {
        matches!(self, MutationKind::Create)
    }

    /// Operation name used in offline error messages.
    pub fn operation_name(self) -> &'static str {
        match self {
            MutationKind::Create => "create expense",
            MutationKind::Update => "update expense",
            MutationKind::Delete => "delete expense",
        }
    }
}

/// Shared view of the client's connectivity, fed by the host's online/offline
/// events. Defaults to online, matching the browser's initial assumption.
#[derive(Debug, Clone)]
pub struct NetworkMonitor {
    online: Arc<AtomicBool>,
}

impl NetworkMonitor {
    pub fn new() -> Self {
        NetworkMonitor {
            online: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        NetworkMonitor::new()
    }
}
