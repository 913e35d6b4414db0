//! Error taxonomy exposed at the domain boundary.
//!
//! The storage layer stays on `anyhow::Result`; the services downcast domain
//! errors back out of `anyhow` where a transaction body produced them, so a
//! missing summary surfaces as `NotFound` and not as a generic transaction
//! failure.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    /// Missing or unparseable required input field. Never retried.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A document that must exist is absent; stale client state or a prior
    /// invariant violation. Surfaced, not retried.
    #[error("{0}")]
    NotFound(String),

    /// The operation has no offline path and the client is disconnected.
    #[error("Cannot {operation} while offline")]
    Offline { operation: &'static str },

    /// The underlying store transaction failed (conflict or transient
    /// failure). The caller may retry the whole operation.
    #[error("Transaction failed: {0}")]
    Transaction(anyhow::Error),

    /// External media processing did not finish within the bounded poll.
    #[error("Media processing did not complete after {attempts} attempts")]
    Timeout { attempts: u32 },
}

impl WalletError {
    /// Recover a typed domain error that crossed the `anyhow` transaction
    /// boundary; anything else is a store-level transaction failure.
    pub fn from_transaction_failure(err: anyhow::Error) -> Self {
        match err.downcast::<WalletError>() {
            Ok(domain_err) => domain_err,
            Err(other) => WalletError::Transaction(other),
        }
    }
}
