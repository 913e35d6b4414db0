//! # JSON Document Storage
//!
//! File-per-document JSON implementation of the storage traits. Each user
//! gets a directory of expense documents and a directory of monthly summary
//! documents; the offline queue is a single durable file beside them. All
//! writes go through an atomic temp-file-then-rename, and multi-document
//! mutations go through the optimistic transaction in [`transaction`].

pub mod connection;
pub mod expense_repository;
pub mod queue_repository;
pub mod summary_repository;
pub mod transaction;

#[cfg(test)]
pub mod test_utils;

pub use connection::JsonConnection;
pub use expense_repository::ExpenseRepository;
pub use queue_repository::QueueRepository;
pub use summary_repository::SummaryRepository;
