pub mod json;
pub mod traits;

pub use json::JsonConnection;
pub use traits::{
    Connection, ExpenseStorage, PendingQueueStorage, SummaryStorage, TransactionContext,
};
