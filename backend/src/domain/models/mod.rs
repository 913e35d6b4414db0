pub mod expense;
pub mod pending_expense;
pub mod summary;

pub use expense::{Expense, NewExpense};
pub use pending_expense::{PendingExpense, PendingStatus};
pub use summary::{MonthlySummary, SummaryDelta};
