//! Read-side repository over the per-user expense documents.

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::warn;
use std::fs;

use crate::domain::models::Expense;
use crate::storage::json::connection::JsonConnection;
use crate::storage::traits::ExpenseStorage;

#[derive(Clone)]
pub struct ExpenseRepository {
    connection: JsonConnection,
}

impl ExpenseRepository {
    pub fn new(connection: JsonConnection) -> Self {
        Self { connection }
    }

    /// Read every expense document of one user. Documents that fail to parse
    /// are skipped with a warning rather than failing the whole query.
    fn read_all(&self, user_id: &str) -> Result<Vec<Expense>> {
        let dir = self.connection.expenses_directory(user_id);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut expenses = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let bytes = fs::read(&path)?;
            match serde_json::from_slice::<Expense>(&bytes) {
                Ok(expense) => expenses.push(expense),
                Err(err) => {
                    warn!("Skipping unreadable expense document {:?}: {}", path, err);
                }
            }
        }
        Ok(expenses)
    }
}

impl ExpenseStorage for ExpenseRepository {
    fn get_expense(&self, user_id: &str, expense_id: &str) -> Result<Option<Expense>> {
        let path = self.connection.expense_path(user_id, expense_id);
        match self.connection.read_document(&path)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn query_recent(&self, user_id: &str, limit: usize) -> Result<Vec<Expense>> {
        let mut expenses = self.read_all(user_id)?;
        expenses.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
        expenses.truncate(limit);
        Ok(expenses)
    }

    fn query_by_year_month(&self, user_id: &str, year_month: &str) -> Result<Vec<Expense>> {
        let mut expenses = self.read_all(user_id)?;
        expenses.retain(|expense| expense.year_month == year_month);
        expenses.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        Ok(expenses)
    }

    fn query_by_date_range(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Expense>> {
        let mut expenses = self.read_all(user_id)?;
        expenses.retain(|expense| expense.date >= from && expense.date <= to);
        expenses.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        Ok(expenses)
    }
}
