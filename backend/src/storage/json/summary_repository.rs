//! Read-side repository over the per-user monthly summary documents.

use anyhow::Result;
use log::warn;
use std::fs;

use crate::domain::models::MonthlySummary;
use crate::storage::json::connection::JsonConnection;
use crate::storage::traits::SummaryStorage;

#[derive(Clone)]
pub struct SummaryRepository {
    connection: JsonConnection,
}

impl SummaryRepository {
    pub fn new(connection: JsonConnection) -> Self {
        Self { connection }
    }
}

impl SummaryStorage for SummaryRepository {
    fn get_summary(&self, user_id: &str, year_month: &str) -> Result<Option<MonthlySummary>> {
        let path = self.connection.summary_path(user_id, year_month);
        match self.connection.read_document(&path)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn list_summaries(&self, user_id: &str) -> Result<Vec<(String, MonthlySummary)>> {
        let dir = self.connection.summaries_directory(user_id);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut summaries = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let year_month = match path.file_stem().and_then(|stem| stem.to_str()) {
                Some(stem) => stem.to_string(),
                None => continue,
            };
            let bytes = fs::read(&path)?;
            match serde_json::from_slice::<MonthlySummary>(&bytes) {
                Ok(summary) => summaries.push((year_month, summary)),
                Err(err) => {
                    warn!("Skipping unreadable summary document {:?}: {}", path, err);
                }
            }
        }

        summaries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::json::test_utils::test_connection;
    use crate::storage::traits::Connection;

    fn store_summary(connection: &JsonConnection, user_id: &str, year_month: &str, total: f64) {
        let mut summary = MonthlySummary::empty();
        summary.total_amount = total;
        summary
            .category_breakdown
            .insert("food".to_string(), total);
        summary.expense_count = 1;
        connection
            .run_transaction(user_id, &mut |tx| {
                tx.put_summary(year_month, &summary)?;
                Ok(None)
            })
            .unwrap();
    }

    #[test]
    fn get_summary_returns_none_until_created() {
        let (connection, _temp_dir) = test_connection();
        let repository = SummaryRepository::new(connection.clone());

        assert!(repository.get_summary("user-1", "2024-03").unwrap().is_none());

        store_summary(&connection, "user-1", "2024-03", 100.0);
        let summary = repository
            .get_summary("user-1", "2024-03")
            .unwrap()
            .expect("summary should exist");
        assert_eq!(summary.total_amount, 100.0);
    }

    #[test]
    fn list_summaries_returns_months_in_key_order() {
        let (connection, _temp_dir) = test_connection();
        let repository = SummaryRepository::new(connection.clone());

        store_summary(&connection, "user-1", "2024-03", 300.0);
        store_summary(&connection, "user-1", "2023-12", 120.0);
        store_summary(&connection, "user-1", "2024-01", 100.0);

        let summaries = repository.list_summaries("user-1").unwrap();
        let keys: Vec<&str> = summaries.iter().map(|(key, _)| key.as_str()).collect();
        assert_eq!(keys, vec!["2023-12", "2024-01", "2024-03"]);
    }
}
