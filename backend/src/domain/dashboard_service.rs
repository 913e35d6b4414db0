//! Read model feeding the spending dashboards.
//!
//! Pure queries over the expense and summary stores; no rendering concerns.

use anyhow::Result;
use chrono::{DateTime, Datelike, Utc};
use log::debug;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::calendar::{month_label, shift_months_back, year_month_of};
use super::models::{Expense, MonthlySummary};
use crate::storage::traits::{Connection, ExpenseStorage, SummaryStorage};

/// How many recent expenses the dashboard shows.
const RECENT_EXPENSE_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
    /// Share of the month's total, 0-100
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyTotal {
    pub day: u32,
    pub total: f64,
    /// Average amount per expense on that day
    pub avg_amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthTotal {
    /// Label like "Mar 2024"
    pub month: String,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendPoint {
    pub month: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardData {
    pub current_month_total: f64,
    pub previous_month_total: f64,
    /// Month-over-month change in percent; 0 when the previous month is empty
    pub monthly_change: f64,
    pub category_totals: Vec<CategoryTotal>,
    pub daily_totals: Vec<DailyTotal>,
    pub recent_expenses: Vec<Expense>,
    pub monthly_summary: Option<MonthlySummary>,
}

#[derive(Clone)]
pub struct DashboardService<C: Connection> {
    expense_repository: C::ExpenseRepository,
    summary_repository: C::SummaryRepository,
}

impl<C: Connection> DashboardService<C> {
    pub fn new(connection: Arc<C>) -> Self {
        Self {
            expense_repository: connection.create_expense_repository(),
            summary_repository: connection.create_summary_repository(),
        }
    }

    /// Everything the dashboard needs for one selected month.
    pub fn fetch_dashboard_data(
        &self,
        user_id: &str,
        selected_date: DateTime<Utc>,
    ) -> Result<DashboardData> {
        let current_month = year_month_of(&selected_date);
        let (previous_year, previous_month) =
            shift_months_back(selected_date.year(), selected_date.month(), 1);
        let previous_key = format!("{:04}-{:02}", previous_year, previous_month);

        let current_summary = self.summary_repository.get_summary(user_id, &current_month)?;
        let previous_summary = self.summary_repository.get_summary(user_id, &previous_key)?;

        let month_expenses = self
            .expense_repository
            .query_by_year_month(user_id, &current_month)?;

        // Per-day totals with per-expense averages
        let mut per_day: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
        for expense in &month_expenses {
            let slot = per_day.entry(expense.day).or_insert((0.0, 0));
            slot.0 += expense.amount;
            slot.1 += 1;
        }
        let daily_totals: Vec<DailyTotal> = per_day
            .into_iter()
            .map(|(day, (total, count))| DailyTotal {
                day,
                total,
                avg_amount: total / count as f64,
            })
            .collect();

        let recent_expenses = self
            .expense_repository
            .query_recent(user_id, RECENT_EXPENSE_LIMIT)?;

        let category_totals = match &current_summary {
            Some(summary) => summary
                .category_breakdown
                .iter()
                .map(|(category, total)| CategoryTotal {
                    category: category.clone(),
                    total: *total,
                    percentage: (total / summary.total_amount) * 100.0,
                })
                .collect(),
            None => Vec::new(),
        };

        let current_month_total = current_summary
            .as_ref()
            .map(|s| s.total_amount)
            .unwrap_or(0.0);
        let previous_month_total = previous_summary
            .as_ref()
            .map(|s| s.total_amount)
            .unwrap_or(0.0);
        let monthly_change = if previous_month_total != 0.0 {
            ((current_month_total - previous_month_total) / previous_month_total) * 100.0
        } else {
            0.0
        };

        debug!(
            "Dashboard for user {} month {}: total {}, {} daily buckets",
            user_id,
            current_month,
            current_month_total,
            daily_totals.len()
        );

        Ok(DashboardData {
            current_month_total,
            previous_month_total,
            monthly_change,
            category_totals,
            daily_totals,
            recent_expenses,
            monthly_summary: current_summary,
        })
    }

    /// Month totals for the last `months` months, oldest first; absent
    /// summaries count as zero so the series has no gaps.
    pub fn fetch_monthly_comparison(
        &self,
        user_id: &str,
        months: u32,
        today: DateTime<Utc>,
    ) -> Result<Vec<MonthTotal>> {
        let mut result = Vec::new();
        for offset in 0..months {
            let (year, month) = shift_months_back(today.year(), today.month(), offset);
            let key = format!("{:04}-{:02}", year, month);
            let total = self
                .summary_repository
                .get_summary(user_id, &key)?
                .map(|summary| summary.total_amount)
                .unwrap_or(0.0);
            result.push(MonthTotal {
                month: month_label(year, month)?,
                total,
            });
        }
        result.reverse();
        Ok(result)
    }

    /// Per-category amount series across the last `months` months, oldest
    /// first. Months without a summary are skipped, not zero-filled.
    pub fn fetch_category_trends(
        &self,
        user_id: &str,
        months: u32,
        today: DateTime<Utc>,
    ) -> Result<BTreeMap<String, Vec<TrendPoint>>> {
        let mut trends: BTreeMap<String, Vec<TrendPoint>> = BTreeMap::new();

        for offset in (0..months).rev() {
            let (year, month) = shift_months_back(today.year(), today.month(), offset);
            let key = format!("{:04}-{:02}", year, month);
            let Some(summary) = self.summary_repository.get_summary(user_id, &key)? else {
                continue;
            };
            let label = month_label(year, month)?;
            for (category, amount) in &summary.category_breakdown {
                trends
                    .entry(category.clone())
                    .or_default()
                    .push(TrendPoint {
                        month: label.clone(),
                        amount: *amount,
                    });
            }
        }

        Ok(trends)
    }
}
