//! Single normalization step for raw expense input.
//!
//! Every entry point (manual form, LLM candidates, offline replay) goes
//! through this function, so defaulting is applied identically everywhere.

use chrono::{DateTime, Datelike, Utc};
use shared::ExpenseInput;

use super::calendar::year_month_of;
use super::errors::WalletError;
use super::models::NewExpense;

/// Validate required fields, apply defaults and derive the month key.
///
/// Required: non-empty `category`, non-empty `name`, `total` parsing to a
/// non-negative number. Defaults: quantity 1 (when absent, unparseable or
/// not positive), unit "unit", empty description, date = `now`.
pub fn normalize_expense_input(
    input: &ExpenseInput,
    now: DateTime<Utc>,
) -> Result<NewExpense, WalletError> {
    let category = input.category.trim();
    if category.is_empty() {
        return Err(WalletError::Validation("Category is required".to_string()));
    }

    let name = input.name.trim();
    if name.is_empty() {
        return Err(WalletError::Validation("Name is required".to_string()));
    }

    let amount = input
        .total
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite() && *amount >= 0.0)
        .ok_or_else(|| {
            WalletError::Validation(format!("Amount '{}' is not a valid number", input.total))
        })?;

    let quantity = input
        .quantity
        .as_deref()
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .filter(|quantity| quantity.is_finite() && *quantity > 0.0)
        .unwrap_or(1.0);

    let unit = input
        .unit
        .as_deref()
        .map(str::trim)
        .filter(|unit| !unit.is_empty())
        .unwrap_or("unit")
        .to_string();

    let description = input.description.clone().unwrap_or_default();

    let date = input.date.unwrap_or(now);

    Ok(NewExpense {
        category: category.to_string(),
        name: name.to_string(),
        quantity,
        unit,
        amount,
        description,
        date,
        year_month: year_month_of(&date),
        day: date.day(),
    })
}
