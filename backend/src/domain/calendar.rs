//! Calendar arithmetic shared by the aggregation and dashboard paths.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Datelike, NaiveDate, Utc};

/// Number of calendar days in the given month, accounting for leap years.
pub fn days_in_month(year: i32, month: u32) -> Result<u32> {
    let days = match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if year % 4 == 0 && (year % 100 != 0 || year % 400 == 0) {
                29
            } else {
                28
            }
        }
        _ => return Err(anyhow!("Invalid month: {}", month)),
    };
    Ok(days)
}

/// Format a timestamp as the "YYYY-MM" sharding key.
pub fn year_month_of(date: &DateTime<Utc>) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Parse a "YYYY-MM" key into (year, month).
pub fn parse_year_month(year_month: &str) -> Result<(i32, u32)> {
    let (year_part, month_part) = year_month
        .split_once('-')
        .ok_or_else(|| anyhow!("Invalid yearMonth key: {}", year_month))?;
    let year: i32 = year_part
        .parse()
        .map_err(|_| anyhow!("Invalid year in yearMonth key: {}", year_month))?;
    let month: u32 = month_part
        .parse()
        .map_err(|_| anyhow!("Invalid month in yearMonth key: {}", year_month))?;
    if !(1..=12).contains(&month) {
        return Err(anyhow!("Invalid month in yearMonth key: {}", year_month));
    }
    Ok((year, month))
}

/// Calendar days in the month named by a "YYYY-MM" key.
pub fn days_in_year_month(year_month: &str) -> Result<u32> {
    let (year, month) = parse_year_month(year_month)?;
    days_in_month(year, month)
}

/// Shift a (year, month) pair backwards by `months_back` whole months.
pub fn shift_months_back(year: i32, month: u32, months_back: u32) -> (i32, u32) {
    let total = year as i64 * 12 + (month as i64 - 1) - months_back as i64;
    let year = total.div_euclid(12) as i32;
    let month = total.rem_euclid(12) as u32 + 1;
    (year, month)
}

/// Human month label for dashboard series, e.g. "Mar 2024".
pub fn month_label(year: i32, month: u32) -> Result<String> {
    let date = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| anyhow!("Invalid date: {}/{}", month, year))?;
    Ok(date.format("%b %Y").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 3).unwrap(), 31);
        assert_eq!(days_in_month(2024, 4).unwrap(), 30);
        // 2024 is a leap year, 2023 and 1900 are not, 2000 is
        assert_eq!(days_in_month(2024, 2).unwrap(), 29);
        assert_eq!(days_in_month(2023, 2).unwrap(), 28);
        assert_eq!(days_in_month(1900, 2).unwrap(), 28);
        assert_eq!(days_in_month(2000, 2).unwrap(), 29);
        assert!(days_in_month(2024, 13).is_err());
    }

    #[test]
    fn test_year_month_round_trip() {
        let date = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let key = year_month_of(&date);
        assert_eq!(key, "2024-03");
        assert_eq!(parse_year_month(&key).unwrap(), (2024, 3));
        assert_eq!(days_in_year_month(&key).unwrap(), 31);
        assert!(parse_year_month("2024-00").is_err());
        assert!(parse_year_month("202403").is_err());
    }

    #[test]
    fn test_shift_months_back_crosses_year_boundary() {
        assert_eq!(shift_months_back(2024, 3, 0), (2024, 3));
        assert_eq!(shift_months_back(2024, 3, 1), (2024, 2));
        assert_eq!(shift_months_back(2024, 3, 3), (2023, 12));
        assert_eq!(shift_months_back(2024, 1, 13), (2022, 12));
    }

    #[test]
    fn test_month_label() {
        assert_eq!(month_label(2024, 3).unwrap(), "Mar 2024");
        assert_eq!(month_label(2023, 12).unwrap(), "Dec 2023");
    }
}
