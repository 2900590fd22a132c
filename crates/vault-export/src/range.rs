use chrono::{Months, NaiveDate, TimeDelta};
use std::str::FromStr;
use vault_core::{DateRange, Result, VaultError};

/// Date ranges an operator can pick for an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRangePreset {
    Last7Days,
    LastMonth,
    Last6Months,
    Custom { start: NaiveDate, end: NaiveDate },
}

impl DateRangePreset {
    /// Resolve against `today` and check it stays within `max_months`.
    pub fn resolve(&self, today: NaiveDate, max_months: u32) -> Result<DateRange> {
        let range = match *self {
            DateRangePreset::Last7Days => DateRange::new(today - TimeDelta::days(7), today),
            DateRangePreset::LastMonth => DateRange::new(months_before(today, 1)?, today),
            DateRangePreset::Last6Months => DateRange::new(months_before(today, 6)?, today),
            DateRangePreset::Custom { start, end } => DateRange::new(start, end),
        };

        validate_range(&range, today, max_months)?;
        Ok(range)
    }
}

impl FromStr for DateRangePreset {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "7days" => Ok(DateRangePreset::Last7Days),
            "1month" => Ok(DateRangePreset::LastMonth),
            "6months" => Ok(DateRangePreset::Last6Months),
            other => Err(VaultError::DateRangeError(format!(
                "Unknown range '{}', expected 7days, 1month or 6months",
                other
            ))),
        }
    }
}

fn months_before(date: NaiveDate, months: u32) -> Result<NaiveDate> {
    date.checked_sub_months(Months::new(months))
        .ok_or_else(|| VaultError::DateRangeError(format!("Cannot go back {} months", months)))
}

pub fn validate_range(range: &DateRange, today: NaiveDate, max_months: u32) -> Result<()> {
    if range.end < range.start {
        return Err(VaultError::DateRangeError(
            "End date must not be before start date".into(),
        ));
    }

    if range.start < months_before(range.end, max_months)? {
        return Err(VaultError::DateRangeError(format!(
            "Date range cannot exceed {} months. Please contact support for larger exports.",
            max_months
        )));
    }

    let earliest = months_before(today, max_months)?;
    if range.start < earliest {
        return Err(VaultError::DateRangeError(format!(
            "Start date cannot be earlier than {}. Please contact support for older data.",
            earliest
        )));
    }

    Ok(())
}
