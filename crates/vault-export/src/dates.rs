use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tracing::warn;
use vault_core::DateValue;

/// `Mon DD, YYYY, HH:MM:SS AM/PM`
const CSV_DATE_FORMAT: &str = "%b %d, %Y, %I:%M:%S %p";

/// Digit strings up to this length are calendar values, not epoch millis.
const MAX_CALENDAR_DIGITS: usize = 8;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

pub fn parse_date(value: &DateValue) -> Option<DateTime<Utc>> {
    match value {
        DateValue::Millis(ms) => DateTime::from_timestamp_millis(*ms),
        DateValue::Text(text) => parse_text(text.trim()),
    }
}

fn parse_text(text: &str) -> Option<DateTime<Utc>> {
    if text.is_empty() {
        return None;
    }
    if text.bytes().all(|b| b.is_ascii_digit()) {
        return parse_digits(text);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
}

fn parse_digits(text: &str) -> Option<DateTime<Utc>> {
    if text.len() > MAX_CALENDAR_DIGITS {
        let ms = text.parse::<i64>().ok()?;
        return DateTime::from_timestamp_millis(ms);
    }
    if text.len() == 4 {
        let year = text.parse::<i32>().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1)
            .map(|date| date.and_time(NaiveTime::MIN).and_utc());
    }
    None
}

/// Date cell for a CSV row. Absent or unparseable dates render empty.
pub fn format_csv_date(value: Option<&DateValue>) -> String {
    let Some(value) = value else {
        return String::new();
    };

    match parse_date(value) {
        Some(dt) => dt.format(CSV_DATE_FORMAT).to_string(),
        None => {
            warn!("Unparseable message date {:?}, leaving cell empty", value);
            String::new()
        }
    }
}
