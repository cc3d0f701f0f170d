//! Date utilities
//!
//! Contribution dates are calendar dates (no time of day). Basemap dates are
//! one or two ISO dates joined by a comma when a slump was delineated across
//! imagery from a date range.

use chrono::{NaiveDate, NaiveDateTime, Utc};

/// Accepted date layouts, tried in order
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

/// Get current UTC calendar date
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Parse a single date token
///
/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, `YYYYMMDD` and ISO datetimes
/// (`YYYY-MM-DDTHH:MM:SS`, time discarded).
pub fn parse_date(token: &str) -> Option<NaiveDate> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(token, format) {
            return Some(date);
        }
    }

    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(token, format).ok())
        .map(|dt| dt.date())
}

/// Parse a comma-joined date list
///
/// Returns `None` when any token fails to parse or the list is empty.
pub fn parse_date_list(value: &str) -> Option<Vec<NaiveDate>> {
    let dates: Option<Vec<NaiveDate>> = value
        .split(',')
        .filter(|token| !token.trim().is_empty())
        .map(parse_date)
        .collect();

    dates.filter(|d| !d.is_empty())
}

/// Format a date as `YYYY-MM-DD`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_today_is_recent() {
        let date = today();
        assert!(date > NaiveDate::from_ymd_opt(2000, 1, 1).unwrap());
        assert!(date < NaiveDate::from_ymd_opt(2100, 1, 1).unwrap());
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2021, 7, 15).unwrap();
        assert_eq!(parse_date("2021-07-15"), Some(expected));
        assert_eq!(parse_date(" 2021/07/15 "), Some(expected));
        assert_eq!(parse_date("20210715"), Some(expected));
        assert_eq!(parse_date("2021-07-15T10:30:00"), Some(expected));
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("July 2021"), None);
        assert_eq!(parse_date("2021-13-01"), None);
    }

    #[test]
    fn test_parse_date_list() {
        let dates = parse_date_list("2019-08-01,2020-08-15").unwrap();
        assert_eq!(dates.len(), 2);
        assert_eq!(dates[0], NaiveDate::from_ymd_opt(2019, 8, 1).unwrap());

        assert_eq!(parse_date_list("2019-08-01").unwrap().len(), 1);
        assert!(parse_date_list("").is_none());
        assert!(parse_date_list("2019-08-01,not-a-date").is_none());
    }

    #[test]
    fn test_format_date() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(format_date(date), "2024-01-05");
    }
}
