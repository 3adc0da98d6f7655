//! Calendar date helpers.

use chrono::{Datelike, Days, Local, NaiveDate};

/// Parse the calendar day out of a date string.
///
/// Accepts:
/// - YYYY-MM-DD
/// - RFC3339 datetime (local date part is kept)
/// - Naive datetime YYYY-MM-DDTHH:MM:SS
pub fn parse_calendar_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(ndt.date());
    }
    None
}

/// Monday and Sunday of the week containing `date`.
pub fn week_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let offset = u64::from(date.weekday().num_days_from_monday());
    let monday = date.checked_sub_days(Days::new(offset)).unwrap_or(NaiveDate::MIN);
    let sunday = monday.checked_add_days(Days::new(6)).unwrap_or(NaiveDate::MAX);
    (monday, sunday)
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parse_calendar_date_accepts_date_only() {
        assert_eq!(parse_calendar_date("2024-03-01"), Some(ymd(2024, 3, 1)));
    }

    #[test]
    fn parse_calendar_date_keeps_date_of_datetime() {
        assert_eq!(parse_calendar_date("2024-03-01T10:30:00"), Some(ymd(2024, 3, 1)));
    }

    #[test]
    fn parse_calendar_date_uses_offset_local_date() {
        assert_eq!(
            parse_calendar_date("2024-03-01T23:30:00-05:00"),
            Some(ymd(2024, 3, 1))
        );
        assert_eq!(parse_calendar_date("2024-03-01T10:30:00Z"), Some(ymd(2024, 3, 1)));
    }

    #[test]
    fn parse_calendar_date_rejects_invalid() {
        assert!(parse_calendar_date("not-a-date").is_none());
        assert!(parse_calendar_date("2024-02-30").is_none());
    }

    #[test]
    fn week_bounds_run_monday_to_sunday() {
        // 2024-03-06 is a Wednesday
        assert_eq!(week_bounds(ymd(2024, 3, 6)), (ymd(2024, 3, 4), ymd(2024, 3, 10)));
        assert_eq!(week_bounds(ymd(2024, 3, 4)), (ymd(2024, 3, 4), ymd(2024, 3, 10)));
        assert_eq!(week_bounds(ymd(2024, 3, 10)), (ymd(2024, 3, 4), ymd(2024, 3, 10)));
    }
}
