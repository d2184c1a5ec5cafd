//! Balance estimation.
//!
//! Two stages run on every poll:
//! 1. `cleaner`: normalise the raw API payload into ordered records
//! 2. `calculator`: derive a daily rate and projected balance
//!
//! Neither stage fails; bad input degrades to an empty dataset or to a
//! non-`Ready` [`Estimation`](crate::types::Estimation).

pub mod calculator;
pub mod cleaner;

use chrono::{NaiveDate, NaiveDateTime};

pub use calculator::{calculate_usage, calculate_usage_on};
pub use cleaner::clean_records;

/// Accepted date-only format.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Accepted date-with-time format.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a ledger date, trying the date-only format first.
///
/// Date-only values resolve to midnight. Every field must be plain ASCII
/// digits: chrono alone would also take a signed year or whitespace in
/// front of a number.
pub fn parse_record_date(value: &str) -> Option<NaiveDateTime> {
    if !has_digit_fields(value) {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, DATE_FORMAT) {
        return date.and_hms_opt(0, 0, 0);
    }
    NaiveDateTime::parse_from_str(value, DATETIME_FORMAT).ok()
}

/// `Y-M-D` with an optional `h:m:s` after a whitespace run. Four-digit
/// year, one or two digits for every other field.
fn has_digit_fields(value: &str) -> bool {
    fn digits(field: &str, min: usize, max: usize) -> bool {
        (min..=max).contains(&field.len()) && field.bytes().all(|b| b.is_ascii_digit())
    }

    let (date, time) = match value.split_once(char::is_whitespace) {
        Some((date, rest)) => (date, Some(rest.trim_start())),
        None => (value, None),
    };

    let date_ok = matches!(
        date.split('-').collect::<Vec<_>>()[..],
        [y, m, d] if digits(y, 4, 4) && digits(m, 1, 2) && digits(d, 1, 2)
    );
    let time_ok = time.map_or(true, |time| {
        matches!(
            time.split(':').collect::<Vec<_>>()[..],
            [h, m, s] if digits(h, 1, 2) && digits(m, 1, 2) && digits(s, 1, 2)
        )
    });
    date_ok && time_ok
}
