//! Daily rate and projected balance.
//!
//! The first record is the current balance snapshot; every later record
//! is a recharge. The recharge total spread over the span between the
//! first and last record gives the daily rate, which is then projected
//! forward from the snapshot to today.

use chrono::{Local, NaiveDate, NaiveDateTime};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use tracing::{debug, error, warn};

use super::parse_record_date;
use crate::types::{Estimation, TransactionRecord, UsageEstimate};

/// Fixed amount added to every projection, on top of the correction.
pub const BALANCE_BIAS: f64 = 10.0;

const SECS_PER_DAY: i64 = 86_400;

/// Estimate usage as of today (local time).
pub fn calculate_usage(records: &[TransactionRecord], correction: f64) -> Estimation {
    calculate_usage_on(records, correction, Local::now().date_naive())
}

/// Estimate usage as of a given day.
pub fn calculate_usage_on(
    records: &[TransactionRecord],
    correction: f64,
    today: NaiveDate,
) -> Estimation {
    let (first, last) = match records {
        [] => {
            warn!("No data available to calculate gas usage");
            return Estimation::EmptyInput;
        }
        [_] => {
            warn!(count = 1, "Insufficient data to calculate gas usage, need at least 2 records");
            return Estimation::InsufficientData { count: 1 };
        }
        [first, .., last] => (first, last),
    };

    let Some(first_date) = parse_record_date(&first.date) else {
        error!(first = %first.date, last = %last.date, "Date parsing error on first record");
        return Estimation::MalformedRecord {
            date: first.date.clone(),
        };
    };
    let Some(last_date) = parse_record_date(&last.date) else {
        error!(first = %first.date, last = %last.date, "Date parsing error on last record");
        return Estimation::MalformedRecord {
            date: last.date.clone(),
        };
    };
    debug!(%first_date, %last_date, "Estimation window");

    let span = whole_days(last_date, first_date);
    let span_days = if span == 0 { 1 } else { span.abs() };

    let total_recharge: f64 = records[1..].iter().map(|r| r.cost).sum();
    let daily_rate = total_recharge / span_days as f64;

    let midnight = today.and_hms_opt(0, 0, 0).unwrap_or_default();
    let days_since_first = whole_days(midnight, first_date).abs();

    // The correction is applied to the base and again to the projection.
    let base = first.cost + correction;
    let projected = base - daily_rate * days_since_first as f64 + BALANCE_BIAS + correction;
    let days = if daily_rate > 0.0 {
        projected / daily_rate
    } else {
        0.0
    };

    if !daily_rate.is_finite() || !projected.is_finite() || !days.is_finite() {
        error!(daily_rate, projected, "Error calculating gas usage: non-finite value");
        return Estimation::ArithmeticFailure;
    }

    let (Some(daily_rate), Some(projected_balance)) = (round_money(daily_rate), round_money(projected))
    else {
        error!(daily_rate, projected, "Error calculating gas usage: rounding failed");
        return Estimation::ArithmeticFailure;
    };

    let estimate = UsageEstimate {
        daily_rate,
        projected_balance,
        estimated_days: days.trunc() as i64,
        raw_records: records.to_vec(),
    };
    debug!(
        span_days,
        days_since_first,
        total_recharge,
        daily_rate = estimate.daily_rate,
        balance = estimate.projected_balance,
        days = estimate.estimated_days,
        "Gas usage calculated"
    );
    Estimation::Ready(estimate)
}

/// Whole days from `from` to `to`, floored like calendar arithmetic on
/// timestamps (a negative partial day counts as a full negative day).
fn whole_days(to: NaiveDateTime, from: NaiveDateTime) -> i64 {
    (to - from).num_seconds().div_euclid(SECS_PER_DAY)
}

/// Round to cents, half-to-even on the exact binary value, so 2.675
/// (stored as 2.67499...) rounds down.
fn round_money(value: f64) -> Option<f64> {
    Decimal::from_f64_retain(value)
        .or_else(|| Decimal::from_f64(value))?
        .round_dp(2)
        .to_f64()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
