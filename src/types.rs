//! Shared types for the gas balance estimator.
//!
//! Records, estimates and the fetch result flow from the client through
//! the coordinator to the sensor view and the dashboard, so they live
//! here to avoid circular module dependencies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Transaction records
// ---------------------------------------------------------------------------

/// One cleaned transaction from the account ledger.
///
/// Serialized with the upstream field names (`dt`, `fee`) so a cleaned
/// dataset can be fed back through the cleaner unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Original date string, `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS`.
    #[serde(rename = "dt")]
    pub date: String,
    /// Signed monetary amount.
    #[serde(rename = "fee")]
    pub cost: f64,
}

impl TransactionRecord {
    pub fn new(date: impl Into<String>, cost: f64) -> Self {
        Self {
            date: date.into(),
            cost,
        }
    }
}

impl fmt::Display for TransactionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ¥{:.2}", self.date, self.cost)
    }
}

// ---------------------------------------------------------------------------
// Estimates
// ---------------------------------------------------------------------------

/// Balance projection derived from a cleaned dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageEstimate {
    /// Average spend per day, rounded to 2 decimals.
    pub daily_rate: f64,
    /// Estimated balance remaining today, rounded to 2 decimals.
    pub projected_balance: f64,
    /// Days of supply left at the current rate (truncated).
    pub estimated_days: i64,
    /// The cleaned dataset the estimate was computed from.
    pub raw_records: Vec<TransactionRecord>,
}

/// Outcome of running the usage calculator.
///
/// Every variant except `Ready` is a degraded result: the estimator never
/// fails, it just has nothing to report this cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Estimation {
    Ready(UsageEstimate),
    /// No records at all.
    EmptyInput,
    /// Fewer than two records.
    InsufficientData { count: usize },
    /// The first or last record's date could not be parsed.
    MalformedRecord { date: String },
    /// A non-finite value turned up in the arithmetic.
    ArithmeticFailure,
}

impl Estimation {
    /// Collapse to the optional estimate the sensor consumes.
    pub fn into_usage(self) -> Option<UsageEstimate> {
        match self {
            Estimation::Ready(usage) => Some(usage),
            _ => None,
        }
    }
}

impl fmt::Display for Estimation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Estimation::Ready(u) => write!(
                f,
                "¥{:.2}/day, balance ¥{:.2}, {} days left",
                u.daily_rate, u.projected_balance, u.estimated_days
            ),
            Estimation::EmptyInput => write!(f, "no records"),
            Estimation::InsufficientData { count } => {
                write!(f, "insufficient data ({count} record(s), need 2)")
            }
            Estimation::MalformedRecord { date } => write!(f, "unparseable date: {date}"),
            Estimation::ArithmeticFailure => write!(f, "arithmetic failure"),
        }
    }
}

// ---------------------------------------------------------------------------
// Fetch result
// ---------------------------------------------------------------------------

/// Everything produced by one poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResult {
    pub usage: Option<UsageEstimate>,
    pub records: Vec<TransactionRecord>,
    pub fetched_at: DateTime<Utc>,
}

impl FetchResult {
    /// Projected balance, if an estimate was available.
    pub fn balance(&self) -> Option<f64> {
        self.usage.as_ref().map(|u| u.projected_balance)
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types.
///
/// Only transport and wiring failures are errors; bad payloads and
/// insufficient data degrade to empty results instead.
#[derive(Debug, thiserror::Error)]
pub enum GasError {
    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    #[error("Fetch timed out after {0}s")]
    Timeout(u64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Publish to {target} failed: {message}")]
    Publish { target: String, message: String },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
