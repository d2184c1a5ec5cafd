//! Invoice payload cleaning.
//!
//! The invoice endpoint returns either a bare list or `{"data": [...]}`,
//! sometimes double-encoded as a JSON string. Entries are loosely typed:
//! `fee` may be a number, a numeric string, or garbage.

use serde_json::Value;
use tracing::{debug, info, warn};

use super::parse_record_date;
use crate::types::TransactionRecord;

/// Normalise a raw payload into ordered transaction records.
///
/// Order is preserved as received. Entries without a valid `dt` are
/// skipped; an uncoercible `fee` becomes 0.0 and the entry is kept.
pub fn clean_records(payload: &Value) -> Vec<TransactionRecord> {
    let decoded;
    let mut data = payload;

    if let Value::String(raw) = payload {
        match serde_json::from_str::<Value>(raw) {
            Ok(v) => {
                debug!("Parsed JSON payload from string");
                decoded = v;
                data = &decoded;
            }
            Err(e) => {
                warn!(error = %e, "Failed to parse JSON string payload");
                return Vec::new();
            }
        }
    }

    if let Some(inner) = data.as_object().and_then(|obj| obj.get("data")) {
        debug!("Unwrapping 'data' key");
        data = inner;
    }

    let Some(items) = data.as_array() else {
        warn!(kind = value_kind(data), "Payload is not a list");
        return Vec::new();
    };

    let mut cleaned = Vec::with_capacity(items.len());
    for item in items {
        let Some(entry) = item.as_object() else {
            warn!(item = %item, "Skipping non-object entry");
            continue;
        };

        let date = match entry.get("dt") {
            Some(Value::String(s)) if !s.is_empty() => s,
            Some(Value::String(_)) | Some(Value::Null) | None => {
                warn!("Skipping entry with missing date");
                continue;
            }
            Some(other) => {
                warn!(dt = %other, "Skipping entry with non-string date");
                continue;
            }
        };

        if parse_record_date(date).is_none() {
            warn!(
                dt = %date,
                "Invalid date format, expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS"
            );
            continue;
        }

        let cost = match entry.get("fee") {
            None => 0.0,
            Some(fee) => coerce_cost(fee).unwrap_or_else(|| {
                warn!(fee = %fee, "Invalid cost value, using 0");
                0.0
            }),
        };

        cleaned.push(TransactionRecord::new(date.clone(), cost));
    }

    info!(count = cleaned.len(), "Cleaned invoice records");
    cleaned
}

/// Coerce a loosely typed amount to f64.
fn coerce_cost(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
