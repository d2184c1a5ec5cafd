//! Persistence layer.
//!
//! Saves the last successful reading to a JSON file so the sensor has a
//! value right after a restart, before the first poll completes.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};

use crate::types::FetchResult;

/// Save a reading to a JSON file.
pub fn save_reading(reading: &FetchResult, path: &str) -> Result<()> {
    let json = serde_json::to_string_pretty(reading).context("Failed to serialise reading")?;

    std::fs::write(path, &json).context(format!("Failed to write reading to {path}"))?;

    debug!(path, balance = ?reading.balance(), "Reading saved");
    Ok(())
}

/// Load a reading from a JSON file.
/// Returns None if the file doesn't exist (fresh start).
pub fn load_reading(path: &str) -> Result<Option<FetchResult>> {
    if !Path::new(path).exists() {
        info!(path, "No saved reading found, starting fresh");
        return Ok(None);
    }

    let json = std::fs::read_to_string(path).context(format!("Failed to read reading from {path}"))?;

    let reading: FetchResult =
        serde_json::from_str(&json).context(format!("Failed to parse reading from {path}"))?;

    info!(
        path,
        balance = ?reading.balance(),
        records = reading.records.len(),
        fetched_at = %reading.fetched_at,
        "Reading restored from disk"
    );

    Ok(Some(reading))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
