//! Poll coordinator.
//!
//! Owns the balance source and the latest reading. The poll loop in
//! `main` decides when to refresh; the coordinator only records what
//! happened so the sensor and dashboard can read a consistent snapshot.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::client::BalanceSource;
use crate::types::{FetchResult, GasError};

/// Point-in-time view of the coordinator's state.
#[derive(Debug, Clone, Serialize)]
pub struct CoordinatorSnapshot {
    /// Latest reading, kept across failed refreshes.
    pub data: Option<FetchResult>,
    pub last_update_success: bool,
    /// True while `data` came from disk and no refresh has succeeded yet.
    pub restored: bool,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub refresh_count: u64,
    pub failure_count: u64,
}

impl Default for CoordinatorSnapshot {
    fn default() -> Self {
        Self {
            data: None,
            last_update_success: true,
            restored: false,
            last_success_at: None,
            last_failure_at: None,
            last_error: None,
            refresh_count: 0,
            failure_count: 0,
        }
    }
}

pub struct Coordinator {
    source: Box<dyn BalanceSource>,
    state: RwLock<CoordinatorSnapshot>,
}

impl Coordinator {
    pub fn new(source: Box<dyn BalanceSource>) -> Self {
        Self {
            source,
            state: RwLock::new(CoordinatorSnapshot::default()),
        }
    }

    /// Seed the coordinator with a reading saved by a previous run.
    pub fn with_restored(self, reading: Option<FetchResult>) -> Self {
        if let Some(reading) = reading {
            let state = self.state.into_inner();
            return Self {
                source: self.source,
                state: RwLock::new(CoordinatorSnapshot {
                    data: Some(reading),
                    restored: true,
                    ..state
                }),
            };
        }
        self
    }

    /// Initial refresh at startup. Failure means the account is not ready.
    pub async fn first_refresh(&self) -> Result<(), GasError> {
        self.refresh().await.map_err(|e| {
            error!(source = self.source.name(), error = %e, "Initial refresh failed");
            e
        })
    }

    /// Fetch once and record the outcome.
    pub async fn refresh(&self) -> Result<(), GasError> {
        let result = self.source.fetch().await;
        let mut state = self.state.write().await;
        state.refresh_count += 1;

        match result {
            Ok(reading) => {
                match reading.balance() {
                    Some(balance) => info!(balance, records = reading.records.len(), "Refresh succeeded"),
                    None => warn!(records = reading.records.len(), "Refresh succeeded without an estimate"),
                }
                state.data = Some(reading);
                state.last_update_success = true;
                state.restored = false;
                state.last_success_at = Some(Utc::now());
                state.last_error = None;
                Ok(())
            }
            Err(e) => {
                warn!(source = self.source.name(), error = %e, "Refresh failed");
                state.last_update_success = false;
                state.last_failure_at = Some(Utc::now());
                state.last_error = Some(e.to_string());
                state.failure_count += 1;
                Err(e)
            }
        }
    }

    pub async fn snapshot(&self) -> CoordinatorSnapshot {
        self.state.read().await.clone()
    }

    pub async fn latest(&self) -> Option<FetchResult> {
        self.state.read().await.data.clone()
    }

    /// Release the source's connection resources.
    pub async fn shutdown(&self) {
        self.source.close().await;
        info!(source = self.source.name(), "Coordinator shut down");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
