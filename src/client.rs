//! Xi'an gas invoice API client.
//!
//! Posts the account identifiers to the invoice search endpoint and runs
//! the response through the cleaner and the usage calculator.
//!
//! API: `POST http://wkf.qhgas.com/rs/WX/searchInvoice`
//! Body: `{"data":{"userId":…,"cardId":…},"tokenS":…}`
//! Response: a list of `{dt, fee, …}` entries, bare or under `data`.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::estimator::{calculate_usage, clean_records};
use crate::types::{FetchResult, GasError};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

pub const API_ENDPOINT: &str = "http://wkf.qhgas.com/rs/WX/searchInvoice";
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Credentials and tuning for one gas account.
#[derive(Debug)]
pub struct AccountSettings {
    pub user_id: String,
    pub card_id: String,
    pub token_s: Secret<String>,
    /// Correction offset applied to balance projections.
    pub correction: f64,
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl AccountSettings {
    pub fn new(
        user_id: impl Into<String>,
        card_id: impl Into<String>,
        token_s: impl Into<String>,
        correction: f64,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            card_id: card_id.into(),
            token_s: Secret::new(token_s.into()),
            correction,
            endpoint: API_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

// ---------------------------------------------------------------------------
// Request body
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct InvoiceRequest<'a> {
    data: InvoiceAccount<'a>,
    #[serde(rename = "tokenS")]
    token_s: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InvoiceAccount<'a> {
    user_id: &'a str,
    card_id: &'a str,
}

// ---------------------------------------------------------------------------
// Source trait
// ---------------------------------------------------------------------------

/// Anything that can produce a fresh balance reading.
///
/// Implemented by [`XianGasClient`]; the coordinator only sees this trait.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BalanceSource: Send + Sync {
    /// Fetch and estimate. Only transport failures are errors.
    async fn fetch(&self) -> Result<FetchResult, GasError>;

    /// Release any held connection resources.
    async fn close(&self);

    /// Name for logging.
    fn name(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Invoice API client with a lazily created, reusable HTTP client.
pub struct XianGasClient {
    settings: AccountSettings,
    http: Mutex<Option<Client>>,
}

impl XianGasClient {
    pub fn new(settings: AccountSettings) -> Self {
        Self {
            settings,
            http: Mutex::new(None),
        }
    }

    /// Return the shared HTTP client, building it on first use.
    async fn http(&self) -> Result<Client, GasError> {
        let mut guard = self.http.lock().await;
        if let Some(client) = guard.as_ref() {
            return Ok(client.clone());
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(self.settings.timeout_secs))
            .user_agent("xian-gas/0.1.0")
            .build()
            .map_err(|e| GasError::FetchFailed(format!("Failed to build HTTP client: {e}")))?;
        debug!("Created invoice HTTP client");
        *guard = Some(client.clone());
        Ok(client)
    }

    /// Whether an HTTP client is currently held.
    pub async fn is_connected(&self) -> bool {
        self.http.lock().await.is_some()
    }

    fn request_body(&self) -> Result<String, GasError> {
        let body = InvoiceRequest {
            data: InvoiceAccount {
                user_id: &self.settings.user_id,
                card_id: &self.settings.card_id,
            },
            token_s: self.settings.token_s.expose_secret(),
        };
        serde_json::to_string(&body)
            .map_err(|e| GasError::FetchFailed(format!("Failed to encode request: {e}")))
    }

    fn map_transport_error(&self, e: reqwest::Error) -> GasError {
        if e.is_timeout() {
            GasError::Timeout(self.settings.timeout_secs)
        } else {
            GasError::FetchFailed(e.to_string())
        }
    }
}

#[async_trait]
impl BalanceSource for XianGasClient {
    async fn fetch(&self) -> Result<FetchResult, GasError> {
        let http = self.http().await?;
        let body = self.request_body()?;

        let resp = http
            .post(&self.settings.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            warn!(%status, "Invoice API returned non-success status");
        }

        let payload: Value = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                GasError::Timeout(self.settings.timeout_secs)
            } else {
                GasError::FetchFailed(format!("Failed to parse invoice response: {e}"))
            }
        })?;
        debug!(response = %payload, "Invoice API response");

        let records = clean_records(&payload);
        let estimation = calculate_usage(&records, self.settings.correction);
        info!(
            card_id = %self.settings.card_id,
            records = records.len(),
            result = %estimation,
            "Gas usage estimated"
        );

        Ok(FetchResult {
            usage: estimation.into_usage(),
            records,
            fetched_at: Utc::now(),
        })
    }

    async fn close(&self) {
        if self.http.lock().await.take().is_some() {
            debug!("Released invoice HTTP client");
        }
    }

    fn name(&self) -> &'static str {
        "xian-gas"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
