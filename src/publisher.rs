//! Home Assistant state publisher.
//!
//! Pushes the sensor state into a Home Assistant instance through its
//! REST API (`POST /api/states/<entity_id>`), so the balance shows up as
//! a regular entity without a native integration.

use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

use crate::sensor::SensorState;
use crate::types::GasError;

pub struct HomeAssistantPublisher {
    base_url: String,
    token: Secret<String>,
    http: Client,
}

impl HomeAssistantPublisher {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, GasError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| GasError::Config(format!("Failed to build HA client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: Secret::new(token.into()),
            http,
        })
    }

    fn state_url(&self, entity_id: &str) -> String {
        format!("{}/api/states/{}", self.base_url, entity_id)
    }

    /// Write the sensor state. Returns the HTTP status on success.
    pub async fn publish(&self, sensor: &SensorState) -> Result<StatusCode, GasError> {
        let url = self.state_url(&sensor.entity_id);
        let body = json!({
            "state": sensor.state_string(),
            "attributes": sensor.attributes,
        });
        debug!(url = %url, state = %sensor.state_string(), "Publishing sensor state");

        let resp = self
            .http
            .post(&url)
            .bearer_auth(self.token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| GasError::Publish {
                target: url.clone(),
                message: e.to_string(),
            })?;

        match resp.status() {
            status @ (StatusCode::OK | StatusCode::CREATED) => {
                info!(entity_id = %sensor.entity_id, %status, "Sensor state published");
                Ok(status)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(GasError::Publish {
                target: url,
                message: "authentication failed".into(),
            }),
            status => {
                let text = resp.text().await.unwrap_or_default();
                Err(GasError::Publish {
                    target: url,
                    message: format!("status {status}: {text}"),
                })
            }
        }
    }
}
