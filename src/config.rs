//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! The account token may be given inline or referenced by env-var name
//! and resolved at startup.

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fs;
use tracing::warn;

use crate::client::{AccountSettings, API_ENDPOINT, DEFAULT_TIMEOUT_SECS};
use crate::types::GasError;

/// Default config file path, overridable with `XIAN_GAS_CONFIG`.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub account: AccountConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub sensor: SensorConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub home_assistant: Option<HomeAssistantConfig>,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AccountConfig {
    pub user_id: String,
    pub card_id: String,
    /// Correction offset. Accepts a number or a numeric string.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub correction: f64,
    /// Inline access token.
    #[serde(default)]
    pub token_s: Option<String>,
    /// Env var holding the access token, used when `token_s` is absent.
    #[serde(default)]
    pub token_s_env: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollConfig {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SensorConfig {
    #[serde(default = "default_entity_id")]
    pub entity_id: String,
    #[serde(default = "default_sensor_name")]
    pub name: String,
    #[serde(default = "default_unit")]
    pub unit: String,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            entity_id: default_entity_id(),
            name: default_sensor_name(),
            unit: default_unit(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8089,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HomeAssistantConfig {
    pub base_url: String,
    #[serde(default = "default_ha_token_env")]
    pub token_env: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_state_file")]
    pub state_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
        }
    }
}

fn default_endpoint() -> String {
    API_ENDPOINT.to_string()
}
fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_interval() -> u64 {
    86_400
}
fn default_entity_id() -> String {
    "sensor.xian_gas".to_string()
}
fn default_sensor_name() -> String {
    "Xi'an Gas Balance".to_string()
}
fn default_unit() -> String {
    "¥".to_string()
}
fn default_ha_token_env() -> String {
    "HA_TOKEN".to_string()
}
fn default_state_file() -> String {
    "xian_gas_state.json".to_string()
}

/// Accept `1.5`, `2`, or `"1.5"`; anything else falls back to 0.
fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    let parsed = match &raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(parsed.unwrap_or_else(|| {
        warn!(value = %raw, "Correction is not numeric, using 0");
        0.0
    }))
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), GasError> {
        if self.account.user_id.trim().is_empty() {
            return Err(GasError::Config("account.user_id is empty".into()));
        }
        if self.account.card_id.trim().is_empty() {
            return Err(GasError::Config("account.card_id is empty".into()));
        }
        if self.account.token_s.is_none() && self.account.token_s_env.is_none() {
            return Err(GasError::Config(
                "one of account.token_s or account.token_s_env is required".into(),
            ));
        }
        if self.poll.interval_secs == 0 {
            return Err(GasError::Config("poll.interval_secs must be positive".into()));
        }
        Ok(())
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }

    /// Build client settings, resolving the token from the environment
    /// when it isn't given inline.
    pub fn account_settings(&self) -> Result<AccountSettings> {
        let token = match (&self.account.token_s, &self.account.token_s_env) {
            (Some(token), _) => token.clone(),
            (None, Some(env)) => Self::resolve_env(env)?,
            (None, None) => {
                return Err(GasError::Config("no access token configured".into()).into())
            }
        };

        Ok(AccountSettings::new(
            &self.account.user_id,
            &self.account.card_id,
            token,
            self.account.correction,
        )
        .with_endpoint(&self.api.endpoint)
        .with_timeout(self.api.timeout_secs))
    }
}
