//! xian-gas — prepaid natural-gas balance sensor
//!
//! Entry point. Loads configuration, initialises structured logging,
//! restores the last reading from disk, and runs the poll loop with
//! graceful shutdown.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use xian_gas::client::XianGasClient;
use xian_gas::config::{self, AppConfig};
use xian_gas::dashboard::{self, routes::DashboardState};
use xian_gas::engine::coordinator::Coordinator;
use xian_gas::publisher::HomeAssistantPublisher;
use xian_gas::sensor::SensorState;
use xian_gas::storage;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();

    let config_path =
        std::env::var("XIAN_GAS_CONFIG").unwrap_or_else(|_| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = AppConfig::load(&config_path)?;

    info!(
        card_id = %cfg.account.card_id,
        correction = cfg.account.correction,
        interval_secs = cfg.poll.interval_secs,
        endpoint = %cfg.api.endpoint,
        "xian-gas starting up"
    );

    // -- Initialise components -------------------------------------------

    let settings = cfg.account_settings()?;
    let client = XianGasClient::new(settings);

    let state_file = cfg.storage.state_file.as_str();
    let restored = match storage::load_reading(state_file) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "Ignoring unreadable saved reading");
            None
        }
    };

    let coordinator = Arc::new(Coordinator::new(Box::new(client)).with_restored(restored));

    let publisher = match &cfg.home_assistant {
        Some(ha) => {
            let token = AppConfig::resolve_env(&ha.token_env)?;
            info!(base_url = %ha.base_url, "Publishing to Home Assistant");
            Some(HomeAssistantPublisher::new(&ha.base_url, token)?)
        }
        None => None,
    };

    coordinator
        .first_refresh()
        .await
        .context("Initial refresh failed; check account settings")?;
    after_refresh(&cfg, &coordinator, publisher.as_ref()).await;

    if cfg.dashboard.enabled {
        let state = Arc::new(DashboardState::new(coordinator.clone(), cfg.sensor.clone()));
        dashboard::spawn_dashboard(state, cfg.dashboard.port);
    }

    // -- Main loop -------------------------------------------------------

    let mut interval = tokio::time::interval(Duration::from_secs(cfg.poll.interval_secs));
    // The first tick fires immediately; the initial refresh already ran.
    interval.tick().await;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        interval_secs = cfg.poll.interval_secs,
        "Entering poll loop. Press Ctrl+C to stop."
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = coordinator.refresh().await {
                    error!(error = %e, "Refresh failed, retrying next interval");
                }
                after_refresh(&cfg, &coordinator, publisher.as_ref()).await;
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    coordinator.shutdown().await;
    if let Some(reading) = coordinator.latest().await {
        storage::save_reading(&reading, state_file)?;
    }
    info!("xian-gas shut down cleanly.");

    Ok(())
}

/// Persist and publish whatever the coordinator now holds.
async fn after_refresh(
    cfg: &AppConfig,
    coordinator: &Coordinator,
    publisher: Option<&HomeAssistantPublisher>,
) {
    let snapshot = coordinator.snapshot().await;

    if snapshot.last_update_success {
        if let Some(reading) = &snapshot.data {
            if let Err(e) = storage::save_reading(reading, &cfg.storage.state_file) {
                error!(error = %e, "Failed to save reading");
            }
        }
    }

    let sensor = SensorState::from_snapshot(&cfg.sensor, &snapshot);
    info!(
        entity_id = %sensor.entity_id,
        state = %sensor.state_string(),
        available = sensor.available,
        "Sensor updated"
    );

    if let Some(publisher) = publisher {
        if let Err(e) = publisher.publish(&sensor).await {
            error!(error = %e, "Failed to publish sensor state");
        }
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("xian_gas=info"));

    let json_logging = std::env::var("XIAN_GAS_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
