//! Sensor state projection.
//!
//! Turns a coordinator snapshot into the state/attributes shape a home
//! automation host expects for a monetary sensor.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::SensorConfig;
use crate::engine::coordinator::CoordinatorSnapshot;

pub const ICON: &str = "mdi:gas-cylinder";
pub const DEVICE_CLASS: &str = "monetary";
pub const STATE_CLASS: &str = "total";

/// The produced sensor reading.
#[derive(Debug, Clone, Serialize)]
pub struct SensorState {
    pub entity_id: String,
    /// Projected balance, or null when no estimate is available.
    pub state: Option<f64>,
    pub available: bool,
    pub attributes: Map<String, Value>,
}

impl SensorState {
    /// Build the sensor view of a snapshot.
    pub fn from_snapshot(config: &SensorConfig, snapshot: &CoordinatorSnapshot) -> Self {
        let mut attributes = Map::new();
        attributes.insert("friendly_name".into(), Value::from(config.name.clone()));
        attributes.insert("unit_of_measurement".into(), Value::from(config.unit.clone()));
        attributes.insert("device_class".into(), Value::from(DEVICE_CLASS));
        attributes.insert("state_class".into(), Value::from(STATE_CLASS));
        attributes.insert("icon".into(), Value::from(ICON));

        let usage = snapshot.data.as_ref().and_then(|d| d.usage.as_ref());
        if let (Some(data), Some(usage)) = (snapshot.data.as_ref(), usage) {
            attributes.insert("daily_rate".into(), Value::from(usage.daily_rate));
            attributes.insert("estimated_days".into(), Value::from(usage.estimated_days));
            attributes.insert(
                "records".into(),
                serde_json::to_value(&data.records).unwrap_or_default(),
            );
        }

        Self {
            entity_id: config.entity_id.clone(),
            state: usage.map(|u| u.projected_balance),
            available: snapshot.last_update_success && snapshot.data.is_some(),
            attributes,
        }
    }

    /// Home Assistant's string form of the state.
    pub fn state_string(&self) -> String {
        match (self.available, self.state) {
            (false, _) => "unavailable".to_string(),
            (true, None) => "unknown".to_string(),
            (true, Some(v)) => format!("{v}"),
        }
    }
}
