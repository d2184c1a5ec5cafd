//! Sensor state pushed to Home Assistant over its REST API.

use axum::http::StatusCode;
use serde_json::{json, Map, Value};

use xian_gas::publisher::HomeAssistantPublisher;
use xian_gas::sensor::SensorState;
use xian_gas::types::GasError;

use crate::mock_server::MockHomeAssistant;

fn sensor(available: bool) -> SensorState {
    let mut attributes = Map::new();
    attributes.insert("unit_of_measurement".into(), Value::from("CNY"));
    attributes.insert("daily_rate".into(), Value::from(0.97));
    attributes.insert("estimated_days".into(), Value::from(62));
    SensorState {
        entity_id: "sensor.xian_gas".to_string(),
        state: Some(60.5),
        available,
        attributes,
    }
}

#[tokio::test]
async fn test_publish_sends_state_with_bearer_token() {
    let ha = MockHomeAssistant::start(StatusCode::OK).await;
    let publisher = HomeAssistantPublisher::new(format!("{}/", ha.base_url()), "ha-token").unwrap();

    let status = publisher.publish(&sensor(true)).await.unwrap();
    assert_eq!(status.as_u16(), 200);

    let writes = ha.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].entity_id, "sensor.xian_gas");
    assert_eq!(writes[0].authorization.as_deref(), Some("Bearer ha-token"));
    assert_eq!(
        writes[0].body,
        json!({
            "state": "60.5",
            "attributes": {
                "unit_of_measurement": "CNY",
                "daily_rate": 0.97,
                "estimated_days": 62,
            },
        })
    );
}

#[tokio::test]
async fn test_publish_created_is_ok() {
    let ha = MockHomeAssistant::start(StatusCode::CREATED).await;
    let publisher = HomeAssistantPublisher::new(ha.base_url(), "ha-token").unwrap();

    let status = publisher.publish(&sensor(true)).await.unwrap();
    assert_eq!(status.as_u16(), 201);
}

#[tokio::test]
async fn test_publish_unavailable_sensor() {
    let ha = MockHomeAssistant::start(StatusCode::OK).await;
    let publisher = HomeAssistantPublisher::new(ha.base_url(), "ha-token").unwrap();

    publisher.publish(&sensor(false)).await.unwrap();
    assert_eq!(ha.writes()[0].body["state"], "unavailable");
}

#[tokio::test]
async fn test_publish_auth_rejected() {
    let ha = MockHomeAssistant::start(StatusCode::UNAUTHORIZED).await;
    let publisher = HomeAssistantPublisher::new(ha.base_url(), "wrong").unwrap();

    match publisher.publish(&sensor(true)).await {
        Err(GasError::Publish { target, message }) => {
            assert!(target.ends_with("/api/states/sensor.xian_gas"));
            assert_eq!(message, "authentication failed");
        }
        other => panic!("expected auth failure, got {other:?}"),
    }

    ha.set_status(StatusCode::FORBIDDEN);
    match publisher.publish(&sensor(true)).await {
        Err(GasError::Publish { message, .. }) => assert_eq!(message, "authentication failed"),
        other => panic!("expected auth failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_publish_other_status_carries_body() {
    let ha = MockHomeAssistant::start(StatusCode::INTERNAL_SERVER_ERROR).await;
    let publisher = HomeAssistantPublisher::new(ha.base_url(), "ha-token").unwrap();

    match publisher.publish(&sensor(true)).await {
        Err(GasError::Publish { message, .. }) => {
            assert!(message.starts_with("status 500"), "{message}");
            assert!(message.contains("Internal Server Error"), "{message}");
        }
        other => panic!("expected publish error, got {other:?}"),
    }
    assert_eq!(ha.writes().len(), 1);
}

#[tokio::test]
async fn test_publish_unreachable_host() {
    // Nothing listens on port 1.
    let publisher = HomeAssistantPublisher::new("http://127.0.0.1:1", "ha-token").unwrap();

    assert!(matches!(
        publisher.publish(&sensor(true)).await,
        Err(GasError::Publish { .. })
    ));
}
