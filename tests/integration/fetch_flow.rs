//! End-to-end fetch → clean → estimate through the real HTTP client.

use axum::http::StatusCode;
use chrono::{Duration as ChronoDuration, Local};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use xian_gas::client::{AccountSettings, BalanceSource, XianGasClient};
use xian_gas::config::SensorConfig;
use xian_gas::engine::coordinator::Coordinator;
use xian_gas::sensor::SensorState;
use xian_gas::types::GasError;

use crate::mock_server::{MockInvoiceServer, MockResponse};

fn days_ago(n: i64) -> String {
    (Local::now().date_naive() - ChronoDuration::days(n))
        .format("%Y-%m-%d")
        .to_string()
}

/// Snapshot today, one recharge 31 days back.
fn ledger() -> Value {
    json!([
        {"dt": days_ago(0), "fee": "50.00", "invoiceNo": "A1"},
        {"dt": "garbage", "fee": 99},
        {"dt": format!("{} 09:30:00", days_ago(31)), "fee": 30},
    ])
}

fn client_for(server: &MockInvoiceServer, correction: f64) -> XianGasClient {
    XianGasClient::new(
        AccountSettings::new("oh2fKv", "0842342294", "token-s", correction)
            .with_endpoint(server.endpoint())
            .with_timeout(2),
    )
}

#[tokio::test]
async fn test_bare_list_response() {
    let server = MockInvoiceServer::start(MockResponse::Json(StatusCode::OK, ledger())).await;
    let client = client_for(&server, 0.0);

    let result = client.fetch().await.unwrap();
    assert_eq!(result.records.len(), 2);
    assert_eq!(result.records[0].cost, 50.0);

    let usage = result.usage.unwrap();
    assert_eq!(usage.daily_rate, 0.97);
    assert_eq!(usage.projected_balance, 60.0);
    assert_eq!(usage.estimated_days, 62);
    assert_eq!(usage.raw_records, result.records);
}

#[tokio::test]
async fn test_wrapped_response_matches_bare() {
    let server = MockInvoiceServer::start(MockResponse::Json(StatusCode::OK, ledger())).await;
    let client = client_for(&server, 1.5);
    let bare = client.fetch().await.unwrap();

    server.set_response(MockResponse::Json(
        StatusCode::OK,
        json!({"code": 200, "msg": "ok", "data": ledger()}),
    ));
    let wrapped = client.fetch().await.unwrap();

    assert_eq!(bare.records, wrapped.records);
    assert_eq!(bare.usage, wrapped.usage);
    // 50 + 1.5 + 10 + 1.5
    assert_eq!(wrapped.usage.unwrap().projected_balance, 63.0);
}

#[tokio::test]
async fn test_request_body_sent() {
    let server = MockInvoiceServer::start(MockResponse::Json(StatusCode::OK, json!([]))).await;
    let client = client_for(&server, 0.0);
    client.fetch().await.unwrap();

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0],
        json!({"data": {"userId": "oh2fKv", "cardId": "0842342294"}, "tokenS": "token-s"})
    );
}

#[tokio::test]
async fn test_single_record_has_no_estimate() {
    let server = MockInvoiceServer::start(MockResponse::Json(
        StatusCode::OK,
        json!({"data": [{"dt": days_ago(3), "fee": 20}]}),
    ))
    .await;
    let result = client_for(&server, 0.0).fetch().await.unwrap();
    assert_eq!(result.records.len(), 1);
    assert!(result.usage.is_none());
}

#[tokio::test]
async fn test_error_status_with_json_body_degrades() {
    let server = MockInvoiceServer::start(MockResponse::Json(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({"code": 500, "msg": "token expired"}),
    ))
    .await;
    let result = client_for(&server, 0.0).fetch().await.unwrap();
    assert!(result.records.is_empty());
    assert!(result.usage.is_none());
}

#[tokio::test]
async fn test_non_json_body_is_fetch_failure() {
    let server = MockInvoiceServer::start(MockResponse::Text(
        StatusCode::BAD_GATEWAY,
        "<html>bad gateway</html>".into(),
    ))
    .await;
    let err = client_for(&server, 0.0).fetch().await.unwrap_err();
    assert!(matches!(err, GasError::FetchFailed(_)), "got {err:?}");
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockInvoiceServer::start(MockResponse::Slow(Duration::from_secs(5))).await;
    let client = XianGasClient::new(
        AccountSettings::new("u", "c", "t", 0.0)
            .with_endpoint(server.endpoint())
            .with_timeout(1),
    );
    let err = client.fetch().await.unwrap_err();
    assert!(matches!(err, GasError::Timeout(1)), "got {err:?}");
}

#[tokio::test]
async fn test_client_reusable_after_close() {
    let server = MockInvoiceServer::start(MockResponse::Json(StatusCode::OK, ledger())).await;
    let client = client_for(&server, 0.0);
    client.fetch().await.unwrap();
    client.close().await;
    assert!(!client.is_connected().await);
    client.fetch().await.unwrap();
    assert_eq!(server.requests().len(), 2);
}

#[tokio::test]
async fn test_coordinator_sensor_lifecycle() {
    let server = MockInvoiceServer::start(MockResponse::Json(StatusCode::OK, ledger())).await;
    let coordinator = Arc::new(Coordinator::new(Box::new(client_for(&server, 0.0))));
    let sensor_cfg = SensorConfig::default();

    coordinator.first_refresh().await.unwrap();
    let sensor = SensorState::from_snapshot(&sensor_cfg, &coordinator.snapshot().await);
    assert!(sensor.available);
    assert_eq!(sensor.state, Some(60.0));
    assert_eq!(sensor.attributes["daily_rate"], 0.97);

    // Upstream goes bad: sensor unavailable, last reading kept
    server.set_response(MockResponse::Text(StatusCode::OK, "not json".into()));
    assert!(coordinator.refresh().await.is_err());
    let snapshot = coordinator.snapshot().await;
    let sensor = SensorState::from_snapshot(&sensor_cfg, &snapshot);
    assert!(!sensor.available);
    assert_eq!(snapshot.data.unwrap().balance(), Some(60.0));

    // Recovers on the next poll
    server.set_response(MockResponse::Json(StatusCode::OK, ledger()));
    coordinator.refresh().await.unwrap();
    let sensor = SensorState::from_snapshot(&sensor_cfg, &coordinator.snapshot().await);
    assert!(sensor.available);

    coordinator.shutdown().await;
}
