//! HTTP tests through the axum server against mock backend nodes.

use std::time::Duration;

use serde_json::{json, Value};

use dispatch_gateway::dispatch::codes;
use dispatch_gateway::health::CheckStatus;

mod common;

const TRACEPARENT: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

#[tokio::test]
async fn test_created_schedule_round_trip() {
    let backend = common::start_mock_backend(json!({
        "status": 201,
        "code": 0,
        "msg": "ok",
        "body": {"uuid": "generated-by-backend"}
    }))
    .await;
    let gateway = common::start_gateway(common::gateway_config("schedule", "schedule-1", backend.addr)).await;

    let res = common::client()
        .post(gateway.url("/v1/schedule/CreateSchedule"))
        .header("x-request-id", "req-123")
        .header("traceparent", TRACEPARENT)
        .header("x-authenticated-identity", "tenant-7")
        .json(&json!({"cron": "0 9 * * *"}))
        .send()
        .await
        .expect("Gateway unreachable");

    assert_eq!(res.status(), 201);
    assert_eq!(res.headers()["x-request-id"], "req-123");
    let body: Value = res.json().await.unwrap();
    assert_eq!(
        body,
        json!({"status": 201, "code": 0, "message": "succeed to create new schedule", "uuid": ""})
    );

    let seen = backend.last_headers().unwrap();
    assert_eq!(seen["x-request-id"], "req-123");
    assert_eq!(seen["x-authenticated-identity"], "tenant-7");
    let hop = seen["traceparent"].to_str().unwrap();
    assert!(hop.starts_with("00-4bf92f3577b34da6a3ce929d0e0e4736-"));
    assert_ne!(hop, TRACEPARENT);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_declared_error_passes_through() {
    let backend = common::start_mock_backend(json!({
        "status": 409,
        "code": 17,
        "message": "schedule already exists",
        "body": {"existing": "s-1"}
    }))
    .await;
    let gateway = common::start_gateway(common::gateway_config("schedule", "schedule-1", backend.addr)).await;

    let res = common::client()
        .post(gateway.url("/v1/schedule/CreateSchedule"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 409);
    assert!(res.headers().contains_key("x-request-id"));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], 17);
    assert_eq!(body["message"], "schedule already exists");
    assert_eq!(body["body"], json!({"existing": "s-1"}));

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_unknown_service() {
    let backend = common::start_mock_backend(json!({"status": 201})).await;
    let gateway = common::start_gateway(common::gateway_config("schedule", "schedule-1", backend.addr)).await;

    let res = common::client()
        .post(gateway.url("/v1/billing/Charge"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 503);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], codes::AVAILABLE_SERVICE_NOT_EXIST);
    assert_eq!(backend.calls(), 0);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_refused_node_trips_breaker_and_fails_check() {
    let dead = common::unused_address().await;
    let mut config = common::gateway_config("schedule", "schedule-1", dead);
    config.breaker.error_threshold = 1;
    config.breaker.cool_down_ms = 60_000;
    let gateway = common::start_gateway(config).await;
    let client = common::client();

    let first = client
        .post(gateway.url("/v1/schedule/CreateSchedule"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 500);

    let second = client
        .post(gateway.url("/v1/schedule/CreateSchedule"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), 503);
    let body: Value = second.json().await.unwrap();
    assert_eq!(body["code"], codes::CIRCUIT_BREAKER_OPEN);

    let health = gateway.components.health.as_ref().unwrap();
    assert_eq!(health.status("service:schedule-1"), Some(CheckStatus::Failing));

    // The failing node is now skipped by the static resolver.
    let third = client
        .post(gateway.url("/v1/schedule/CreateSchedule"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    let body: Value = third.json().await.unwrap();
    assert_eq!(body["code"], codes::AVAILABLE_SERVICE_NOT_EXIST);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let backend = common::start_programmable_backend(|_| async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        (200, json!({"status": 201}).to_string())
    })
    .await;
    let mut config = common::gateway_config("schedule", "schedule-1", backend.addr);
    config.backend.request_timeout_ms = 100;
    let gateway = common::start_gateway(config).await;

    let res = common::client()
        .post(gateway.url("/v1/schedule/CreateSchedule"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 408);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], 0);
    assert!(body["message"].as_str().unwrap().starts_with("request time out for CreateSchedule"));

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_rejects_non_json_body() {
    let backend = common::start_mock_backend(json!({"status": 201})).await;
    let gateway = common::start_gateway(common::gateway_config("schedule", "schedule-1", backend.addr)).await;

    let res = common::client()
        .post(gateway.url("/v1/schedule/CreateSchedule"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], 0);
    assert_eq!(backend.calls(), 0);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_healthz() {
    let backend = common::start_mock_backend(json!({"status": 201})).await;
    let gateway = common::start_gateway(common::gateway_config("schedule", "schedule-1", backend.addr)).await;

    let res = common::client().get(gateway.url("/healthz")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "ok");

    gateway.shutdown.trigger();
}
