//! Integration tests for the HTTP endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. The dispatcher runs on the test runtime with a
//! seeded RNG and ambient growth disabled.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::Router;
use charge_core::ChargeConfig;
use charge_server::router::build_router;
use charge_server::startup::{Services, spawn_services_with_rng};
use charge_server::state::AppState;
use charge_types::NetworkIdentity;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::Value;
use tower::ServiceExt;

fn identity() -> NetworkIdentity {
    NetworkIdentity {
        server_ip: String::from("192.168.1.50"),
        port: 3001,
        public_url: None,
    }
}

fn make_app() -> (Router, Services) {
    let mut config = ChargeConfig::default();
    config.ambient.enabled = false;
    let services = spawn_services_with_rng(&config, identity(), StdRng::seed_from_u64(11));
    let state = Arc::new(AppState::new(services.handle.clone()));
    (build_router(state), services)
}

async fn body_bytes(body: Body) -> Vec<u8> {
    axum::body::to_bytes(body, usize::MAX).await.unwrap().to_vec()
}

async fn body_to_json(body: Body) -> Value {
    serde_json::from_slice(&body_bytes(body).await).unwrap()
}

async fn body_to_string(body: Body) -> String {
    String::from_utf8(body_bytes(body).await).unwrap()
}

fn submit_request(name: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/submit")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::json!({ "name": name }).to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn state_reports_initial_snapshot_and_identity() {
    let (app, _services) = make_app();

    let response = app.oneshot(get("/api/state")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["progress"], serde_json::json!(0.0));
    assert_eq!(json["isComplete"], serde_json::json!(false));
    assert_eq!(json["submissionCount"], serde_json::json!(0));
    assert_eq!(json["serverIp"], serde_json::json!("192.168.1.50"));
    assert_eq!(json["port"], serde_json::json!(3001));
}

#[tokio::test]
async fn submit_moves_progress_into_first_band() {
    let (app, _services) = make_app();

    let response = app.clone().oneshot(submit_request("Alice")).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], serde_json::json!("accepted"));
    let progress = json["progress"].as_f64().unwrap();
    assert!((5.0..=8.0).contains(&progress), "progress {progress}");

    let state = body_to_json(app.oneshot(get("/api/state")).await.unwrap().into_body()).await;
    assert_eq!(state["submissionCount"], serde_json::json!(1));
    assert_eq!(state["logs"].as_array().unwrap().len(), 1);
    assert_eq!(state["logs"][0]["type"], serde_json::json!("info"));
}

#[tokio::test]
async fn state_never_carries_submission_list() {
    let (app, _services) = make_app();
    for n in 0..20 {
        app.clone()
            .oneshot(submit_request(&format!("guest{n}")))
            .await
            .unwrap();
    }

    let state = body_to_json(app.clone().oneshot(get("/api/state")).await.unwrap().into_body()).await;
    assert_eq!(state["submissionCount"], serde_json::json!(20));
    assert!(state.get("allSubmissions").is_none());

    let csv = body_to_string(app.oneshot(get("/api/export")).await.unwrap().into_body()).await;
    assert!(csv.contains("guest0,"));
    assert!(csv.contains("guest19,"));
}

#[tokio::test]
async fn blank_submission_is_bad_request() {
    let (app, _services) = make_app();

    let response = app.clone().oneshot(submit_request("   ")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], serde_json::json!(400));

    let state = body_to_json(app.oneshot(get("/api/state")).await.unwrap().into_body()).await;
    assert_eq!(state["submissionCount"], serde_json::json!(0));
    assert!(state["logs"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn trigger_completes_without_recording_submission() {
    let (app, _services) = make_app();
    app.clone().oneshot(submit_request("Alice")).await.unwrap();

    let response = app.clone().oneshot(submit_request("Demo")).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], serde_json::json!("completed"));

    let state = body_to_json(app.clone().oneshot(get("/api/state")).await.unwrap().into_body()).await;
    assert_eq!(state["progress"], serde_json::json!(100.0));
    assert_eq!(state["isComplete"], serde_json::json!(true));
    assert_eq!(state["submissionCount"], serde_json::json!(1));
    assert_eq!(state["logs"][0]["type"], serde_json::json!("success"));

    let csv = body_to_string(app.clone().oneshot(get("/api/export")).await.unwrap().into_body()).await;
    assert_eq!(csv.trim_start_matches('\u{FEFF}').lines().count(), 2);

    let late = app.oneshot(submit_request("Bob")).await.unwrap();
    let json = body_to_json(late.into_body()).await;
    assert_eq!(json["status"], serde_json::json!("ignored"));
}

#[tokio::test]
async fn export_is_csv_attachment() {
    let (app, _services) = make_app();
    for name in ["Alice", "Smith, J."] {
        app.clone().oneshot(submit_request(name)).await.unwrap();
    }

    let response = app.oneshot(get("/api/export")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers.get(header::CONTENT_TYPE).unwrap(),
        "text/csv; charset=utf-8"
    );
    let disposition = headers
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(disposition.starts_with("attachment"));

    let csv = body_to_string(response.into_body()).await;
    assert!(csv.starts_with('\u{FEFF}'));
    let lines: Vec<_> = csv.trim_start_matches('\u{FEFF}').lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "Name,Timestamp");
    assert!(lines[1].starts_with("Alice,"));
    assert!(lines[2].starts_with("\"Smith, J.\","));
}

#[tokio::test]
async fn reset_clears_session_and_export() {
    let (app, _services) = make_app();
    app.clone().oneshot(submit_request("Alice")).await.unwrap();
    app.clone().oneshot(submit_request("demo")).await.unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/reset")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_string(response.into_body()).await, "Reset");

    let state = body_to_json(app.clone().oneshot(get("/api/state")).await.unwrap().into_body()).await;
    assert_eq!(state["progress"], serde_json::json!(0.0));
    assert_eq!(state["isComplete"], serde_json::json!(false));
    assert_eq!(state["submissionCount"], serde_json::json!(0));
    assert!(state["logs"].as_array().unwrap().is_empty());
    assert_eq!(state["serverIp"], serde_json::json!("192.168.1.50"));

    let csv = body_to_string(app.oneshot(get("/api/export")).await.unwrap().into_body()).await;
    assert_eq!(csv, "\u{FEFF}Name,Timestamp\r\n");
}

#[tokio::test]
async fn index_shows_join_url() {
    let (app, _services) = make_app();

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_to_string(response.into_body()).await;
    assert!(html.contains("http://192.168.1.50:3001/join"));
    assert!(html.contains("CHARGING"));
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let (app, _services) = make_app();
    let response = app.oneshot(get("/api/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stopped_dispatcher_is_service_unavailable() {
    let (app, services) = make_app();
    services.dispatcher.abort();
    let _ = services.dispatcher.await;

    let response = app.oneshot(get("/api/state")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
