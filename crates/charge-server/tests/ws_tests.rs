//! Integration tests for the `WebSocket` endpoint.
//!
//! The router is served on an ephemeral local port and driven with a real
//! `WebSocket` client, so upgrade, framing and the `init`-first contract are
//! exercised end to end.

#![allow(clippy::unwrap_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use charge_core::ChargeConfig;
use charge_server::router::build_router;
use charge_server::startup::{Services, spawn_services_with_rng};
use charge_server::state::AppState;
use charge_types::NetworkIdentity;
use futures::{SinkExt, StreamExt};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Upper bound on any single wait; a hang fails the test instead.
const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

async fn serve() -> (SocketAddr, Services) {
    let mut config = ChargeConfig::default();
    config.ambient.enabled = false;
    let services =
        spawn_services_with_rng(&config, NetworkIdentity::default(), StdRng::seed_from_u64(21));
    let router = build_router(Arc::new(AppState::new(services.handle.clone())));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    (addr, services)
}

async fn connect(addr: SocketAddr) -> Client {
    let (client, _response) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    client
}

/// Next JSON text frame, skipping control frames.
async fn next_json(client: &mut Client) -> Value {
    loop {
        let frame = tokio::time::timeout(FRAME_TIMEOUT, client.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn send_json(client: &mut Client, value: &Value) {
    client
        .send(Message::Text(value.to_string().into()))
        .await
        .unwrap();
}

fn user_submit(name: &str) -> Value {
    serde_json::json!({ "event": "user_submit", "data": { "name": name } })
}

#[tokio::test]
async fn init_is_the_first_frame() {
    let (addr, services) = serve().await;
    services.handle.submit("Alice").await.unwrap();

    let mut client = connect(addr).await;
    let init = next_json(&mut client).await;
    assert_eq!(init["event"], "init");
    assert_eq!(init["data"]["submissionCount"], 1);
    assert_eq!(init["data"]["serverIp"], "127.0.0.1");
    assert_eq!(init["data"]["logs"].as_array().unwrap().len(), 1);
    assert!(init["data"].get("allSubmissions").is_none());
}

#[tokio::test]
async fn user_submit_is_broadcast_to_every_socket() {
    let (addr, _services) = serve().await;
    let mut sender = connect(addr).await;
    let mut watcher = connect(addr).await;
    assert_eq!(next_json(&mut sender).await["event"], "init");
    assert_eq!(next_json(&mut watcher).await["event"], "init");

    send_json(&mut sender, &user_submit("Bob")).await;

    for client in [&mut sender, &mut watcher] {
        let progress = next_json(client).await;
        assert_eq!(progress["event"], "progress_update");
        let value = progress["data"].as_f64().unwrap();
        assert!((5.0..8.0).contains(&value), "progress {value}");

        let log = next_json(client).await;
        assert_eq!(log["event"], "new_log");
        assert_eq!(log["data"]["type"], "info");

        let particle = next_json(client).await;
        assert_eq!(particle["event"], "spawn_particle");
        assert_eq!(particle["data"]["name"], "Bob");
    }
}

#[tokio::test]
async fn garbage_frames_leave_the_socket_open() {
    let (addr, services) = serve().await;
    let mut client = connect(addr).await;
    next_json(&mut client).await;

    client.send(Message::Text("{not json".into())).await.unwrap();
    send_json(&mut client, &serde_json::json!({ "event": "explode", "data": {} })).await;
    send_json(&mut client, &user_submit("   ")).await;
    send_json(&mut client, &user_submit("Carol")).await;

    let next = next_json(&mut client).await;
    assert_eq!(next["event"], "progress_update");

    let payload = services.handle.snapshot().await.unwrap();
    assert_eq!(payload.snapshot.submission_count, 1);
}

#[tokio::test]
async fn trigger_over_socket_runs_completion_ceremony() {
    let (addr, _services) = serve().await;
    let mut client = connect(addr).await;
    next_json(&mut client).await;

    send_json(&mut client, &user_submit("START_DEMO_NOW")).await;

    let progress = next_json(&mut client).await;
    assert_eq!(progress["event"], "progress_update");
    assert_eq!(progress["data"].as_f64(), Some(100.0));
    let completion = next_json(&mut client).await;
    assert_eq!(completion["event"], "completion");
    assert_eq!(completion["data"]["name"], "START_DEMO_NOW");
    let log = next_json(&mut client).await;
    assert_eq!(log["event"], "new_log");
    assert_eq!(log["data"]["type"], "success");
}

#[tokio::test]
async fn reset_pushes_fresh_init_to_open_sockets() {
    let (addr, services) = serve().await;
    let mut client = connect(addr).await;
    next_json(&mut client).await;

    send_json(&mut client, &user_submit("Dana")).await;
    for _ in 0..3 {
        next_json(&mut client).await;
    }

    services.handle.reset().await.unwrap();
    let init = next_json(&mut client).await;
    assert_eq!(init["event"], "init");
    assert_eq!(init["data"]["submissionCount"], 0);
    assert_eq!(init["data"]["isComplete"], false);
}
