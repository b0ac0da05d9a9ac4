mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use common::{RecordingPublisher, Script, ScriptedSource, seeded_config};
use serde_json::Value;
use std::sync::Arc;
use wiki_forwarder::app::health_router;
use wiki_forwarder::forwarder::{CompletionPolicy, ForwarderConfig, ForwarderState};

#[tokio::test]
async fn test_health_ok_while_idle() {
    let source = ScriptedSource::new(Vec::new());
    let publisher = RecordingPublisher::new();
    let forwarder = Arc::new(common::forwarder(seeded_config(), &source, &publisher));

    let server = TestServer::new(health_router(forwarder)).unwrap();
    let response = server.get("/v1/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["state"], "idle");
    assert_eq!(body["events_received"], 0);
}

#[tokio::test]
async fn test_health_unavailable_after_stop() {
    let source = ScriptedSource::new(Vec::new());
    let publisher = RecordingPublisher::new();
    let forwarder = Arc::new(common::forwarder(seeded_config(), &source, &publisher));
    forwarder.start().unwrap();
    forwarder.stop().await;

    let server = TestServer::new(health_router(forwarder)).unwrap();
    let response = server.get("/v1/health").await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert_eq!(body["state"], "stopped");
}

#[tokio::test]
async fn test_health_reports_halted_stream() {
    let source = ScriptedSource::new([Script::Steps(vec![common::event("only")])]);
    let publisher = RecordingPublisher::new();
    let config = ForwarderConfig {
        on_complete: CompletionPolicy::Halt,
        ..seeded_config()
    };
    let forwarder = Arc::new(common::forwarder(config, &source, &publisher));
    let mut state = forwarder.watch_state();
    forwarder.start().unwrap();
    state
        .wait_for(|s| *s == ForwarderState::Halted)
        .await
        .unwrap();

    let server = TestServer::new(health_router(forwarder.clone())).unwrap();
    let response = server.get("/v1/health").await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert_eq!(body["state"], "halted");
    assert_eq!(body["events_received"], 1);

    forwarder.stop().await;
}
