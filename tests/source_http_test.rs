mod common;

use common::RecordingPublisher;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use wiki_forwarder::broker::EventPublisher;
use wiki_forwarder::forwarder::{CompletionPolicy, ForwarderConfig, ForwarderState, StreamForwarder};
use wiki_forwarder::source::{EventSource, HttpEventSource, SourceConfig, SourceError};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path},
};

const STREAM_PATH: &str = "/v2/stream/mediawiki.page_change.v1";

fn source_for(server: &MockServer) -> HttpEventSource {
    HttpEventSource::new(SourceConfig {
        url: format!("{}{}", server.uri(), STREAM_PATH),
        connect_timeout: Duration::from_secs(2),
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_reads_events_from_sse_response() {
    let mock_server = MockServer::start().await;
    let body = ":ok\n\nevent: message\nid: [{\"offset\":1}]\ndata: {\"n\":1}\n\nevent: message\ndata: {\"n\":2}\n\n";

    Mock::given(method("GET"))
        .and(path(STREAM_PATH))
        .and(header("accept", "text/event-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let source = source_for(&mock_server);
    let stream = source.connect().await.unwrap();
    let events: Vec<_> = stream.collect().await;

    assert_eq!(events.len(), 2);
    let first = events[0].as_ref().unwrap();
    assert_eq!(first.data, "{\"n\":1}");
    assert_eq!(first.event_type.as_deref(), Some("message"));
    assert_eq!(first.id.as_deref(), Some("[{\"offset\":1}]"));
    assert_eq!(events[1].as_ref().unwrap().data, "{\"n\":2}");
}

#[tokio::test]
async fn test_sends_user_agent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(STREAM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_raw("data: x\n\n", "text/event-stream"))
        .mount(&mock_server)
        .await;

    let source = source_for(&mock_server);
    let _ = source.connect().await.unwrap().collect::<Vec<_>>().await;

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let user_agent = requests[0]
        .headers
        .get("user-agent")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(user_agent.starts_with("wiki-forwarder/"), "{user_agent}");
}

#[tokio::test]
async fn test_events_before_decode_error_are_delivered() {
    let mock_server = MockServer::start().await;
    let long_line = "x".repeat(64);
    let body = format!("data: e1\n\ndata: e2\n\ndata: {long_line}\n\n");

    Mock::given(method("GET"))
        .and(path(STREAM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&mock_server)
        .await;

    let source = HttpEventSource::new(SourceConfig {
        url: format!("{}{}", mock_server.uri(), STREAM_PATH),
        max_line_bytes: 32,
        ..Default::default()
    })
    .unwrap();
    let events: Vec<_> = source.connect().await.unwrap().collect().await;

    assert_eq!(events.len(), 3);
    assert_eq!(events[0].as_ref().unwrap().data, "e1");
    assert_eq!(events[1].as_ref().unwrap().data, "e2");
    assert!(matches!(events[2], Err(SourceError::Decode(_))));
}

#[tokio::test]
async fn test_non_success_status_is_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(STREAM_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&mock_server)
        .await;

    let source = source_for(&mock_server);

    match source.connect().await {
        Err(SourceError::Status { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "Service Unavailable");
        }
        Err(other) => panic!("Expected Status error, got: {other:?}"),
        Ok(_) => panic!("Expected Status error, got a stream"),
    }
}

#[tokio::test]
async fn test_connection_refused_is_connect_error() {
    // grab a free port, then close it again
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let source = HttpEventSource::new(SourceConfig {
        url: format!("http://127.0.0.1:{port}{STREAM_PATH}"),
        ..Default::default()
    })
    .unwrap();

    let result = source.connect().await;
    assert!(matches!(result, Err(SourceError::Connect(_))));
}

#[tokio::test]
async fn test_forwarder_over_http_end_to_end() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(STREAM_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("data: e1\n\ndata: e2\n\ndata: e3\n\n", "text/event-stream"),
        )
        .mount(&mock_server)
        .await;

    let source: Arc<dyn EventSource> = Arc::new(source_for(&mock_server));
    let recorder = RecordingPublisher::new();
    let publisher: Arc<dyn EventPublisher> = recorder.clone();
    let config = ForwarderConfig {
        on_complete: CompletionPolicy::Halt,
        ..ForwarderConfig::default()
    };
    let forwarder = StreamForwarder::new(config, source, publisher).unwrap();
    let mut state = forwarder.watch_state();

    forwarder.start().unwrap();
    tokio::time::timeout(
        Duration::from_secs(10),
        state.wait_for(|s| *s == ForwarderState::Halted),
    )
    .await
    .expect("forwarder did not halt")
    .unwrap();

    assert_eq!(recorder.values(), vec!["e1", "e2", "e3"]);
    forwarder.stop().await;
}
