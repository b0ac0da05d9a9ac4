//! Upstream event sources.
//!
//! `EventSource` is the port the forwarder reads from. `HttpEventSource` is the
//! production adapter that speaks `text/event-stream` over reqwest.

pub mod http;
pub mod sse;

pub use http::{HttpEventSource, SourceConfig};
pub use sse::SseDecoder;

use crate::domain::StreamEvent;
use futures::stream::BoxStream;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Connection failed: {0}")]
    Connect(String),
    #[error("HTTP error: {status} - {body}")]
    Status { status: u16, body: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("No event received within {0:?}")]
    Timeout(Duration),
}

/// Live event stream of one connection. Ends when the server closes it.
pub type EventStream = BoxStream<'static, Result<StreamEvent, SourceError>>;

/// Something the forwarder can (re)connect to and read events from.
///
/// Each call to `connect` opens a fresh connection; the forwarder calls it
/// again after every failure.
pub trait EventSource: Send + Sync {
    fn connect(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<EventStream, SourceError>> + Send + '_>>;

    /// Human-readable endpoint, used in logs.
    fn endpoint(&self) -> &str;
}
