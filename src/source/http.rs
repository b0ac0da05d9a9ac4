use super::sse::DEFAULT_MAX_LINE_BYTES;
use super::{EventSource, EventStream, SourceError, SseDecoder};
use futures::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL, HeaderValue};
use reqwest::{Client, ClientBuilder};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Longest error body kept from a non-2xx response.
const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub url: String,
    pub connect_timeout: Duration,
    pub user_agent: String,
    /// Longest SSE line accepted before the connection is treated as broken
    pub max_line_bytes: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: "https://stream.wikimedia.org/v2/stream/mediawiki.page_change.v1".to_string(),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("wiki-forwarder/{}", env!("CARGO_PKG_VERSION")),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }
}

/// Reads a `text/event-stream` response body over HTTP(S).
///
/// The client has no overall request timeout: the response is meant to stay
/// open indefinitely, and inactivity is policed by the forwarder instead.
#[derive(Debug, Clone)]
pub struct HttpEventSource {
    client: Client,
    url: Url,
    endpoint: String,
    max_line_bytes: usize,
}

impl HttpEventSource {
    pub fn new(config: SourceConfig) -> Result<Self, SourceError> {
        let url: Url = config.url.parse().map_err(|e| {
            SourceError::InvalidConfiguration(format!("Invalid stream URL '{}': {}", config.url, e))
        })?;

        let client = ClientBuilder::new()
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                SourceError::InvalidConfiguration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            endpoint: url.to_string(),
            url,
            max_line_bytes: config.max_line_bytes,
        })
    }

    async fn open(&self) -> Result<EventStream, SourceError> {
        debug!(url = %self.url, "Opening event stream");

        let response = self
            .client
            .get(self.url.clone())
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
            .header(CACHE_CONTROL, HeaderValue::from_static("no-cache"))
            .send()
            .await
            .map_err(|e| SourceError::Connect(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let mut decoder = SseDecoder::with_max_line_bytes(self.max_line_bytes);
        let events = response
            .bytes_stream()
            .map(move |chunk| match chunk {
                Ok(bytes) => decoder.feed(&bytes),
                Err(e) => vec![Err(SourceError::Transport(e.to_string()))],
            })
            .flat_map(futures::stream::iter);

        Ok(events.boxed())
    }
}

impl EventSource for HttpEventSource {
    fn connect(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<EventStream, SourceError>> + Send + '_>> {
        Box::pin(self.open())
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
