use std::time::Duration;

/// A single event decoded from a text event stream.
///
/// Only `data` is forwarded; the framing fields are kept for logging.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StreamEvent {
    pub event_type: Option<String>,
    pub id: Option<String>,
    pub data: String,
    /// Reconnection hint sent by the server (`retry:` field).
    pub retry: Option<Duration>,
}

impl StreamEvent {
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            ..Self::default()
        }
    }
}

/// A record produced to the broker. `key` is always `None` for forwarded events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerMessage {
    pub topic: String,
    pub key: Option<String>,
    pub value: String,
}

impl BrokerMessage {
    /// Builds an unkeyed message carrying the event payload unchanged.
    pub fn from_event(topic: &str, event: StreamEvent) -> Self {
        Self {
            topic: topic.to_string(),
            key: None,
            value: event.data,
        }
    }
}
