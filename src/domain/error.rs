use thiserror::Error;

/// Top-level error type for the forwarder service.
///
/// Errors raised inside the running stream never surface here; they are
/// absorbed by the retry loop. Only construction and lifecycle misuse do.
#[derive(Error, Debug)]
pub enum ForwarderError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::app::ConfigError),

    #[error("Broker error: {0}")]
    Broker(#[from] crate::broker::PublishError),

    #[error("Invalid backoff policy: {0}")]
    Backoff(#[from] crate::forwarder::BackoffError),

    #[error("Source error: {0}")]
    Source(#[from] crate::source::SourceError),

    #[error("Logging initialization failed: {0}")]
    Logging(String),

    #[error("Forwarder already started")]
    AlreadyStarted,

    #[error("Forwarder has been stopped")]
    Stopped,

    #[error("Health server error: {0}")]
    Server(#[from] std::io::Error),
}
