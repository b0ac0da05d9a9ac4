use super::{ConfigError, LogFormat, LogLevel};
use crate::broker::KafkaConfig;
use crate::forwarder::{BackoffPolicy, CompletionPolicy, ForwarderConfig};
use crate::source::SourceConfig;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(author, version, about, long_about = None)]
#[serde(default)]
pub struct Config {
    /// Server-sent-event stream to subscribe to
    #[arg(
        long,
        env = "STREAM_URL",
        default_value = "https://stream.wikimedia.org/v2/stream/mediawiki.page_change.v1"
    )]
    pub stream_url: String,

    /// Kafka topic events are published to
    #[arg(long, env = "KAFKA_TOPIC", default_value = "wiki")]
    pub topic: String,

    /// Kafka bootstrap servers (comma-separated)
    #[arg(long, env = "KAFKA_BROKERS", default_value = "localhost:9092")]
    pub brokers: String,

    /// Kafka client id
    #[arg(long, env = "KAFKA_CLIENT_ID", default_value = "wiki-forwarder")]
    pub client_id: String,

    /// How long the producer keeps trying to deliver one message
    #[arg(long, env = "KAFKA_MESSAGE_TIMEOUT_MS", default_value = "5000")]
    pub message_timeout_ms: u64,

    /// Maximum silence on the stream before reconnecting
    #[arg(long, env = "ITEM_TIMEOUT_SECS", default_value = "30")]
    pub item_timeout_secs: u64,

    /// TCP/TLS connect timeout for the stream
    #[arg(long, env = "CONNECT_TIMEOUT_SECS", default_value = "10")]
    pub connect_timeout_secs: u64,

    /// First reconnect delay
    #[arg(long, env = "INITIAL_BACKOFF_MS", default_value = "1000")]
    pub initial_backoff_ms: u64,

    /// Upper bound of the reconnect delay
    #[arg(long, env = "MAX_BACKOFF_MS", default_value = "10000")]
    pub max_backoff_ms: u64,

    /// Jitter factor applied to every reconnect delay (0..=1)
    #[arg(long, env = "BACKOFF_JITTER", default_value = "0.5")]
    pub jitter: f64,

    /// Give up after this many consecutive failures (retries forever if unset)
    #[arg(long, env = "MAX_RETRIES")]
    pub max_retries: Option<u32>,

    /// What to do when the server closes the stream
    #[arg(long, env = "ON_COMPLETE", default_value = "reconnect")]
    pub on_complete: CompletionPolicy,

    /// Grace period for the subscription to stop on shutdown
    #[arg(long, env = "SHUTDOWN_GRACE_SECS", default_value = "4")]
    pub shutdown_grace_secs: u64,

    /// Serve GET /v1/health on this port
    #[arg(long, env = "HEALTH_PORT")]
    pub health_port: Option<u16>,

    /// Interval of the periodic status log line (0 disables it)
    #[arg(long, env = "STATUS_INTERVAL_SECS", default_value = "60")]
    pub status_interval_secs: u64,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, env = "LOG_FORMAT", default_value = "json")]
    pub log_format: LogFormat,

    /// Configuration file path (optional)
    #[arg(long, env = "CONFIG_FILE")]
    #[serde(skip)]
    pub config_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stream_url: "https://stream.wikimedia.org/v2/stream/mediawiki.page_change.v1"
                .to_string(),
            topic: "wiki".to_string(),
            brokers: "localhost:9092".to_string(),
            client_id: "wiki-forwarder".to_string(),
            message_timeout_ms: 5000,
            item_timeout_secs: 30,
            connect_timeout_secs: 10,
            initial_backoff_ms: 1000,
            max_backoff_ms: 10_000,
            jitter: 0.5,
            max_retries: None,
            on_complete: CompletionPolicy::Reconnect,
            shutdown_grace_secs: 4,
            health_port: None,
            status_interval_secs: 60,
            log_level: LogLevel::Info,
            log_format: LogFormat::Json,
            config_file: None,
        }
    }
}

impl Config {
    /// Parses CLI args (with env fallbacks). When `--config-file` is given the
    /// file replaces the parsed values.
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = Config::try_parse_from(args)?;

        if let Some(config_file) = &config.config_file {
            return Self::from_file(config_file);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(&path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.config_file = Some(path.as_ref().to_path_buf());
        config.validate()?;
        Ok(config)
    }

    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            initial_delay: Duration::from_millis(self.initial_backoff_ms),
            max_delay: Duration::from_millis(self.max_backoff_ms),
            jitter: self.jitter,
            max_retries: self.max_retries,
        }
    }

    pub fn forwarder_config(&self) -> ForwarderConfig {
        ForwarderConfig {
            topic: self.topic.clone(),
            item_timeout: Duration::from_secs(self.item_timeout_secs),
            backoff: self.backoff_policy(),
            on_complete: self.on_complete,
            shutdown_grace: Duration::from_secs(self.shutdown_grace_secs),
            jitter_seed: None,
        }
    }

    pub fn source_config(&self) -> SourceConfig {
        SourceConfig {
            url: self.stream_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            ..SourceConfig::default()
        }
    }

    pub fn kafka_config(&self) -> KafkaConfig {
        KafkaConfig {
            brokers: self.brokers.clone(),
            client_id: self.client_id.clone(),
            message_timeout: Duration::from_millis(self.message_timeout_ms),
        }
    }

    pub fn status_interval(&self) -> Option<Duration> {
        (self.status_interval_secs > 0).then(|| Duration::from_secs(self.status_interval_secs))
    }
}
