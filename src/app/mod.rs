pub mod config;
pub mod health;
pub mod logging;
pub mod shutdown;

pub use config::{Config, ConfigError, LogFormat, LogLevel};
pub use health::{health_router, serve_health};
pub use logging::init_logging;
pub use shutdown::shutdown_signal;

use crate::broker::{EventPublisher, KafkaPublisher};
use crate::domain::ForwarderError;
use crate::forwarder::StreamForwarder;
use crate::source::{EventSource, HttpEventSource};
use std::future::Future;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// The wired-up process: Kafka producer, HTTP stream source and the forwarder
/// between them.
pub struct App {
    config: Config,
    forwarder: Arc<StreamForwarder>,
    publisher: KafkaPublisher,
}

impl App {
    pub fn from_config(config: Config) -> Result<Self, ForwarderError> {
        let publisher = KafkaPublisher::new(&config.kafka_config())?;
        let source = HttpEventSource::new(config.source_config())?;

        let source: Arc<dyn EventSource> = Arc::new(source);
        let shared_publisher: Arc<dyn EventPublisher> = Arc::new(publisher.clone());
        let forwarder = Arc::new(StreamForwarder::new(
            config.forwarder_config(),
            source,
            shared_publisher,
        )?);

        Ok(Self {
            config,
            forwarder,
            publisher,
        })
    }

    pub fn forwarder(&self) -> &Arc<StreamForwarder> {
        &self.forwarder
    }

    /// Runs until SIGINT/SIGTERM.
    pub async fn run(self) -> Result<(), ForwarderError> {
        self.run_until(shutdown_signal()).await
    }

    /// Runs until `shutdown` resolves, then stops the forwarder and flushes
    /// the producer.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ForwarderError>
    where
        F: Future<Output = ()>,
    {
        let background = CancellationToken::new();

        self.forwarder.start()?;

        if let Some(port) = self.config.health_port {
            let forwarder = self.forwarder.clone();
            let token = background.clone();
            tokio::spawn(async move {
                if let Err(e) = serve_health(port, forwarder, token).await {
                    error!("Health endpoint failed: {}", e);
                }
            });
        }

        if let Some(every) = self.config.status_interval() {
            tokio::spawn(report_status(
                self.forwarder.clone(),
                every,
                background.clone(),
            ));
        }

        info!("wiki-forwarder is running. Press Ctrl+C to stop.");
        shutdown.await;

        self.forwarder.stop().await;
        background.cancel();

        let grace = Duration::from_secs(self.config.shutdown_grace_secs);
        let publisher = self.publisher.clone();
        match tokio::task::spawn_blocking(move || publisher.flush(grace)).await {
            Ok(Ok(())) => info!("Producer flushed"),
            Ok(Err(e)) => warn!("Producer flush incomplete: {}", e),
            Err(e) => warn!("Producer flush task failed: {}", e),
        }

        info!("wiki-forwarder stopped.");
        Ok(())
    }
}

/// Logs a status line every `every` until `shutdown` is cancelled.
pub async fn report_status(
    forwarder: Arc<StreamForwarder>,
    every: Duration,
    shutdown: CancellationToken,
) {
    let mut interval = tokio::time::interval(every);
    interval.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => {
                let status = forwarder.status();
                info!(
                    state = %status.state,
                    events_received = status.events_received,
                    events_published = status.events_published,
                    publish_failures = status.publish_failures,
                    reconnects = status.reconnects,
                    last_event_at = ?status.last_event_at,
                    "Forwarder status"
                );
            }
        }
    }
}

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

// Main entry point for the application
pub async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = match Config::from_args(std::env::args_os()) {
        Ok(config) => config,
        Err(ConfigError::Cli(e)) => e.exit(),
        Err(e) => {
            eprintln!("Configuration error: {e}");
            process::exit(1);
        }
    };

    init_logging(config.log_level, config.log_format)?;

    info!("Starting wiki-forwarder v{}", get_version());
    info!(
        "Configuration: stream_url={}, topic={}, brokers={}",
        config.stream_url, config.topic, config.brokers
    );

    match App::from_config(config) {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("Application error: {}", e);
                process::exit(1);
            }
        }
        Err(e) => {
            error!("Startup error: {}", e);
            process::exit(1);
        }
    }

    Ok(())
}
