//! Stream forwarder: one reconnecting subscription to an event source whose
//! events are republished, unchanged, onto a broker topic.

pub mod backoff;
pub mod state;
pub mod subscription;

pub use backoff::{BackoffError, BackoffPolicy};
pub use state::{ForwarderState, ForwarderStats, ForwarderStatus, StatusTracker};
pub use subscription::SubscriptionHandle;

use crate::broker::EventPublisher;
use crate::domain::ForwarderError;
use crate::source::EventSource;
use clap::ValueEnum;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use subscription::SubscriptionContext;
use tokio::sync::watch;
use tracing::info;

/// What to do when the server ends the stream cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionPolicy {
    /// Treat completion like any other failure and reconnect with backoff.
    #[default]
    Reconnect,
    /// Log and stop forwarding until the process restarts.
    Halt,
}

#[derive(Debug, Clone)]
pub struct ForwarderConfig {
    pub topic: String,
    /// Longest wait for the connection, the first event, or the next event.
    pub item_timeout: Duration,
    pub backoff: BackoffPolicy,
    pub on_complete: CompletionPolicy,
    /// How long `stop` waits for the task before aborting it.
    pub shutdown_grace: Duration,
    /// Seeds the jitter RNG; `None` seeds from the OS.
    pub jitter_seed: Option<u64>,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            topic: "wiki".to_string(),
            item_timeout: Duration::from_secs(30),
            backoff: BackoffPolicy::default(),
            on_complete: CompletionPolicy::Reconnect,
            shutdown_grace: Duration::from_secs(4),
            jitter_seed: None,
        }
    }
}

#[derive(Debug, Default)]
struct Lifecycle {
    subscription: Option<SubscriptionHandle>,
    stopped: bool,
}

/// Forwards every event of `source` to `publisher` under `config.topic`.
///
/// Call `start` once during process start-up and `stop` during shutdown.
/// Dropping the forwarder cancels a subscription that is still running.
pub struct StreamForwarder {
    config: ForwarderConfig,
    source: Arc<dyn EventSource>,
    publisher: Arc<dyn EventPublisher>,
    status: Arc<StatusTracker>,
    lifecycle: Mutex<Lifecycle>,
}

impl StreamForwarder {
    pub fn new(
        config: ForwarderConfig,
        source: Arc<dyn EventSource>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Result<Self, ForwarderError> {
        config.backoff.validate()?;

        Ok(Self {
            config,
            source,
            publisher,
            status: Arc::new(StatusTracker::new()),
            lifecycle: Mutex::new(Lifecycle::default()),
        })
    }

    /// Spawns the subscription task. Must be called within a tokio runtime.
    ///
    /// Stream failures never surface here; only a second `start` or a
    /// `start` after `stop` is an error.
    pub fn start(&self) -> Result<(), ForwarderError> {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.stopped {
            return Err(ForwarderError::Stopped);
        }
        if lifecycle.subscription.is_some() {
            return Err(ForwarderError::AlreadyStarted);
        }

        info!(
            endpoint = self.source.endpoint(),
            topic = %self.config.topic,
            "Starting stream forwarder"
        );

        self.status.mark_started();
        lifecycle.subscription = Some(SubscriptionHandle::spawn(SubscriptionContext {
            source: self.source.clone(),
            publisher: self.publisher.clone(),
            status: self.status.clone(),
            config: self.config.clone(),
        }));

        Ok(())
    }

    /// Cancels the subscription and waits for it to wind down.
    ///
    /// Idempotent. Once this returns, nothing more is published; a call made
    /// while another `stop` is in progress waits for that one to finish.
    pub async fn stop(&self) {
        let subscription = {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.stopped {
                None
            } else {
                lifecycle.stopped = true;
                Some(lifecycle.subscription.take())
            }
        };

        let Some(subscription) = subscription else {
            let mut state = self.status.subscribe();
            let _ = state.wait_for(|s| *s == ForwarderState::Stopped).await;
            return;
        };

        info!("Stream forwarder is being closed");
        if let Some(subscription) = subscription {
            subscription.shutdown(self.config.shutdown_grace).await;
            info!("Event stream subscription cancelled");
        }
        self.status.set_state(ForwarderState::Stopped);
    }

    pub fn state(&self) -> ForwarderState {
        self.status.state()
    }

    pub fn status(&self) -> ForwarderStatus {
        self.status.snapshot()
    }

    pub fn watch_state(&self) -> watch::Receiver<ForwarderState> {
        self.status.subscribe()
    }
}

impl Drop for StreamForwarder {
    fn drop(&mut self) {
        if let Some(subscription) = self.lifecycle.get_mut().subscription.take() {
            subscription.abort();
        }
    }
}
