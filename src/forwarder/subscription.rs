//! The background task behind a running forwarder.

use super::state::{ForwarderState, StatusTracker};
use super::{CompletionPolicy, ForwarderConfig};
use crate::broker::EventPublisher;
use crate::domain::{BrokerMessage, StreamEvent};
use crate::source::{EventSource, SourceError};
use futures::StreamExt;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Handle to the live subscription: a cancellation token plus the task it stops.
#[derive(Debug)]
pub struct SubscriptionHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SubscriptionHandle {
    pub(super) fn spawn(ctx: SubscriptionContext) -> Self {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(ctx, cancel.clone()));
        Self { cancel, task }
    }

    /// Cancels and waits for the task, aborting it if `grace` runs out.
    pub async fn shutdown(self, grace: Duration) {
        self.cancel.cancel();
        let abort = self.task.abort_handle();

        match tokio::time::timeout(grace, self.task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) if e.is_cancelled() => {}
            Ok(Err(e)) => error!("Subscription task panicked: {}", e),
            Err(_) => {
                warn!(
                    "Subscription task did not stop within {:?}, aborting",
                    grace
                );
                abort.abort();
            }
        }
    }

    pub(super) fn abort(&self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

pub(super) struct SubscriptionContext {
    pub source: Arc<dyn EventSource>,
    pub publisher: Arc<dyn EventPublisher>,
    pub status: Arc<StatusTracker>,
    pub config: ForwarderConfig,
}

enum Outcome {
    Cancelled,
    Completed,
    Failed(SourceError),
}

async fn run(ctx: SubscriptionContext, cancel: CancellationToken) {
    let backoff = ctx.config.backoff;
    let mut rng = match ctx.config.jitter_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    // consecutive failed attempts; reset once a fresh connection yields an event
    let mut failures: u32 = 0;

    loop {
        let reason = match stream_once(&ctx, &cancel, &mut failures).await {
            Outcome::Cancelled => break,
            Outcome::Completed => {
                error!(
                    endpoint = ctx.source.endpoint(),
                    "Event stream completed unexpectedly"
                );
                if ctx.config.on_complete == CompletionPolicy::Halt {
                    ctx.status.set_state(ForwarderState::Halted);
                    break;
                }
                "stream completed".to_string()
            }
            Outcome::Failed(e) => {
                error!(endpoint = ctx.source.endpoint(), error = %e, "Event stream failed");
                e.to_string()
            }
        };

        failures = failures.saturating_add(1);
        ctx.status.stats().record_failure(failures);

        if !backoff.allows(failures) {
            error!(
                attempts = failures,
                "Retries exhausted, forwarding halted until restart"
            );
            ctx.status.set_state(ForwarderState::Halted);
            break;
        }

        let delay = backoff.delay_with(failures, &mut rng);
        ctx.status.set_state(ForwarderState::Retrying);
        warn!(
            attempt = failures,
            delay_ms = delay.as_millis() as u64,
            reason = %reason,
            "Reconnecting to event stream"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
        ctx.status.stats().record_reconnect();
    }

    debug!("Subscription task finished");
}

async fn stream_once(
    ctx: &SubscriptionContext,
    cancel: &CancellationToken,
    failures: &mut u32,
) -> Outcome {
    ctx.status.set_state(ForwarderState::Subscribing);
    let item_timeout = ctx.config.item_timeout;

    let connected = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Outcome::Cancelled,
        result = tokio::time::timeout(item_timeout, ctx.source.connect()) => result,
    };
    let mut stream = match connected {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => return Outcome::Failed(e),
        Err(_) => return Outcome::Failed(SourceError::Timeout(item_timeout)),
    };

    ctx.status.set_state(ForwarderState::Streaming);
    info!(endpoint = ctx.source.endpoint(), "Connected to event stream");
    let mut first_event = true;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Outcome::Cancelled,
            next = tokio::time::timeout(item_timeout, stream.next()) => next,
        };

        match next {
            Err(_) => return Outcome::Failed(SourceError::Timeout(item_timeout)),
            Ok(None) => return Outcome::Completed,
            Ok(Some(Err(e))) => return Outcome::Failed(e),
            Ok(Some(Ok(event))) => {
                if std::mem::take(&mut first_event) && *failures > 0 {
                    info!(
                        failed_attempts = *failures,
                        "Event stream recovered"
                    );
                    *failures = 0;
                    ctx.status.stats().reset_failures();
                }
                forward(ctx, event);
            }
        }
    }
}

/// Enqueues one event and awaits its delivery on a separate task. Failed
/// events are logged and dropped.
fn forward(ctx: &SubscriptionContext, event: StreamEvent) {
    let stats = ctx.status.stats().clone();
    stats.record_event();

    let topic = ctx.config.topic.clone();
    let message = BrokerMessage::from_event(&topic, event);

    match ctx.publisher.send(message) {
        Ok(delivery) => {
            tokio::spawn(async move {
                match delivery.await {
                    Ok(()) => stats.record_published(),
                    Err(e) => {
                        stats.record_publish_failure();
                        error!(topic = %topic, error = %e, "Failed to deliver event to broker");
                    }
                }
            });
        }
        Err(e) => {
            stats.record_publish_failure();
            error!(topic = %topic, error = %e, "Failed to send event to broker");
        }
    }
}
