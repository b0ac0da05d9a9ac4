use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Lifecycle of the forwarder's single subscription.
///
/// `Idle → Subscribing → Streaming → (Retrying ⇄ Subscribing) → Stopped`.
/// `Halted` is only reached through the `halt` completion policy or a
/// bounded retry budget running out. `Stopped` has no way out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ForwarderState {
    Idle,
    Subscribing,
    Streaming,
    Retrying,
    Halted,
    Stopped,
}

impl ForwarderState {
    pub fn as_str(self) -> &'static str {
        match self {
            ForwarderState::Idle => "idle",
            ForwarderState::Subscribing => "subscribing",
            ForwarderState::Streaming => "streaming",
            ForwarderState::Retrying => "retrying",
            ForwarderState::Halted => "halted",
            ForwarderState::Stopped => "stopped",
        }
    }

    /// Whether events can still flow (now or after a reconnect).
    pub fn is_live(self) -> bool {
        !matches!(self, ForwarderState::Halted | ForwarderState::Stopped)
    }
}

impl fmt::Display for ForwarderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time liveness snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct ForwarderStatus {
    pub state: ForwarderState,
    pub started_at: Option<DateTime<Utc>>,
    pub last_event_at: Option<DateTime<Utc>>,
    pub events_received: u64,
    pub events_published: u64,
    pub publish_failures: u64,
    pub reconnects: u64,
    pub consecutive_failures: u32,
}

#[derive(Debug, Default)]
pub struct ForwarderStats {
    events_received: AtomicU64,
    events_published: AtomicU64,
    publish_failures: AtomicU64,
    reconnects: AtomicU64,
    consecutive_failures: AtomicU32,
    // millis since epoch, 0 = never
    last_event_at: AtomicI64,
    started_at: AtomicI64,
}

impl ForwarderStats {
    pub fn record_event(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
        self.last_event_at
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    pub fn record_published(&self) {
        self.events_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_publish_failure(&self) {
        self.publish_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self, consecutive: u32) {
        self.consecutive_failures
            .store(consecutive, Ordering::Relaxed);
    }

    pub fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reset_failures(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
    }

    fn mark_started(&self) {
        self.started_at
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }
}

fn timestamp(millis: i64) -> Option<DateTime<Utc>> {
    if millis == 0 {
        None
    } else {
        DateTime::from_timestamp_millis(millis)
    }
}

/// Owns the state channel and counters shared by the forwarder and its task.
#[derive(Debug)]
pub struct StatusTracker {
    state: watch::Sender<ForwarderState>,
    stats: Arc<ForwarderStats>,
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusTracker {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ForwarderState::Idle);
        Self {
            state,
            stats: Arc::new(ForwarderStats::default()),
        }
    }

    pub fn state(&self) -> ForwarderState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ForwarderState> {
        self.state.subscribe()
    }

    /// Moves to `next`. Leaving `Stopped` is refused.
    pub fn set_state(&self, next: ForwarderState) {
        self.state.send_if_modified(|current| {
            if *current == ForwarderState::Stopped || *current == next {
                return false;
            }
            tracing::debug!(from = %current, to = %next, "Forwarder state change");
            *current = next;
            true
        });
    }

    pub fn stats(&self) -> &Arc<ForwarderStats> {
        &self.stats
    }

    pub fn mark_started(&self) {
        self.stats.mark_started();
    }

    pub fn snapshot(&self) -> ForwarderStatus {
        let stats = &self.stats;
        ForwarderStatus {
            state: self.state(),
            started_at: timestamp(stats.started_at.load(Ordering::Relaxed)),
            last_event_at: timestamp(stats.last_event_at.load(Ordering::Relaxed)),
            events_received: stats.events_received.load(Ordering::Relaxed),
            events_published: stats.events_published.load(Ordering::Relaxed),
            publish_failures: stats.publish_failures.load(Ordering::Relaxed),
            reconnects: stats.reconnects.load(Ordering::Relaxed),
            consecutive_failures: stats.consecutive_failures.load(Ordering::Relaxed),
        }
    }
}
