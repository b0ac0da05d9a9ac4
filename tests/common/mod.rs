#![allow(dead_code)]

use futures::StreamExt;
use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use wiki_forwarder::broker::{EventPublisher, PendingDelivery, PublishError};
use wiki_forwarder::domain::{BrokerMessage, StreamEvent};
use wiki_forwarder::forwarder::{ForwarderConfig, StreamForwarder};
use wiki_forwarder::source::{EventSource, EventStream, SourceError};

/// One item of a scripted connection.
#[derive(Debug, Clone)]
pub enum Step {
    Event(String),
    Wait(Duration),
    Error(SourceError),
    /// Never yield again (until the forwarder times out or is cancelled).
    Stall,
}

pub fn event(data: &str) -> Step {
    Step::Event(data.to_string())
}

/// What the next `connect` call does.
#[derive(Debug, Clone)]
pub enum Script {
    Fail(SourceError),
    /// Connects, then plays the steps; the stream ends after the last one.
    Steps(Vec<Step>),
    /// Connects and emits `tick-N` every interval, forever.
    Endless(Duration),
}

/// Fake event source driven by a queue of scripts.
///
/// Once the queue runs dry every connect yields a stream that never produces.
pub struct ScriptedSource {
    scripts: Mutex<VecDeque<Script>>,
    connects: Mutex<Vec<Instant>>,
}

impl ScriptedSource {
    pub fn new(scripts: impl IntoIterator<Item = Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into_iter().collect()),
            connects: Mutex::new(Vec::new()),
        })
    }

    pub fn connect_times(&self) -> Vec<Instant> {
        self.connects.lock().unwrap().clone()
    }

    pub fn connect_count(&self) -> usize {
        self.connects.lock().unwrap().len()
    }

    fn play(steps: Vec<Step>) -> EventStream {
        futures::stream::unfold(steps.into_iter(), |mut steps| async move {
            loop {
                match steps.next()? {
                    Step::Wait(delay) => tokio::time::sleep(delay).await,
                    Step::Event(data) => return Some((Ok(StreamEvent::new(data)), steps)),
                    Step::Error(e) => return Some((Err(e), steps)),
                    Step::Stall => std::future::pending::<()>().await,
                }
            }
        })
        .boxed()
    }

    fn endless(every: Duration) -> EventStream {
        futures::stream::unfold(0_u64, move |n| async move {
            tokio::time::sleep(every).await;
            Some((Ok(StreamEvent::new(format!("tick-{n}"))), n + 1))
        })
        .boxed()
    }
}

impl EventSource for ScriptedSource {
    fn connect(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<EventStream, SourceError>> + Send + '_>> {
        self.connects.lock().unwrap().push(Instant::now());
        let script = self.scripts.lock().unwrap().pop_front();

        Box::pin(async move {
            match script {
                Some(Script::Fail(e)) => Err(e),
                Some(Script::Steps(steps)) => Ok(Self::play(steps)),
                Some(Script::Endless(every)) => Ok(Self::endless(every)),
                None => Ok(futures::stream::pending::<Result<StreamEvent, SourceError>>().boxed()),
            }
        })
    }

    fn endpoint(&self) -> &str {
        "scripted://test"
    }
}

/// Publisher that records every message it is handed, in order.
#[derive(Default)]
pub struct RecordingPublisher {
    messages: Mutex<Vec<BrokerMessage>>,
    fail_delivery: Mutex<HashSet<String>>,
    reject_enqueue: Mutex<HashSet<String>>,
}

impl RecordingPublisher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Delivery of a message with this payload will be reported as failed.
    pub fn fail_delivery_of(&self, value: &str) {
        self.fail_delivery.lock().unwrap().insert(value.to_string());
    }

    /// Enqueueing a message with this payload will be refused.
    pub fn reject_enqueue_of(&self, value: &str) {
        self.reject_enqueue.lock().unwrap().insert(value.to_string());
    }

    pub fn messages(&self) -> Vec<BrokerMessage> {
        self.messages.lock().unwrap().clone()
    }

    pub fn values(&self) -> Vec<String> {
        self.messages().into_iter().map(|m| m.value).collect()
    }

    pub fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    /// Polls until at least `n` messages were sent. Panics after 10 minutes of
    /// (possibly paused) tokio time.
    pub async fn wait_for(&self, n: usize) {
        let deadline = Instant::now() + Duration::from_secs(600);
        while self.count() < n {
            assert!(
                Instant::now() < deadline,
                "expected {n} messages, got {}",
                self.count()
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl EventPublisher for RecordingPublisher {
    fn send(&self, message: BrokerMessage) -> Result<PendingDelivery, PublishError> {
        if self.reject_enqueue.lock().unwrap().contains(&message.value) {
            return Err(PublishError::Enqueue("queue full".to_string()));
        }

        let fail = self.fail_delivery.lock().unwrap().contains(&message.value);
        self.messages.lock().unwrap().push(message);

        Ok(Box::pin(async move {
            if fail {
                Err(PublishError::Delivery("broker unavailable".to_string()))
            } else {
                Ok(())
            }
        }))
    }
}

pub fn forwarder(
    config: ForwarderConfig,
    source: &Arc<ScriptedSource>,
    publisher: &Arc<RecordingPublisher>,
) -> StreamForwarder {
    let source: Arc<dyn EventSource> = source.clone();
    let publisher: Arc<dyn EventPublisher> = publisher.clone();
    StreamForwarder::new(config, source, publisher).unwrap()
}

pub fn seeded_config() -> ForwarderConfig {
    ForwarderConfig {
        jitter_seed: Some(42),
        ..ForwarderConfig::default()
    }
}
