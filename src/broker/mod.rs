//! Broker side of the bridge.
//!
//! `EventPublisher` is the port the forwarder writes to; `KafkaPublisher` is
//! the rdkafka adapter used in production.

pub mod kafka;

pub use kafka::{KafkaConfig, KafkaPublisher};

use crate::domain::BrokerMessage;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("Invalid producer configuration: {0}")]
    Config(String),
    #[error("Failed to enqueue message: {0}")]
    Enqueue(String),
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Resolves once the broker has acknowledged (or rejected) a message.
pub type PendingDelivery = Pin<Box<dyn Future<Output = Result<(), PublishError>> + Send + 'static>>;

/// Topic-based publish, shared across tasks.
///
/// `send` only enqueues: calling it in order keeps messages in order, while
/// the returned futures may complete in any order.
pub trait EventPublisher: Send + Sync {
    fn send(&self, message: BrokerMessage) -> Result<PendingDelivery, PublishError>;
}
