use super::{EventPublisher, PendingDelivery, PublishError};
use crate::domain::BrokerMessage;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone)]
pub struct KafkaConfig {
    /// Comma-separated bootstrap servers
    pub brokers: String,
    pub client_id: String,
    /// How long librdkafka keeps retrying a message before reporting failure
    pub message_timeout: Duration,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            client_id: "wiki-forwarder".to_string(),
            message_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Clone)]
pub struct KafkaPublisher {
    producer: FutureProducer,
}

impl KafkaPublisher {
    pub fn new(config: &KafkaConfig) -> Result<Self, PublishError> {
        if config.brokers.trim().is_empty() {
            return Err(PublishError::Config("Brokers cannot be empty".to_string()));
        }

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("client.id", &config.client_id)
            .set(
                "message.timeout.ms",
                config.message_timeout.as_millis().to_string(),
            )
            .create()
            .map_err(|e| PublishError::Config(e.to_string()))?;

        info!(brokers = %config.brokers, "Kafka producer created");
        Ok(Self { producer })
    }

    /// Blocks until queued messages are delivered or `timeout` elapses.
    pub fn flush(&self, timeout: Duration) -> Result<(), PublishError> {
        self.producer
            .flush(Timeout::After(timeout))
            .map_err(|e| PublishError::Delivery(format!("flush failed: {e}")))
    }
}

impl EventPublisher for KafkaPublisher {
    fn send(&self, message: BrokerMessage) -> Result<PendingDelivery, PublishError> {
        let mut record = FutureRecord::<str, str>::to(&message.topic).payload(&message.value);
        if let Some(key) = message.key.as_deref() {
            record = record.key(key);
        }

        match self.producer.send_result(record) {
            Ok(delivery) => Ok(Box::pin(async move {
                match delivery.await {
                    Ok(Ok(_)) => Ok(()),
                    Ok(Err((e, _))) => Err(PublishError::Delivery(e.to_string())),
                    Err(_) => Err(PublishError::Delivery(
                        "producer dropped before delivery report".to_string(),
                    )),
                }
            })),
            Err((e, _)) => Err(PublishError::Enqueue(e.to_string())),
        }
    }
}
