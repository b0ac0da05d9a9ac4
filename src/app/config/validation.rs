use super::{Config, ConfigError};
use url::Url;

/// Kafka's own limit on topic name length.
const MAX_TOPIC_LEN: usize = 249;

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.stream_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid stream URL '{}': {}", self.stream_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(format!(
                "Stream URL must be http or https, got '{}'",
                url.scheme()
            )));
        }

        validate_topic(&self.topic)?;

        if self.brokers.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "Brokers cannot be empty".to_string(),
            ));
        }

        if self.item_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "Item timeout must be greater than 0".to_string(),
            ));
        }

        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "Connection timeout must be greater than 0".to_string(),
            ));
        }

        if self.message_timeout_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "Message timeout must be greater than 0".to_string(),
            ));
        }

        if self.health_port == Some(0) {
            return Err(ConfigError::InvalidConfig(
                "Health port cannot be 0".to_string(),
            ));
        }

        self.backoff_policy()
            .validate()
            .map_err(|e| ConfigError::InvalidConfig(e.to_string()))?;

        Ok(())
    }
}

fn validate_topic(topic: &str) -> Result<(), ConfigError> {
    if topic.is_empty() {
        return Err(ConfigError::InvalidConfig(
            "Topic cannot be empty".to_string(),
        ));
    }
    if topic.len() > MAX_TOPIC_LEN {
        return Err(ConfigError::InvalidConfig(format!(
            "Topic is longer than {MAX_TOPIC_LEN} characters"
        )));
    }
    if !topic
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(ConfigError::InvalidConfig(format!(
            "Topic '{topic}' may only contain [a-zA-Z0-9._-]"
        )));
    }
    Ok(())
}
