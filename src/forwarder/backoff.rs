use rand::Rng;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackoffError {
    #[error("Invalid backoff configuration: {0}")]
    InvalidConfig(String),
}

/// Exponential backoff with uniform jitter, used between reconnect attempts.
///
/// Attempts are 1-based: attempt 1 waits around `initial_delay`, every later
/// attempt doubles it until `max_delay` caps the growth. With `jitter = 0.5`
/// the actual wait is sampled from `[base * 0.5, base * 1.5]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub jitter: f64,
    /// `None` retries forever.
    pub max_retries: Option<u32>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            jitter: 0.5,
            max_retries: None,
        }
    }
}

impl BackoffPolicy {
    pub fn validate(&self) -> Result<(), BackoffError> {
        if self.initial_delay.is_zero() {
            return Err(BackoffError::InvalidConfig(
                "Initial delay must be greater than 0".to_string(),
            ));
        }
        if self.max_delay < self.initial_delay {
            return Err(BackoffError::InvalidConfig(format!(
                "Max delay ({:?}) must be at least the initial delay ({:?})",
                self.max_delay, self.initial_delay
            )));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(BackoffError::InvalidConfig(format!(
                "Jitter factor must be within [0, 1], got {}",
                self.jitter
            )));
        }
        if self.max_retries == Some(0) {
            return Err(BackoffError::InvalidConfig(
                "Max retries must be greater than 0 when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Un-jittered delay for `attempt`. Attempt 0 is treated as attempt 1.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.max(1) - 1;
        let multiplier = 2_u32.checked_pow(exponent).unwrap_or(u32::MAX);

        self.initial_delay
            .checked_mul(multiplier)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Inclusive range the jittered delay for `attempt` is drawn from.
    pub fn jitter_bounds(&self, attempt: u32) -> (Duration, Duration) {
        let base = self.base_delay(attempt);
        (
            base.mul_f64(1.0 - self.jitter),
            base.mul_f64(1.0 + self.jitter),
        )
    }

    pub fn delay_with<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let (low, high) = self.jitter_bounds(attempt);
        if low >= high {
            return low;
        }
        rng.random_range(low..=high)
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        self.delay_with(attempt, &mut rand::rng())
    }

    /// Whether reconnect `attempt` may still be made.
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_retries.is_none_or(|max| attempt <= max)
    }
}
