//! Domain layer for wiki-forwarder.
//!
//! Contains the canonical types shared across all modules:
//! - `StreamEvent`: One event decoded from the upstream event stream
//! - `BrokerMessage`: The `(topic, key, value)` triple handed to the broker
//! - `ForwarderError`: Top-level error type

pub mod error;
pub mod event;

pub use error::ForwarderError;
pub use event::{BrokerMessage, StreamEvent};
