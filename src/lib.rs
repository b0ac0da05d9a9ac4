#![warn(rust_2018_idioms)]
// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
#![allow(
    clippy::cast_possible_truncation, // Durations in millis fit in u64
    clippy::cast_precision_loss,      // Jitter math on f64 millis
    clippy::cast_sign_loss,           // Jitter factor is validated to [0, 1]
    clippy::missing_errors_doc,       // Internal API
    clippy::module_name_repetitions,  // e.g. SourceError in source module
    clippy::must_use_candidate
)]

pub mod app;
pub mod broker;
pub mod domain;
pub mod forwarder;
pub mod source;

// Re-export main types for easy access
pub use app::{App, Config};
pub use forwarder::{ForwarderState, ForwarderStatus, StreamForwarder};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
