//! Incremental decoder for the `text/event-stream` wire format.
//!
//! Bytes arrive in arbitrary chunks; a line is only decoded once its
//! terminator has been seen, so multi-byte UTF-8 sequences split across
//! chunks are handled. An event still being assembled when the stream ends
//! is discarded.

use super::SourceError;
use crate::domain::StreamEvent;
use std::time::Duration;

/// Upper bound on a single line.
pub const DEFAULT_MAX_LINE_BYTES: usize = 4 * 1024 * 1024;

const BOM: char = '\u{feff}';

#[derive(Debug)]
pub struct SseDecoder {
    line: Vec<u8>,
    pending_cr: bool,
    first_line: bool,
    data: Vec<String>,
    event_type: Option<String>,
    id: Option<String>,
    retry: Option<Duration>,
    max_line_bytes: usize,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::with_max_line_bytes(DEFAULT_MAX_LINE_BYTES)
    }

    pub fn with_max_line_bytes(max_line_bytes: usize) -> Self {
        Self {
            line: Vec::new(),
            pending_cr: false,
            first_line: true,
            data: Vec::new(),
            event_type: None,
            id: None,
            retry: None,
            max_line_bytes,
        }
    }

    /// Feeds a chunk and returns every event completed by it, in order.
    ///
    /// An overlong line ends the batch with an error; events framed before it
    /// in the same chunk are still returned ahead of the error.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Result<StreamEvent, SourceError>> {
        let mut decoded = Vec::new();

        for &byte in chunk {
            // CRLF: the LF after a CR was already handled as the line end
            if std::mem::take(&mut self.pending_cr) && byte == b'\n' {
                continue;
            }

            match byte {
                b'\n' => self.end_line(&mut decoded),
                b'\r' => {
                    self.pending_cr = true;
                    self.end_line(&mut decoded);
                }
                _ => {
                    if self.line.len() >= self.max_line_bytes {
                        decoded.push(Err(SourceError::Decode(format!(
                            "line exceeds {} bytes",
                            self.max_line_bytes
                        ))));
                        return decoded;
                    }
                    self.line.push(byte);
                }
            }
        }

        decoded
    }

    fn end_line(&mut self, decoded: &mut Vec<Result<StreamEvent, SourceError>>) {
        let raw = std::mem::take(&mut self.line);
        // invalid sequences become U+FFFD
        let mut line = String::from_utf8_lossy(&raw).into_owned();

        if std::mem::take(&mut self.first_line) && line.starts_with(BOM) {
            line.remove(0);
        }

        if line.is_empty() {
            if let Some(event) = self.dispatch() {
                decoded.push(Ok(event));
            }
            return;
        }

        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line.as_str(), ""),
        };

        match field {
            "data" => self.data.push(value.to_string()),
            "event" => self.event_type = Some(value.to_string()),
            "id" if !value.contains('\0') => self.id = Some(value.to_string()),
            "retry" if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) => {
                if let Ok(millis) = value.parse::<u64>() {
                    self.retry = Some(Duration::from_millis(millis));
                }
            }
            _ => {}
        }
    }

    fn dispatch(&mut self) -> Option<StreamEvent> {
        let event_type = self.event_type.take();
        let id = self.id.take();
        let retry = self.retry.take();

        if self.data.is_empty() {
            return None;
        }

        let data = std::mem::take(&mut self.data).join("\n");
        Some(StreamEvent {
            event_type,
            id,
            data,
            retry,
        })
    }
}
