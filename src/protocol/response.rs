//! Response definitions
//!
//! Represents lines received from the feeder firmware.

/// Substring of the handshake acknowledgment
pub const PONG_MARKER: &str = "PONG";

/// Substring acknowledging that a dispense has started
pub const DISPENSING_MARKER: &str = "DISPENSING";

/// Exact line that ends a dispense
pub const DISPENSE_COMPLETE: &str = "DISPENSE_COMPLETE";

/// A classified response line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Handshake acknowledgment (line contains `PONG`)
    Pong,

    /// Dispense started (line contains `DISPENSING`)
    Dispensing,

    /// Terminal marker of a dispense
    DispenseComplete,

    /// Any other non-empty line
    Status(String),
}

impl Reply {
    /// Classify a trimmed, non-empty line
    pub fn classify(line: &str) -> Self {
        if line == DISPENSE_COMPLETE {
            Reply::DispenseComplete
        } else if line.contains(PONG_MARKER) {
            Reply::Pong
        } else if line.contains(DISPENSING_MARKER) {
            Reply::Dispensing
        } else {
            Reply::Status(line.to_string())
        }
    }
}
