//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! ┌─────────────────────────────────────┬──────┐
//! │  KEYWORD[:arg[:arg...]]  (ASCII)     │ '\n' │
//! └─────────────────────────────────────┴──────┘
//! ```
//!
//! ### Commands
//! - `PING`
//! - `DISPENSE:<cycles>`
//! - `RUMBLE:<0|1>`
//! - `PUMP:<id>:<speed>:<direction>`
//!
//! ### Response Format
//! One UTF-8 line per read, terminated by `'\n'`. Trailing whitespace
//! (including `'\r'`) is stripped.

use std::io::{self, Read, Write};
use std::str::FromStr;
use std::time::{Duration, Instant};

use bytes::BytesMut;

use super::Command;
use crate::error::{Result, ZafError};

/// Line terminator used in both directions
pub const LINE_TERMINATOR: u8 = b'\n';

/// Bytes requested from the transport per read call
const READ_CHUNK: usize = 64;

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to its wire bytes, including the trailing newline
pub fn encode_command(command: &Command) -> Vec<u8> {
    let mut message = command.to_string().into_bytes();
    message.push(LINE_TERMINATOR);
    message
}

/// Decode a command from its wire text.
///
/// Accepts the text with or without the trailing newline.
pub fn decode_command(text: &str) -> Result<Command> {
    let text = text.trim_end();
    let mut parts = text.split(':');
    let keyword = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    match (keyword, args.as_slice()) {
        ("PING", []) => Ok(Command::Ping),
        ("DISPENSE", [cycles]) => Command::dispense(parse_arg(cycles, "cycles")?),
        ("RUMBLE", ["0"]) => Ok(Command::Rumble { on: false }),
        ("RUMBLE", ["1"]) => Ok(Command::Rumble { on: true }),
        ("RUMBLE", [other]) => Err(ZafError::InvalidCommand(format!(
            "RUMBLE state must be 0 or 1, got {:?}",
            other
        ))),
        ("PUMP", [id, speed, direction]) => Command::pump(
            parse_arg(id, "pump id")?,
            parse_arg(speed, "speed")?,
            parse_arg(direction, "direction")?,
        ),
        ("PING" | "DISPENSE" | "RUMBLE" | "PUMP", _) => Err(ZafError::InvalidCommand(format!(
            "{}: wrong number of arguments ({})",
            keyword,
            args.len()
        ))),
        _ => Err(ZafError::InvalidCommand(format!(
            "Unknown command: {:?}",
            text
        ))),
    }
}

/// Parse one numeric argument
fn parse_arg<T: FromStr>(raw: &str, name: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| ZafError::InvalidCommand(format!("{} is out of range: {:?}", name, raw)))
}

impl FromStr for Command {
    type Err = ZafError;

    fn from_str(s: &str) -> Result<Self> {
        decode_command(s)
    }
}

// =============================================================================
// Line Decoding
// =============================================================================

/// Decode one received line: UTF-8, trailing whitespace removed
pub fn decode_line(bytes: &[u8]) -> Result<String> {
    let text = String::from_utf8(bytes.to_vec())?;
    Ok(text.trim_end().to_string())
}

/// Whether a read error means "no data before the timeout"
fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Write a command to a stream
pub fn write_command<W: Write + ?Sized>(writer: &mut W, command: &Command) -> Result<()> {
    let bytes = encode_command(command);
    writer.write_all(&bytes).map_err(ZafError::Write)?;
    writer.flush().map_err(ZafError::Write)?;
    Ok(())
}

/// Splits a byte stream into lines with a per-line deadline.
///
/// Bytes that arrive after a newline stay buffered for the next call, so a
/// caller that stops reading after a given line never consumes the lines
/// behind it.
#[derive(Debug)]
pub struct LineReader {
    buf: BytesMut,
    timeout: Duration,
}

impl LineReader {
    /// Create a reader whose `read_line` blocks at most `timeout`
    pub fn new(timeout: Duration) -> Self {
        Self {
            buf: BytesMut::with_capacity(READ_CHUNK * 2),
            timeout,
        }
    }

    /// Read one line.
    ///
    /// Returns `Ok(None)` when the timeout expires with nothing received.
    /// If the timeout expires part-way through a line, the partial line is
    /// returned. Transport timeouts (`TimedOut`, `WouldBlock`, a zero-byte
    /// read) end the wait immediately.
    ///
    /// The transport is always read at least once, so a zero timeout still
    /// returns whatever has already arrived. A read in progress when the
    /// deadline passes is not cut short: with a device that keeps sending
    /// bytes but no newline, the call can last up to the deadline plus one
    /// transport read timeout.
    pub fn read_line<R: Read + ?Sized>(&mut self, reader: &mut R) -> Result<Option<String>> {
        let deadline = Instant::now() + self.timeout;
        let mut chunk = [0u8; READ_CHUNK];
        let mut attempted = false;

        loop {
            if let Some(pos) = self.buf.iter().position(|&b| b == LINE_TERMINATOR) {
                let line = self.buf.split_to(pos + 1);
                return decode_line(&line).map(Some);
            }

            if attempted && Instant::now() >= deadline {
                break;
            }
            attempted = true;

            match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(ref e) if is_timeout(e) => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(ZafError::Read(e)),
            }
        }

        if self.buf.is_empty() {
            return Ok(None);
        }

        let partial = self.buf.split();
        tracing::trace!("Timed out mid-line after {} bytes", partial.len());
        decode_line(&partial).map(Some)
    }

    /// Drop any buffered bytes
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}
