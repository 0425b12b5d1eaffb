//! Transport Module
//!
//! The byte-stream seam between the controller and the device.
//!
//! ## Architecture
//! - `Connector` opens a `Transport` from a `Config`
//! - `Transport` is a blocking byte stream whose reads honour the
//!   configured timeout (returning `TimedOut`/`WouldBlock` or `Ok(0)`
//!   instead of blocking forever)
//! - `SerialConnector` is the production implementation over `serialport`

mod serial;

use std::io::{self, Read, Write};

use crate::config::Config;
use crate::error::Result;

pub use serial::{SerialConnector, SerialTransport};

/// A connected, exclusively owned byte stream to the device
pub trait Transport: Read + Write + Send {
    /// Discard anything the device sent that has not been read yet
    fn clear_input(&mut self) -> io::Result<()>;
}

/// Opens transports. Failures map to `ZafError::TransportOpen`.
pub trait Connector: Send {
    fn open(&self, config: &Config) -> Result<Box<dyn Transport>>;
}
