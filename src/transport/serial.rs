//! Serial port transport
//!
//! Opens the USB serial device with the configured baud rate and read
//! timeout.

use std::io::{self, Read, Write};

use serialport::{ClearBuffer, SerialPort};

use super::{Connector, Transport};
use crate::config::Config;
use crate::error::{Result, ZafError};

/// Opens `serialport` devices
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialConnector;

impl Connector for SerialConnector {
    fn open(&self, config: &Config) -> Result<Box<dyn Transport>> {
        let port = serialport::new(config.port.as_str(), config.baud_rate)
            .timeout(config.read_timeout())
            .open()
            .map_err(|e| ZafError::TransportOpen {
                port: config.port.clone(),
                source: io::Error::from(e),
            })?;

        tracing::debug!(
            "Opened {} at {} baud (timeout {}ms)",
            config.port,
            config.baud_rate,
            config.read_timeout_ms
        );

        Ok(Box::new(SerialTransport { port }))
    }
}

/// An open serial port
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl Read for SerialTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl Transport for SerialTransport {
    fn clear_input(&mut self) -> io::Result<()> {
        self.port.clear(ClearBuffer::Input).map_err(io::Error::from)
    }
}
