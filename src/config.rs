//! Configuration for the ZAF controller
//!
//! Centralized configuration with sensible defaults. A `Config` is fixed
//! once a `Controller` is built from it.

use std::time::Duration;

/// Main configuration for a controller instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Serial Configuration
    // -------------------------------------------------------------------------
    /// Serial port path or name (`/dev/ttyACM0`, `COM3`, ...)
    pub port: String,

    /// Baud rate (must match the firmware)
    pub baud_rate: u32,

    /// How long a single line read may block (milliseconds)
    pub read_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Connection Configuration
    // -------------------------------------------------------------------------
    /// Delay after opening the port before first use (milliseconds).
    /// Opening the port resets the board; it ignores input until it boots.
    pub settle_ms: u64,
}

/// Default serial port on Linux hosts
pub const DEFAULT_PORT: &str = "/dev/ttyACM0";

/// Default baud rate of the firmware
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: 2000,
            settle_ms: 2000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Read timeout as a `Duration`
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Settle period as a `Duration`
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the serial port
    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.config.port = port.into();
        self
    }

    /// Set the baud rate
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.config.baud_rate = baud;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the post-open settle period (in milliseconds)
    pub fn settle_ms(mut self, ms: u64) -> Self {
        self.config.settle_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
