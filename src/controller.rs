//! Controller Module
//!
//! The protocol client for the ZAF++ feeder board.
//!
//! ## Responsibilities
//! - Own the serial connection (open, settle, clear, handshake, close)
//! - Frame commands and read single-line replies
//! - Block through the multi-line dispense completion sequence
//! - Turn transport failures into benign "offline" results
//!
//! ## Connection State Machine
//! ```text
//!                 connect (port opened)
//!  Disconnected ─────────────────────────▶ Unverified ──PONG──▶ Verified
//!       ▲                                      │                    │
//!       └──────── disconnect() / I/O error ────┴────────────────────┘
//! ```
//! There is no automatic reconnect; call [`Controller::connect`] again.

use std::fmt;
use std::io::Write;
use std::num::NonZeroU32;
use std::thread;

use tracing::Span;

use crate::config::Config;
use crate::error::{Result, ZafError};
use crate::protocol::{write_command, Command, LineReader, PumpDirection, PumpId, Reply};
use crate::transport::{Connector, SerialConnector, Transport};

// =============================================================================
// Result Types
// =============================================================================

/// Connection state of a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport open
    Disconnected,

    /// Port open, handshake not (yet) answered with `PONG`
    Unverified,

    /// Port open and the device answered the handshake
    Verified,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        !matches!(self, ConnectionState::Disconnected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Unverified => "connected (unverified)",
            ConnectionState::Verified => "connected (verified)",
        };
        f.write_str(name)
    }
}

/// Outcome of the `PING`/`PONG` exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handshake {
    /// Reply contained `PONG`
    Verified,

    /// Reply was missing or did not contain `PONG`
    Failed { response: String },

    /// Port never opened
    NotAttempted,
}

/// Result of [`Controller::connect`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionReport {
    /// Whether the port is open. Not gated on the handshake.
    pub connected: bool,

    /// How the handshake went
    pub handshake: Handshake,

    /// Why the port could not be opened
    pub error: Option<String>,
}

/// Result of [`Controller::dispense_food`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispenseOutcome {
    /// `DISPENSE_COMPLETE` received
    Completed { updates: Vec<String> },

    /// The device went silent before the terminal marker
    TimedOut { updates: Vec<String> },

    /// The immediate reply did not contain `DISPENSING`
    NotAcknowledged { response: String },

    /// Not connected, or the transport failed during the request
    Offline { reason: String },
}

impl DispenseOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, DispenseOutcome::Completed { .. })
    }

    /// Intermediate status lines seen while waiting
    pub fn updates(&self) -> &[String] {
        match self {
            DispenseOutcome::Completed { updates } | DispenseOutcome::TimedOut { updates } => {
                updates
            }
            _ => &[],
        }
    }
}

/// Completion-wait states
enum WaitState {
    Waiting,
    Complete,
    TimedOut,
}

// =============================================================================
// Controller
// =============================================================================

/// An open transport plus its line buffer
struct Link {
    transport: Box<dyn Transport>,
    reader: LineReader,
}

impl Link {
    fn read_line(&mut self) -> Result<String> {
        self.reader
            .read_line(&mut *self.transport)?
            .ok_or(ZafError::ReadTimeout)
    }
}

/// Protocol client for one feeder board
///
/// ## Blocking
/// Every operation blocks the calling thread. `dispense_food` blocks for the
/// duration of the physical dispense: each line read is bounded by the read
/// timeout, but the number of status lines is not.
///
/// ## Exclusivity
/// All operations take `&mut self`; share a controller between threads
/// through [`crate::service::DeviceWorker`].
pub struct Controller {
    /// Immutable session configuration
    config: Config,

    /// Opens the transport on `connect`
    connector: Box<dyn Connector>,

    /// Present while connected
    link: Option<Link>,

    state: ConnectionState,

    /// Every operation logs inside this span
    span: Span,
}

impl Controller {
    /// Create a controller for a serial port. Does not open it.
    pub fn new(config: Config) -> Self {
        Self::builder(config).build()
    }

    /// Create a controller builder
    pub fn builder(config: Config) -> ControllerBuilder {
        ControllerBuilder {
            config,
            connector: None,
            span: None,
        }
    }

    // =========================================================================
    // Connection Lifecycle
    // =========================================================================

    /// Open the port, wait for the board to reset, and handshake.
    ///
    /// Never fails: an open failure is reported as `connected == false`.
    /// A failed handshake is logged and leaves the port open.
    pub fn connect(&mut self) -> ConnectionReport {
        let span = self.span.clone();
        let _enter = span.enter();

        if self.link.is_some() {
            tracing::debug!("Already connected, reopening {}", self.config.port);
            self.disconnect();
        }

        let mut transport = match self.connector.open(&self.config) {
            Ok(transport) => transport,
            Err(e) => {
                tracing::error!("Failed to connect to {}: {}", self.config.port, e);
                return ConnectionReport {
                    connected: false,
                    handshake: Handshake::NotAttempted,
                    error: Some(e.to_string()),
                };
            }
        };

        let settle = self.config.settle();
        if !settle.is_zero() {
            tracing::debug!("Waiting {}ms for the board to reset", self.config.settle_ms);
            thread::sleep(settle);
        }

        if let Err(e) = transport.clear_input() {
            tracing::warn!("Could not clear input buffer: {}", e);
        }

        self.link = Some(Link {
            transport,
            reader: LineReader::new(self.config.read_timeout()),
        });
        self.state = ConnectionState::Unverified;
        tracing::info!("Connected to ZAF++ Controller on {}", self.config.port);

        let handshake = self.handshake();

        ConnectionReport {
            connected: self.state.is_connected(),
            handshake,
            error: None,
        }
    }

    /// Close the port. Safe to call at any time.
    pub fn disconnect(&mut self) {
        let span = self.span.clone();
        let _enter = span.enter();

        if let Some(mut link) = self.link.take() {
            if let Err(e) = link.transport.flush() {
                tracing::debug!("Flush before close failed: {}", e);
            }
            drop(link);
            tracing::info!("Disconnected from ZAF++ Controller");
        }
        self.state = ConnectionState::Disconnected;
    }

    /// Re-run the handshake. Returns whether the device answered `PONG`.
    ///
    /// Output left over from earlier commands (such as a late dispense
    /// status) is discarded first so it is not taken as the reply.
    pub fn ping(&mut self) -> bool {
        let span = self.span.clone();
        let _enter = span.enter();

        let Some(link) = self.link.as_mut() else {
            tracing::error!("Not connected to controller.");
            return false;
        };
        link.reader.clear();
        if let Err(e) = link.transport.clear_input() {
            tracing::warn!("Could not clear input buffer: {}", e);
        }
        matches!(self.handshake(), Handshake::Verified)
    }

    fn handshake(&mut self) -> Handshake {
        let response = match self.try_send_command(&Command::Ping) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Handshake failed: {}", e);
                if self.link.is_some() {
                    self.state = ConnectionState::Unverified;
                }
                return Handshake::Failed {
                    response: String::new(),
                };
            }
        };

        if let Reply::Pong = Reply::classify(&response) {
            self.state = ConnectionState::Verified;
            tracing::info!("Handshake successful.");
            Handshake::Verified
        } else {
            self.state = ConnectionState::Unverified;
            tracing::warn!("Handshake failed. Response: {:?}", response);
            Handshake::Failed { response }
        }
    }

    // =========================================================================
    // Command / Response
    // =========================================================================

    /// Write one command and read one reply line.
    ///
    /// Errors are the typed form of every failure: `NotConnected` (nothing
    /// written), `Write`/`Read` (connection dropped), `ReadTimeout`, `Decode`.
    pub fn try_send_command(&mut self, command: &Command) -> Result<String> {
        let span = self.span.clone();
        let _enter = span.enter();

        self.with_link(|link| {
            write_command(&mut *link.transport, command)?;
            tracing::debug!("Sent: {}", command);

            let response = link.read_line()?;
            tracing::debug!("Received: {}", response);
            Ok(response)
        })
    }

    /// Write one command and read one reply line.
    ///
    /// Returns an empty string if not connected, on timeout, or on any
    /// transport or decode failure. The failure is logged.
    pub fn send_command(&mut self, command: &Command) -> String {
        match self.try_send_command(command) {
            Ok(response) => response,
            Err(ZafError::NotConnected) => {
                tracing::error!("Not connected to controller.");
                String::new()
            }
            Err(ZafError::ReadTimeout) => {
                tracing::warn!("No response to {}", command);
                String::new()
            }
            Err(e) => {
                tracing::error!("Error sending command {}: {}", command, e);
                String::new()
            }
        }
    }

    /// Run `op` against the open link; drop the link if the transport failed
    fn with_link<T>(&mut self, op: impl FnOnce(&mut Link) -> Result<T>) -> Result<T> {
        let link = self.link.as_mut().ok_or(ZafError::NotConnected)?;
        let result = op(link);

        if let Err(ref e) = result {
            if e.is_io_failure() {
                tracing::warn!("Connection to {} lost: {}", self.config.port, e);
                self.link = None;
                self.state = ConnectionState::Disconnected;
            }
        }
        result
    }

    // =========================================================================
    // Device Operations
    // =========================================================================

    /// Dispense food and block until the board reports completion.
    ///
    /// After a `DISPENSING` acknowledgment, lines are read until the exact
    /// line `DISPENSE_COMPLETE` or until a read returns nothing. There is no
    /// cap on the number of status lines.
    pub fn dispense_food(&mut self, cycles: NonZeroU32) -> DispenseOutcome {
        let span = self.span.clone();
        let _enter = span.enter();

        tracing::info!("Dispensing food: {} cycles", cycles);

        let response = match self.try_send_command(&Command::Dispense { cycles }) {
            Ok(response) => response,
            Err(e @ ZafError::NotConnected) => {
                tracing::error!("Not connected to controller.");
                return DispenseOutcome::Offline {
                    reason: e.to_string(),
                };
            }
            Err(e) if e.is_io_failure() => {
                tracing::error!("Error sending dispense command: {}", e);
                return DispenseOutcome::Offline {
                    reason: e.to_string(),
                };
            }
            Err(e) => {
                tracing::warn!("No usable reply to dispense command: {}", e);
                String::new()
            }
        };

        if !matches!(Reply::classify(&response), Reply::Dispensing) {
            tracing::warn!("Dispense not acknowledged. Response: {:?}", response);
            return DispenseOutcome::NotAcknowledged { response };
        }

        self.await_dispense_completion()
    }

    fn await_dispense_completion(&mut self) -> DispenseOutcome {
        let mut updates = Vec::new();
        let mut state = WaitState::Waiting;

        while let WaitState::Waiting = state {
            state = match self.with_link(Link::read_line) {
                Ok(line) if line.is_empty() => WaitState::TimedOut,
                Ok(line) => match Reply::classify(&line) {
                    Reply::DispenseComplete => WaitState::Complete,
                    _ => {
                        tracing::debug!("Dispense status: {}", line);
                        updates.push(line);
                        WaitState::Waiting
                    }
                },
                Err(ZafError::ReadTimeout) => WaitState::TimedOut,
                Err(e) if e.is_io_failure() || matches!(e, ZafError::NotConnected) => {
                    tracing::error!("Lost connection while dispensing: {}", e);
                    return DispenseOutcome::Offline {
                        reason: e.to_string(),
                    };
                }
                Err(e) => {
                    tracing::warn!("Unreadable dispense status: {}", e);
                    WaitState::Waiting
                }
            };
        }

        match state {
            WaitState::Complete => {
                tracing::info!("Dispense cycle completed successfully.");
                DispenseOutcome::Completed { updates }
            }
            _ => {
                tracing::warn!("Timeout waiting for dispense completion.");
                DispenseOutcome::TimedOut { updates }
            }
        }
    }

    /// Switch the fluidization rumble motor. Returns the raw reply.
    pub fn set_rumble_pack(&mut self, on: bool) -> String {
        let span = self.span.clone();
        let _enter = span.enter();

        tracing::info!("Setting Rumble Pack: {}", if on { "ON" } else { "OFF" });
        let response = self.send_command(&Command::Rumble { on });
        tracing::debug!("Rumble reply: {:?}", response);
        response
    }

    /// Drive a water pump. Returns the raw reply.
    pub fn control_pump(&mut self, id: PumpId, speed: u8, direction: PumpDirection) -> String {
        let span = self.span.clone();
        let _enter = span.enter();

        tracing::info!(
            "Controlling Pump {}: Speed={}, Dir={}",
            id,
            speed,
            direction
        );
        let response = self.send_command(&Command::Pump {
            id,
            speed,
            direction,
        });
        tracing::debug!("Pump reply: {:?}", response);
        response
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.disconnect();
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for Controller
pub struct ControllerBuilder {
    config: Config,
    connector: Option<Box<dyn Connector>>,
    span: Option<Span>,
}

impl ControllerBuilder {
    /// Use a custom connector instead of the serial port
    pub fn connector(mut self, connector: impl Connector + 'static) -> Self {
        self.connector = Some(Box::new(connector));
        self
    }

    /// Log every operation inside `span`
    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn build(self) -> Controller {
        let span = self
            .span
            .unwrap_or_else(|| tracing::info_span!("zaf", port = %self.config.port));

        Controller {
            connector: self.connector.unwrap_or_else(|| Box::new(SerialConnector)),
            config: self.config,
            link: None,
            state: ConnectionState::Disconnected,
            span,
        }
    }
}
