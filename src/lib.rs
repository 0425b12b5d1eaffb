//! # ZAF
//!
//! Host-side control of the ZAF++ pet feeder board over USB serial:
//! - Line-oriented text protocol (`PING`, `DISPENSE`, `RUMBLE`, `PUMP`)
//! - Connection handshake with settle period and stale-input flush
//! - Blocking wait through the multi-line dispense completion sequence
//! - Benign "offline" results when the board is missing or drops out
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Web layer / zaf-check / zaf-cli                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  DeviceWorker (service)                      │
//! │             (one request at a time, one thread)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   Controller                                 │
//! │     connect / handshake / send / dispense wait / disconnect  │
//! └──────────┬──────────────────────────────┬───────────────────┘
//!            │                              │
//!            ▼                              ▼
//!   ┌─────────────────┐            ┌─────────────────┐
//!   │    Protocol     │            │    Transport    │
//!   │ (codec, lines)  │            │  (serial port)  │
//!   └─────────────────┘            └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod transport;
pub mod controller;
pub mod service;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ZafError, Result};
pub use config::Config;
pub use controller::{ConnectionReport, ConnectionState, Controller, DispenseOutcome, Handshake};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
