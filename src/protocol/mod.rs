//! Protocol Module
//!
//! Defines the line-oriented text protocol spoken by the feeder firmware.
//!
//! ## Protocol Format
//!
//! Every frame is one ASCII line terminated by `'\n'`.
//!
//! ### Commands (host → device)
//! - `PING`                   - handshake probe
//! - `DISPENSE:<n>`           - run the servo for n cycles
//! - `RUMBLE:<0|1>`           - rumble motor off/on
//! - `PUMP:<id>:<speed>:<dir>`- id 1-2, speed 0-255, dir -1/0/1
//!
//! ### Replies (device → host)
//! - line containing `PONG`   - handshake ack
//! - line containing `DISPENSING`, then 0+ status lines, then
//!   `DISPENSE_COMPLETE`
//! - any other line           - free-form status, logged only

mod command;
mod response;
mod codec;

pub use command::{Command, CommandType, PumpDirection, PumpId};
pub use response::{Reply, DISPENSE_COMPLETE, DISPENSING_MARKER, PONG_MARKER};
pub use codec::{
    decode_command, decode_line, encode_command, write_command, LineReader, LINE_TERMINATOR,
};
