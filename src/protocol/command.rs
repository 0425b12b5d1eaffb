//! Command definitions
//!
//! Represents commands sent to the feeder firmware. Every field is typed so
//! an out-of-range command cannot be built.

use std::fmt;
use std::num::NonZeroU32;

use crate::error::ZafError;

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    Ping,
    Dispense,
    Rumble,
    Pump,
}

impl CommandType {
    /// Keyword that starts the command on the wire
    pub fn keyword(self) -> &'static str {
        match self {
            CommandType::Ping => "PING",
            CommandType::Dispense => "DISPENSE",
            CommandType::Rumble => "RUMBLE",
            CommandType::Pump => "PUMP",
        }
    }
}

/// Water pump selector. The firmware drives two pumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PumpId {
    One = 1,
    Two = 2,
}

impl TryFrom<u8> for PumpId {
    type Error = ZafError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(PumpId::One),
            2 => Ok(PumpId::Two),
            other => Err(ZafError::InvalidCommand(format!(
                "pump id must be 1 or 2, got {}",
                other
            ))),
        }
    }
}

impl fmt::Display for PumpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u8)
    }
}

/// Pump direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PumpDirection {
    Reverse = -1,
    Stop = 0,
    Forward = 1,
}

impl TryFrom<i8> for PumpDirection {
    type Error = ZafError;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(PumpDirection::Reverse),
            0 => Ok(PumpDirection::Stop),
            1 => Ok(PumpDirection::Forward),
            other => Err(ZafError::InvalidCommand(format!(
                "pump direction must be -1, 0 or 1, got {}",
                other
            ))),
        }
    }
}

impl fmt::Display for PumpDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as i8)
    }
}

/// A command for the feeder firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Handshake probe
    Ping,

    /// Run the dispense servo for a number of cycles
    Dispense { cycles: NonZeroU32 },

    /// Switch the fluidization rumble motor
    Rumble { on: bool },

    /// Drive a water pump
    Pump {
        id: PumpId,
        speed: u8,
        direction: PumpDirection,
    },
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Ping => CommandType::Ping,
            Command::Dispense { .. } => CommandType::Dispense,
            Command::Rumble { .. } => CommandType::Rumble,
            Command::Pump { .. } => CommandType::Pump,
        }
    }

    /// Build a dispense command, rejecting zero cycles
    pub fn dispense(cycles: u32) -> Result<Self, ZafError> {
        let cycles = NonZeroU32::new(cycles).ok_or_else(|| {
            ZafError::InvalidCommand("dispense cycles must be positive".to_string())
        })?;
        Ok(Command::Dispense { cycles })
    }

    /// Build a pump command from raw integers
    pub fn pump(id: u8, speed: u8, direction: i8) -> Result<Self, ZafError> {
        Ok(Command::Pump {
            id: PumpId::try_from(id)?,
            speed,
            direction: PumpDirection::try_from(direction)?,
        })
    }
}

/// Wire text without the trailing newline
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = self.command_type().keyword();
        match self {
            Command::Ping => f.write_str(keyword),
            Command::Dispense { cycles } => write!(f, "{}:{}", keyword, cycles),
            Command::Rumble { on } => write!(f, "{}:{}", keyword, u8::from(*on)),
            Command::Pump {
                id,
                speed,
                direction,
            } => write!(f, "{}:{}:{}:{}", keyword, id, speed, direction),
        }
    }
}
