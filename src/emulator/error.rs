//! Errors raised by the emulator core.

use thiserror::Error;

/// Everything that can stop the interpreter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("Unsupported instruction {opcode:#06X}")]
    UnsupportedInstruction { opcode: u16 },

    #[error("Memory access out of bounds at address {address:#06X}")]
    MemoryAccessViolation { address: u16 },

    #[error("Access of {length} bytes at {address:#06X} crosses a segment boundary")]
    SegmentBoundaryViolation { address: u16, length: usize },

    #[error("Write to read-only memory at address {address:#06X}")]
    WriteProtectionViolation { address: u16 },

    #[error("Stack overflow: no room left for another return address")]
    StackOverflow,

    #[error("Stack underflow: attempted to return with an empty call stack")]
    StackUnderflow,

    #[error("No font character for value {value:#04X}")]
    InvalidFontCharacter { value: u8 },

    #[error("Address {base:#05X} + {offset:#04X} does not fit in 12 bits")]
    AddressOverflow { base: u16, offset: u8 },

    #[error("Invalid frequency {frequency} Hz for {activity}")]
    InvalidFrequency { activity: &'static str, frequency: f64 },

    #[error("Not implemented: {operation}")]
    NotImplemented { operation: &'static str },

    #[error("The board is not running")]
    BoardStopped,
}

pub type Result<T> = std::result::Result<T, Error>;
