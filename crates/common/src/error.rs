//! Decode errors for mission FSM bytecode.

use thiserror::Error;

/// Errors that occur when a raw opcode is interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Code is allocated by the compiler but never emitted.
    #[error("unused opcode: {0}")]
    UnusedOpcode(u32),

    /// Code is outside the instruction set entirely.
    #[error("unknown opcode: {0}")]
    UnknownOpcode(u32),
}
