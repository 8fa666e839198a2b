//! Mission FSM common types.
//!
//! This crate provides the data a mission script is made of:
//!
//! - [`Opcode`]: the eleven executable opcodes and their compiler codes
//! - [`Instruction`]: one `(opcode, operand)` pair, opcode kept raw
//! - [`ProgramDefinition`]: bytecode, lookup tables and machine declarations
//! - [`DecodeError`]: errors from interpreting raw opcodes
//!
//! Nothing here executes code; see `fsm-vm` for that.

pub mod error;
pub mod instruction;
pub mod opcode;
pub mod program;

// Re-export commonly used types at the crate root.
pub use error::DecodeError;
pub use instruction::Instruction;
pub use opcode::Opcode;
pub use program::{EntityRef, FsmPath, MachineDecl, ProgramDefinition};
