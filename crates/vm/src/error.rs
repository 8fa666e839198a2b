//! Faults raised while stepping stack machines.
//!
//! Mission bytecode is trusted compiler output, so every fault here means
//! the program data is corrupt. Each variant carries the instruction index
//! (`at`) of the offending instruction.

use fsm_common::DecodeError;
use thiserror::Error;

use crate::dispatch::ActionError;

/// A program-integrity violation detected while executing an instruction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationFault {
    /// The opcode is unused or outside the instruction set.
    #[error("invalid opcode at instruction {at}: {source}")]
    InvalidOpcode {
        at: usize,
        #[source]
        source: DecodeError,
    },

    /// The instruction pointer left the bytecode (bad start address or
    /// fall-through past the last instruction).
    #[error("instruction pointer {at} is outside the bytecode")]
    InstructionPointerOutOfRange { at: usize },

    /// A jump operand does not name an instruction.
    #[error("jump target {target} out of range at instruction {at}")]
    InvalidJumpTarget { at: usize, target: i32 },

    /// ADJUST with a zero or negative slot count.
    #[error("ADJUST by {count} at instruction {at} (must be positive)")]
    InvalidAdjust { at: usize, count: i32 },

    /// DROP with a zero or negative slot count.
    #[error("DROP of {count} at instruction {at} (must be positive)")]
    InvalidDrop { at: usize, count: i32 },

    /// Pop on an empty stack.
    #[error("stack underflow at instruction {at}")]
    StackUnderflow { at: usize },

    /// The stack exceeded [`crate::machine::MAX_STACK_DEPTH`] slots.
    #[error("stack overflow at instruction {at}")]
    StackOverflow { at: usize },

    /// ARGPUSH_S reached below the bottom of the stack.
    #[error("stack offset {offset} out of range (depth {depth}) at instruction {at}")]
    StackIndexOutOfRange { at: usize, offset: i32, depth: usize },

    /// ARGPUSH_B addressed outside the machine's constants.
    #[error("constant offset {offset} out of range (length {len}) at instruction {at}")]
    ConstantOutOfRange { at: usize, offset: i32, len: usize },

    /// ACTION operand is not an index into the action table.
    #[error("action index {index} not in action table at instruction {at}")]
    UnknownAction { at: usize, index: i32 },

    /// A native action rejected its arguments.
    #[error("action '{action}' failed at instruction {at}: {source}")]
    ActionArguments {
        at: usize,
        action: String,
        #[source]
        source: ActionError,
    },

    /// The per-turn instruction watchdog fired.
    #[error("machine executed {limit} instructions without yielding (at instruction {at})")]
    BudgetExhausted { at: usize, limit: u64 },
}

impl ConfigurationFault {
    /// Instruction index the fault was raised at.
    pub fn at(&self) -> usize {
        match self {
            ConfigurationFault::InvalidOpcode { at, .. }
            | ConfigurationFault::InstructionPointerOutOfRange { at }
            | ConfigurationFault::InvalidJumpTarget { at, .. }
            | ConfigurationFault::InvalidAdjust { at, .. }
            | ConfigurationFault::InvalidDrop { at, .. }
            | ConfigurationFault::StackUnderflow { at }
            | ConfigurationFault::StackOverflow { at }
            | ConfigurationFault::StackIndexOutOfRange { at, .. }
            | ConfigurationFault::ConstantOutOfRange { at, .. }
            | ConfigurationFault::UnknownAction { at, .. }
            | ConfigurationFault::ActionArguments { at, .. }
            | ConfigurationFault::BudgetExhausted { at, .. } => *at,
        }
    }
}

/// A fault attributed to the machine that raised it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("machine {machine} faulted: {fault}")]
pub struct MachineFault {
    /// Index of the machine in declaration order.
    pub machine: usize,
    #[source]
    pub fault: ConfigurationFault,
}
