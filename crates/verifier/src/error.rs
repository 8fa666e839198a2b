//! Verification errors for the FSM verifier.
//!
//! Errors that concern a single slot carry its instruction index (`at`);
//! errors found while walking from a declaration also carry the machine
//! index. The verifier collects ALL errors, not just the first.

use fsm_common::DecodeError;
use thiserror::Error;

/// Errors found during load-time verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    // --- Limits ---
    #[error("program has {size} instructions, exceeding the limit")]
    ProgramTooLarge { size: usize },

    #[error("program declares {count} machines, exceeding the limit")]
    TooManyMachines { count: usize },

    #[error("machine {machine} declares {count} constants, exceeding the limit")]
    TooManyConstants { machine: usize, count: usize },

    // --- Structural ---
    #[error("invalid opcode at instruction {at}: {source}")]
    InvalidOpcode {
        at: usize,
        #[source]
        source: DecodeError,
    },

    #[error("ADJUST at instruction {at} has non-positive count {count}")]
    InvalidAdjust { at: usize, count: i32 },

    #[error("DROP at instruction {at} has non-positive count {count}")]
    InvalidDrop { at: usize, count: i32 },

    #[error("jump at instruction {at} targets {target}, outside the program")]
    JumpOutOfRange { at: usize, target: i32 },

    #[error("ACTION at instruction {at} names action {index}, outside the action table")]
    UnknownAction { at: usize, index: i32 },

    #[error("machine {machine} starts at {start}, outside the program")]
    StartOutOfRange { machine: usize, start: usize },

    // --- Control flow ---
    #[error("machine {machine} can run past the last instruction at {at}")]
    FallsOffEnd { machine: usize, at: usize },

    #[error("machine {machine} can loop through instruction {at} without yielding")]
    NonYieldingLoop { machine: usize, at: usize },

    // --- Stack ---
    #[error("machine {machine}: stack underflow at instruction {at}")]
    StackUnderflow { machine: usize, at: usize },

    #[error("machine {machine}: stack depth {depth} exceeds the limit at instruction {at}")]
    StackTooDeep {
        machine: usize,
        at: usize,
        depth: usize,
    },

    #[error(
        "machine {machine}: ARGPUSH_S {offset} at instruction {at} with stack depth {depth}"
    )]
    StackIndexOutOfRange {
        machine: usize,
        at: usize,
        offset: i32,
        depth: usize,
    },

    #[error(
        "machine {machine}: ARGPUSH_B {offset} at instruction {at} outside {len} constant(s)"
    )]
    ConstantOutOfRange {
        machine: usize,
        at: usize,
        offset: i32,
        len: usize,
    },

    #[error(
        "machine {machine}: instruction {at} reached with stack depth {found}, previously {expected}"
    )]
    InconsistentStackDepth {
        machine: usize,
        at: usize,
        expected: usize,
        found: usize,
    },
}
