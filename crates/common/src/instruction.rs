//! A single bytecode instruction: an opcode and one signed operand.
//!
//! The opcode is kept in its raw form. Mission bytecode comes from an
//! external compiler and is trusted, so decoding happens where it is used:
//! the verifier at load time and the VM on fetch.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::opcode::Opcode;

/// One `(opcode, operand)` pair of mission bytecode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instruction {
    /// Raw opcode as emitted by the compiler.
    pub code: u32,
    /// Operand. Meaning depends on the opcode.
    pub operand: i32,
}

impl Instruction {
    /// Create an instruction from a known opcode.
    pub fn new(opcode: Opcode, operand: i32) -> Self {
        Self {
            code: opcode as u32,
            operand,
        }
    }

    /// Create an instruction from a raw code, which may not be a valid opcode.
    pub fn raw(code: u32, operand: i32) -> Self {
        Self { code, operand }
    }

    /// Decode the opcode.
    pub fn opcode(&self) -> Result<Opcode, DecodeError> {
        Opcode::try_from(self.code)
    }

    /// The operand interpreted as an absolute bytecode address.
    ///
    /// Returns `None` for negative operands.
    pub fn target(&self) -> Option<usize> {
        usize::try_from(self.operand).ok()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.opcode() {
            Ok(op) if op.takes_operand() => write!(f, "{} {}", op.mnemonic(), self.operand),
            Ok(op) => f.write_str(op.mnemonic()),
            Err(_) => write!(f, "<{}> {}", self.code, self.operand),
        }
    }
}
