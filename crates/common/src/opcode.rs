//! Opcode definitions for the mission FSM instruction set.

use crate::error::DecodeError;

/// Identifies the operation to perform.
///
/// The numeric values are the codes emitted by the mission compiler. Codes
/// 0, 2, 3, 11 and 15 are allocated by the compiler but never emitted; they
/// decode to [`DecodeError::UnusedOpcode`].
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // Stack
    /// Push the literal operand.
    Push = 1,
    /// Enqueue the stack slot `operand` places below the top as an action argument.
    ArgPushS = 4,
    /// Enqueue a machine constant, addressed from the end of the constant array.
    ArgPushB = 5,
    /// Push `operand` zero slots. Operand must be positive.
    Adjust = 6,
    /// Pop `operand` slots. Operand must be positive.
    Drop = 7,

    // Control flow
    /// Unconditional jump to the absolute address in the operand.
    Jmp = 8,
    /// Jump if the result register is zero.
    Jz = 9,
    /// Jump, then end this machine's turn for the current tick.
    JmpI = 10,
    /// Halt the machine permanently.
    Rst = 12,

    // Host interaction
    /// Invoke the native action named by `ActionTable[operand]`.
    Action = 13,
    /// Toggle the result register between 0 and 1.
    Neg = 14,
}

/// All valid opcodes, in code order. Useful for exhaustive testing.
pub const ALL_OPCODES: [Opcode; 11] = [
    Opcode::Push,
    Opcode::ArgPushS,
    Opcode::ArgPushB,
    Opcode::Adjust,
    Opcode::Drop,
    Opcode::Jmp,
    Opcode::Jz,
    Opcode::JmpI,
    Opcode::Rst,
    Opcode::Action,
    Opcode::Neg,
];

impl TryFrom<u32> for Opcode {
    type Error = DecodeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Opcode::Push),
            4 => Ok(Opcode::ArgPushS),
            5 => Ok(Opcode::ArgPushB),
            6 => Ok(Opcode::Adjust),
            7 => Ok(Opcode::Drop),
            8 => Ok(Opcode::Jmp),
            9 => Ok(Opcode::Jz),
            10 => Ok(Opcode::JmpI),
            12 => Ok(Opcode::Rst),
            13 => Ok(Opcode::Action),
            14 => Ok(Opcode::Neg),

            0 | 2 | 3 | 11 | 15 => Err(DecodeError::UnusedOpcode(value)),
            _ => Err(DecodeError::UnknownOpcode(value)),
        }
    }
}

impl Opcode {
    /// Return the assembly mnemonic for this opcode.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Push => "PUSH",
            Opcode::ArgPushS => "ARGPUSH_S",
            Opcode::ArgPushB => "ARGPUSH_B",
            Opcode::Adjust => "ADJUST",
            Opcode::Drop => "DROP",
            Opcode::Jmp => "JMP",
            Opcode::Jz => "JZ",
            Opcode::JmpI => "JMP_I",
            Opcode::Rst => "RST",
            Opcode::Action => "ACTION",
            Opcode::Neg => "NEG",
        }
    }

    /// Look up an opcode by its mnemonic. Matching is exact (uppercase).
    pub fn from_mnemonic(mnemonic: &str) -> Option<Opcode> {
        ALL_OPCODES
            .iter()
            .find(|op| op.mnemonic() == mnemonic)
            .copied()
    }

    /// True for the instructions that end a machine's turn.
    pub fn is_yield(self) -> bool {
        matches!(self, Opcode::JmpI | Opcode::Rst)
    }

    /// True for instructions whose operand is an absolute bytecode address.
    pub fn is_jump(self) -> bool {
        matches!(self, Opcode::Jmp | Opcode::Jz | Opcode::JmpI)
    }

    /// True if the operand carries meaning. `RST` and `NEG` ignore it.
    pub fn takes_operand(self) -> bool {
        !matches!(self, Opcode::Rst | Opcode::Neg)
    }
}
