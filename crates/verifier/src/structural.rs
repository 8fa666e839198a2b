//! Structural validation pass for mission programs.
//!
//! Checks every slot in isolation (opcode decodes, operands are in range)
//! and every declaration's start address, and builds the ProgramContext
//! used by the control-flow and stack passes.

use crate::error::VerifyError;
use fsm_common::{Opcode, ProgramDefinition};

/// Decoded view of a program, valid only if `fatal` is false.
#[derive(Debug, Clone, Default)]
pub struct ProgramContext {
    /// `(opcode, operand)` per slot.
    pub ops: Vec<(Opcode, i32)>,
    /// Declaration start addresses, in declaration order.
    pub starts: Vec<usize>,
    /// Set when any slot or start address is invalid. The flow and stack
    /// passes assume every jump target and start is in range.
    pub fatal: bool,
}

impl ProgramContext {
    /// Control-flow successors of the slot at `pc`: the fall-through slot
    /// (which may be one past the end) and the jump target, if any.
    pub fn successors(&self, pc: usize) -> (Option<usize>, Option<usize>) {
        let (opcode, operand) = self.ops[pc];
        let target = usize::try_from(operand).ok();
        match opcode {
            Opcode::Jmp | Opcode::JmpI => (None, target),
            Opcode::Jz => (Some(pc + 1), target),
            Opcode::Rst => (None, None),
            _ => (Some(pc + 1), None),
        }
    }
}

/// Run the structural check.
pub fn check_structural(def: &ProgramDefinition) -> (ProgramContext, Vec<VerifyError>) {
    let mut errors = Vec::new();
    let mut ctx = ProgramContext::default();
    let len = def.bytecode.len();

    for (at, instr) in def.bytecode.iter().enumerate() {
        let opcode = match instr.opcode() {
            Ok(op) => op,
            Err(source) => {
                errors.push(VerifyError::InvalidOpcode { at, source });
                continue;
            }
        };
        let operand = instr.operand;

        match opcode {
            Opcode::Adjust if operand <= 0 => {
                errors.push(VerifyError::InvalidAdjust { at, count: operand });
            }
            Opcode::Drop if operand <= 0 => {
                errors.push(VerifyError::InvalidDrop { at, count: operand });
            }
            Opcode::Jmp | Opcode::Jz | Opcode::JmpI
                if instr.target().map_or(true, |t| t >= len) =>
            {
                errors.push(VerifyError::JumpOutOfRange {
                    at,
                    target: operand,
                });
            }
            Opcode::Action if instr.target().and_then(|i| def.action(i)).is_none() => {
                errors.push(VerifyError::UnknownAction { at, index: operand });
            }
            _ => {}
        }
        ctx.ops.push((opcode, operand));
    }

    for (machine, decl) in def.machines.iter().enumerate() {
        if decl.start_address >= len {
            errors.push(VerifyError::StartOutOfRange {
                machine,
                start: decl.start_address,
            });
        }
        ctx.starts.push(decl.start_address);
    }

    ctx.fatal = !errors.is_empty();
    (ctx, errors)
}
