//! FSM assembler: listing text ↔ mission bytecode.
//!
//! Listings are line oriented:
//!
//! ```text
//! .action true            ; pin action table order
//! wait:
//!     PUSH 0
//!     ARGPUSH_S 0
//!     ACTION startTimer   ; names not yet in the table are appended
//!     DROP 1
//!     JMP_I wait
//! ```
//!
//! Jump operands are labels or absolute addresses; `ACTION` operands are
//! action names or table indices. `.raw CODE OPERAND` writes an arbitrary
//! slot, which is how the disassembler preserves invalid opcodes.
//!
//! # Usage
//!
//! ```
//! use fsm_assembler::{assemble, disassemble};
//!
//! let asm = assemble("top:\nACTION true\nJZ top\nRST\n").unwrap();
//! assert_eq!(asm.actions, vec!["true".to_string()]);
//! assert_eq!(asm.label("top"), Some(0));
//!
//! let text = disassemble(&asm.bytecode, &asm.actions);
//! assert_eq!(assemble(&text).unwrap().bytecode, asm.bytecode);
//! ```

pub mod error;

mod disassembler;
mod lexer;
mod parser;

pub use disassembler::disassemble;
pub use error::AsmError;

use std::collections::BTreeMap;

use fsm_common::{Instruction, MachineDecl, ProgramDefinition};
use lexer::tokenize_line;
use parser::{parse_line, Item, Operand};

/// Output of [`assemble`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assembly {
    pub bytecode: Vec<Instruction>,
    /// Action table, in index order.
    pub actions: Vec<String>,
    /// Every label and the address it names.
    pub labels: BTreeMap<String, usize>,
}

impl Assembly {
    pub fn label(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }

    /// Build a program definition around this bytecode and action table.
    /// Entity, path and sound tables are left empty.
    pub fn into_definition(self, machines: Vec<MachineDecl>) -> ProgramDefinition {
        ProgramDefinition::new(self.bytecode, machines).with_actions(self.actions)
    }
}

/// Assemble listing text.
///
/// Returns the first error encountered.
pub fn assemble(text: &str) -> Result<Assembly, AsmError> {
    let mut asm = Assembly::default();
    // (slot, line, label) for jumps resolved after the last line.
    let mut pending = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line_num = idx + 1;
        let tokens = tokenize_line(line, line_num)?;
        let parsed = parse_line(&tokens, line_num)?;

        for label in parsed.labels {
            if let Some(&address) = asm.labels.get(&label) {
                return Err(AsmError::DuplicateLabel {
                    line: line_num,
                    label,
                    address,
                });
            }
            asm.labels.insert(label, asm.bytecode.len());
        }

        match parsed.item {
            None => {}
            Some(Item::Action(name)) => {
                intern(&mut asm.actions, &name);
            }
            Some(Item::Instr { code, operand }) => {
                let value = match operand {
                    Operand::Value(v) => v,
                    Operand::ActionName(name) => intern(&mut asm.actions, &name),
                    Operand::Label(label) => {
                        pending.push((asm.bytecode.len(), line_num, label));
                        0
                    }
                };
                asm.bytecode.push(Instruction::raw(code, value));
            }
        }
    }

    for (slot, line, label) in pending {
        let address = asm
            .label(&label)
            .ok_or_else(|| AsmError::UndefinedLabel {
                line,
                label: label.clone(),
            })?;
        asm.bytecode[slot].operand =
            i32::try_from(address).map_err(|_| AsmError::InvalidNumber {
                line,
                token: label,
            })?;
    }

    Ok(asm)
}

/// Index of `name` in the table, appending it if absent.
fn intern(actions: &mut Vec<String>, name: &str) -> i32 {
    let index = match actions.iter().position(|a| a == name) {
        Some(i) => i,
        None => {
            actions.push(name.to_string());
            actions.len() - 1
        }
    };
    index as i32
}
