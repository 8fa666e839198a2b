//! Disassembler: bytecode → canonical listing text.
//!
//! Output is flat: the action table as `.action` lines, then one line per
//! instruction, with a generated `L<address>:` line before every jump
//! target. Anything that would not reassemble to the same slot is written
//! with `.raw`.

use std::collections::BTreeSet;

use fsm_common::{Instruction, Opcode};

/// Disassemble bytecode and its action table into canonical listing text.
pub fn disassemble(bytecode: &[Instruction], actions: &[String]) -> String {
    let mut lines: Vec<String> = actions.iter().map(|a| format!(".action {a}")).collect();

    let targets: BTreeSet<usize> = bytecode
        .iter()
        .filter(|instr| instr.opcode().is_ok_and(Opcode::is_jump))
        .filter_map(Instruction::target)
        .filter(|&t| t < bytecode.len())
        .collect();

    for (address, instr) in bytecode.iter().enumerate() {
        if targets.contains(&address) {
            lines.push(format!("L{address}:"));
        }
        lines.push(render(instr, bytecode.len(), actions));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn render(instr: &Instruction, len: usize, actions: &[String]) -> String {
    let Ok(opcode) = instr.opcode() else {
        return raw(instr);
    };
    let mnemonic = opcode.mnemonic();

    if !opcode.takes_operand() {
        return if instr.operand == 0 {
            mnemonic.to_string()
        } else {
            raw(instr)
        };
    }

    if opcode.is_jump() {
        if let Some(target) = instr.target().filter(|&t| t < len) {
            return format!("{mnemonic} L{target}");
        }
    }

    if opcode == Opcode::Action {
        if let Some(name) = instr.target().and_then(|i| actions.get(i)) {
            if is_plain_word(name) {
                return format!("{mnemonic} {name}");
            }
        }
    }

    format!("{mnemonic} {}", instr.operand)
}

fn raw(instr: &Instruction) -> String {
    format!(".raw {} {}", instr.code, instr.operand)
}

/// True if `name` lexes back as a single word token.
fn is_plain_word(name: &str) -> bool {
    let first_is_digit = name
        .trim_start_matches('-')
        .as_bytes()
        .first()
        .is_some_and(u8::is_ascii_digit);
    !name.is_empty()
        && !first_is_digit
        && !name.starts_with('.')
        && !name.ends_with(':')
        && !name.contains(|c: char| c.is_whitespace() || c == ';')
}
