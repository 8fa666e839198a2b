//! Stack depth analysis for mission programs.
//!
//! Tracks the operand stack depth of each machine along every reachable
//! path, starting from an empty stack at the declaration's start address.
//! A slot reached with two different depths is rejected: the depth of every
//! instruction must be a static property of the program. The depth is
//! carried across `JMP_I`, which preserves the stack between turns.

use crate::error::VerifyError;
use crate::limits::MAX_STACK_DEPTH;
use crate::structural::ProgramContext;
use fsm_common::{Opcode, ProgramDefinition};

/// Run the stack depth check. Assumes a non-fatal context.
pub fn check_stack(def: &ProgramDefinition, ctx: &ProgramContext) -> Vec<VerifyError> {
    let mut errors = Vec::new();
    for (machine, decl) in def.machines.iter().enumerate() {
        check_machine(ctx, machine, decl.start_address, decl.constants.len(), &mut errors);
    }
    errors
}

fn check_machine(
    ctx: &ProgramContext,
    machine: usize,
    start: usize,
    constants: usize,
    errors: &mut Vec<VerifyError>,
) {
    let len = ctx.ops.len();
    if start >= len {
        return;
    }

    let mut depths: Vec<Option<usize>> = vec![None; len];
    depths[start] = Some(0);
    let mut work = vec![start];

    while let Some(at) = work.pop() {
        let Some(depth) = depths[at] else {
            continue;
        };
        let Some(next) = depth_after(ctx, machine, at, depth, constants, errors) else {
            // The machine faults here; nothing after it runs on this path.
            continue;
        };

        let (fall, jump) = ctx.successors(at);
        for succ in [fall, jump].into_iter().flatten().filter(|&s| s < len) {
            match depths[succ] {
                None => {
                    depths[succ] = Some(next);
                    work.push(succ);
                }
                Some(expected) if expected != next => {
                    let error = VerifyError::InconsistentStackDepth {
                        machine,
                        at: succ,
                        expected,
                        found: next,
                    };
                    if !errors.contains(&error) {
                        errors.push(error);
                    }
                }
                Some(_) => {}
            }
        }
    }
}

/// Depth after the slot at `at` executes, or `None` if it would fault.
fn depth_after(
    ctx: &ProgramContext,
    machine: usize,
    at: usize,
    depth: usize,
    constants: usize,
    errors: &mut Vec<VerifyError>,
) -> Option<usize> {
    let (opcode, operand) = ctx.ops[at];
    let next = match opcode {
        Opcode::Push => depth + 1,
        Opcode::Adjust => depth + operand.unsigned_abs() as usize,
        Opcode::Drop => {
            let count = operand.unsigned_abs() as usize;
            if count > depth {
                errors.push(VerifyError::StackUnderflow { machine, at });
                return None;
            }
            depth - count
        }
        Opcode::ArgPushS => {
            if usize::try_from(operand).map_or(true, |o| o >= depth) {
                errors.push(VerifyError::StackIndexOutOfRange {
                    machine,
                    at,
                    offset: operand,
                    depth,
                });
                return None;
            }
            depth
        }
        Opcode::ArgPushB => {
            let index = constants as i64 + i64::from(operand) + 1;
            if !(0..constants as i64).contains(&index) {
                errors.push(VerifyError::ConstantOutOfRange {
                    machine,
                    at,
                    offset: operand,
                    len: constants,
                });
                return None;
            }
            depth
        }
        Opcode::Jmp
        | Opcode::Jz
        | Opcode::JmpI
        | Opcode::Rst
        | Opcode::Action
        | Opcode::Neg => depth,
    };

    if next > MAX_STACK_DEPTH {
        errors.push(VerifyError::StackTooDeep {
            machine,
            at,
            depth: next,
        });
        return None;
    }
    Some(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structural::check_structural;
    use fsm_common::{Instruction, MachineDecl};

    fn op(opcode: Opcode, operand: i32) -> Instruction {
        Instruction::new(opcode, operand)
    }

    fn stack(bytecode: Vec<Instruction>, decl: MachineDecl) -> Vec<VerifyError> {
        let def = ProgramDefinition::new(bytecode, vec![decl]).with_actions(["true"]);
        let (ctx, errors) = check_structural(&def);
        assert!(errors.is_empty(), "{errors:?}");
        check_stack(&def, &ctx)
    }

    #[test]
    fn balanced_program_passes() {
        let errors = stack(
            vec![
                op(Opcode::Push, 1),
                op(Opcode::Adjust, 2),
                op(Opcode::ArgPushS, 2),
                op(Opcode::Action, 0),
                op(Opcode::Drop, 3),
                op(Opcode::Rst, 0),
            ],
            MachineDecl::new(0),
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn drop_below_empty() {
        let errors = stack(
            vec![op(Opcode::Push, 1), op(Opcode::Drop, 2), op(Opcode::Rst, 0)],
            MachineDecl::new(0),
        );
        assert_eq!(
            errors,
            vec![VerifyError::StackUnderflow { machine: 0, at: 1 }]
        );
    }

    #[test]
    fn argpush_s_beyond_depth() {
        let errors = stack(
            vec![op(Opcode::Push, 1), op(Opcode::ArgPushS, 1), op(Opcode::Rst, 0)],
            MachineDecl::new(0),
        );
        assert_eq!(
            errors,
            vec![VerifyError::StackIndexOutOfRange {
                machine: 0,
                at: 1,
                offset: 1,
                depth: 1
            }]
        );
    }

    #[test]
    fn argpush_b_checked_against_declaration() {
        let code = vec![op(Opcode::ArgPushB, -3), op(Opcode::Rst, 0)];
        assert!(stack(code.clone(), MachineDecl::new(0).with_constants(vec![1, 2])).is_empty());
        assert_eq!(
            stack(code, MachineDecl::new(0).with_constants(vec![1])),
            vec![VerifyError::ConstantOutOfRange {
                machine: 0,
                at: 0,
                offset: -3,
                len: 1
            }]
        );
    }

    #[test]
    fn growing_loop_is_inconsistent() {
        let errors = stack(
            vec![op(Opcode::Push, 0), op(Opcode::JmpI, 0)],
            MachineDecl::new(0),
        );
        assert_eq!(
            errors,
            vec![VerifyError::InconsistentStackDepth {
                machine: 0,
                at: 0,
                expected: 0,
                found: 1
            }]
        );
    }

    #[test]
    fn branches_must_agree() {
        let errors = stack(
            vec![
                op(Opcode::Action, 0),
                op(Opcode::Jz, 3),
                op(Opcode::Push, 1),
                op(Opcode::Rst, 0),
            ],
            MachineDecl::new(0),
        );
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            VerifyError::InconsistentStackDepth { at: 3, .. }
        ));
    }

    #[test]
    fn too_deep() {
        let errors = stack(
            vec![op(Opcode::Adjust, MAX_STACK_DEPTH as i32 + 1), op(Opcode::Rst, 0)],
            MachineDecl::new(0),
        );
        assert!(matches!(errors[0], VerifyError::StackTooDeep { at: 0, .. }));
    }
}
