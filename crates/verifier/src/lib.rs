//! FSM verifier: load-time checks for mission programs.
//!
//! Mission bytecode comes from an external compiler and the VM trusts it;
//! a malformed program only shows up as a configuration fault when the bad
//! slot is reached. The verifier finds those problems before the first
//! tick. It collects ALL errors (not just the first) and returns them.
//!
//! # Usage
//!
//! ```
//! use fsm_common::{Instruction, MachineDecl, Opcode, ProgramDefinition};
//! use fsm_verifier::verify;
//!
//! let def = ProgramDefinition::new(
//!     vec![Instruction::new(Opcode::Rst, 0)],
//!     vec![MachineDecl::new(0)],
//! );
//! assert!(verify(&def).is_ok());
//! ```
//!
//! # Passes
//!
//! 1. **Limits**: program size, declaration count, constants per declaration
//! 2. **Structural**: opcodes decode, operands in range, starts in range
//! 3. **Flow**: no falling off the end
//! 4. **Stack**: static stack depth per machine and path
//!
//! Loops that can spin without yielding are legal and reported separately
//! by [`busy_loops`], for hosts to show as warnings.

pub mod error;
pub mod limits;
pub mod reachability;
pub mod stack;
pub mod structural;

pub use error::VerifyError;

use fsm_common::ProgramDefinition;

/// Verify a program definition.
///
/// Returns `Ok(())` if the program passes all checks, or
/// `Err(Vec<VerifyError>)` with all errors found.
///
/// If the structural pass finds any error, the flow and stack passes are
/// skipped: they rely on every jump target and start address being valid.
pub fn verify(def: &ProgramDefinition) -> Result<(), Vec<VerifyError>> {
    let mut all_errors = Vec::new();

    // Pass 1: Limits (independent)
    all_errors.extend(limits::check_limits(def));

    // Pass 2: Structural (builds ProgramContext)
    let (ctx, structural_errors) = structural::check_structural(def);
    all_errors.extend(structural_errors);

    if !ctx.fatal {
        // Pass 3: Flow
        all_errors.extend(reachability::check_flow(&ctx));

        // Pass 4: Stack
        all_errors.extend(stack::check_stack(def, &ctx));
    }

    if all_errors.is_empty() {
        Ok(())
    } else {
        Err(all_errors)
    }
}

/// Loops a machine can run through without yielding.
///
/// These are legal: a busy loop runs to completion within the tick, which
/// ends once an action result changes (an edge-triggered `isArrived`, say).
/// A loop that never ends hangs the tick, so hosts report these as
/// warnings. Returns nothing when the program has structural errors.
pub fn busy_loops(def: &ProgramDefinition) -> Vec<VerifyError> {
    let (ctx, _) = structural::check_structural(def);
    if ctx.fatal {
        return Vec::new();
    }
    reachability::check_busy_loops(&ctx)
}

/// Names in the action table that `binds` does not recognize.
///
/// Unbound actions are legal: at run time they log a warning and evaluate
/// to 0. This lists them up front so a host can report them once.
pub fn unbound_actions<'d>(
    def: &'d ProgramDefinition,
    binds: impl Fn(&str) -> bool,
) -> Vec<&'d str> {
    def.actions
        .iter()
        .map(String::as_str)
        .filter(|name| !binds(name))
        .collect()
}
