//! Size limits for mission programs.

use crate::error::VerifyError;
use fsm_common::ProgramDefinition;

/// Maximum program size in instructions.
pub const MAX_PROGRAM_SIZE: usize = 65_536;

/// Maximum number of machine declarations.
pub const MAX_MACHINES: usize = 1_024;

/// Maximum constants per declaration.
pub const MAX_CONSTANTS: usize = 4_096;

/// Maximum stack depth a machine may reach on any path. Matches the VM's
/// run-time limit.
pub const MAX_STACK_DEPTH: usize = 4_096;

/// Run the limits check.
pub fn check_limits(def: &ProgramDefinition) -> Vec<VerifyError> {
    let mut errors = Vec::new();

    if def.bytecode.len() > MAX_PROGRAM_SIZE {
        errors.push(VerifyError::ProgramTooLarge {
            size: def.bytecode.len(),
        });
    }

    if def.machines.len() > MAX_MACHINES {
        errors.push(VerifyError::TooManyMachines {
            count: def.machines.len(),
        });
    }

    for (machine, decl) in def.machines.iter().enumerate() {
        if decl.constants.len() > MAX_CONSTANTS {
            errors.push(VerifyError::TooManyConstants {
                machine,
                count: decl.constants.len(),
            });
        }
    }

    errors
}
