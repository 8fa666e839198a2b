//! Instruction execution for a single stack machine.
//!
//! `step` executes exactly one instruction; `run_turn` keeps stepping until
//! the machine yields. Native calls are delegated through a callback so the
//! machine never sees the dispatcher or the shared timers directly.

use std::collections::VecDeque;

use fsm_common::{Opcode, ProgramDefinition};
use tracing::trace;

use crate::error::ConfigurationFault;
use crate::machine::StackMachine;

/// What the scheduler should do after an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep executing this machine.
    Continue,
    /// The machine's turn is over for this tick (JMP_I or RST).
    Yield,
}

/// A resolved `ACTION` call handed to the host callback.
pub struct ActionRequest<'a> {
    /// Index into the action table.
    pub index: usize,
    /// Action name from the table.
    pub name: &'a str,
    /// Instruction index of the `ACTION`.
    pub at: usize,
    /// The machine's argument queue, in enqueue order.
    pub args: &'a mut VecDeque<i32>,
}

impl StackMachine {
    /// Execute one instruction.
    ///
    /// The instruction pointer advances before the instruction runs, so
    /// jumps overwrite it and everything else falls through.
    pub fn step<F>(
        &mut self,
        definition: &ProgramDefinition,
        on_action: &mut F,
    ) -> Result<Flow, ConfigurationFault>
    where
        F: FnMut(ActionRequest<'_>) -> Result<i32, ConfigurationFault>,
    {
        let at = self.ip;
        let instr = *definition
            .instruction(at)
            .ok_or(ConfigurationFault::InstructionPointerOutOfRange { at })?;
        let opcode = instr
            .opcode()
            .map_err(|source| ConfigurationFault::InvalidOpcode { at, source })?;
        self.ip += 1;

        trace!(at, %instr, "step");

        match opcode {
            Opcode::Push => self.push(instr.operand, at)?,
            Opcode::ArgPushS => {
                let value = self.peek(instr.operand, at)?;
                self.argument_queue.push_back(value);
            }
            Opcode::ArgPushB => {
                let value = self.constant(instr.operand, at)?;
                self.argument_queue.push_back(value);
            }
            Opcode::Adjust => self.exec_adjust(instr.operand, at)?,
            Opcode::Drop => self.exec_drop(instr.operand, at)?,
            Opcode::Jmp => self.ip = jump_target(definition, instr.operand, at)?,
            Opcode::Jz => {
                if self.result_reg == 0 {
                    self.ip = jump_target(definition, instr.operand, at)?;
                }
            }
            Opcode::JmpI => {
                self.ip = jump_target(definition, instr.operand, at)?;
                return Ok(Flow::Yield);
            }
            Opcode::Rst => {
                self.halted = true;
                return Ok(Flow::Yield);
            }
            Opcode::Action => self.exec_action(definition, instr.operand, at, on_action)?,
            Opcode::Neg => self.result_reg = i32::from(self.result_reg != 1),
        }

        Ok(Flow::Continue)
    }

    /// Step until the machine yields.
    ///
    /// With `budget = None` there is no limit on how many non-yielding
    /// instructions run. Returns the number of instructions executed.
    pub fn run_turn<F>(
        &mut self,
        definition: &ProgramDefinition,
        budget: Option<u64>,
        mut on_action: F,
    ) -> Result<u64, ConfigurationFault>
    where
        F: FnMut(ActionRequest<'_>) -> Result<i32, ConfigurationFault>,
    {
        let mut executed = 0u64;
        loop {
            if let Some(limit) = budget {
                if executed >= limit {
                    return Err(ConfigurationFault::BudgetExhausted { at: self.ip, limit });
                }
            }
            let flow = self.step(definition, &mut on_action)?;
            executed += 1;
            if flow == Flow::Yield {
                return Ok(executed);
            }
        }
    }

    fn exec_adjust(&mut self, count: i32, at: usize) -> Result<(), ConfigurationFault> {
        if count <= 0 {
            return Err(ConfigurationFault::InvalidAdjust { at, count });
        }
        for _ in 0..count {
            self.push(0, at)?;
        }
        Ok(())
    }

    fn exec_drop(&mut self, count: i32, at: usize) -> Result<(), ConfigurationFault> {
        if count <= 0 {
            return Err(ConfigurationFault::InvalidDrop { at, count });
        }
        for _ in 0..count {
            self.pop(at)?;
        }
        Ok(())
    }

    fn exec_action<F>(
        &mut self,
        definition: &ProgramDefinition,
        operand: i32,
        at: usize,
        on_action: &mut F,
    ) -> Result<(), ConfigurationFault>
    where
        F: FnMut(ActionRequest<'_>) -> Result<i32, ConfigurationFault>,
    {
        let (index, name) = usize::try_from(operand)
            .ok()
            .and_then(|i| definition.action(i).map(|name| (i, name)))
            .ok_or(ConfigurationFault::UnknownAction { at, index: operand })?;

        let outcome = on_action(ActionRequest {
            index,
            name,
            at,
            args: &mut self.argument_queue,
        });
        // The queue never outlives its ACTION, whatever the host did with it.
        self.argument_queue.clear();
        self.result_reg = outcome?;
        Ok(())
    }
}

fn jump_target(
    definition: &ProgramDefinition,
    operand: i32,
    at: usize,
) -> Result<usize, ConfigurationFault> {
    usize::try_from(operand)
        .ok()
        .filter(|&t| t < definition.len())
        .ok_or(ConfigurationFault::InvalidJumpTarget { at, target: operand })
}
