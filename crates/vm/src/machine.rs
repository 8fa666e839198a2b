//! Stack machine state: one running instance of a declared program.

use std::collections::VecDeque;

use fsm_common::MachineDecl;

use crate::error::ConfigurationFault;

/// Maximum stack depth per machine.
pub const MAX_STACK_DEPTH: usize = 4096;

/// One running program instance.
///
/// Machines only ever share the program definition and the mission's
/// timers; everything here is private to the instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackMachine {
    /// Address the machine starts at (and returns to on reset).
    pub(crate) start_address: usize,
    /// Read-only constants, addressed from the end by ARGPUSH_B.
    pub(crate) constants: Vec<i32>,
    /// Arguments recorded by the compiler for this instance.
    pub(crate) initial_arguments: Vec<i32>,
    /// Instruction pointer.
    pub(crate) ip: usize,
    /// Operand stack. The last element is the top.
    pub(crate) stack: Vec<i32>,
    /// Set by RST. A halted machine never executes again.
    pub(crate) halted: bool,
    /// Result of the last ACTION, toggled by NEG, tested by JZ.
    pub(crate) result_reg: i32,
    /// Arguments collected for the next ACTION.
    pub(crate) argument_queue: VecDeque<i32>,
}

impl StackMachine {
    /// Create a machine positioned at its declared start address.
    pub fn new(decl: &MachineDecl) -> Self {
        Self {
            start_address: decl.start_address,
            constants: decl.constants.clone(),
            initial_arguments: decl.initial_arguments.clone(),
            ip: decl.start_address,
            stack: Vec::new(),
            halted: false,
            result_reg: 0,
            argument_queue: VecDeque::new(),
        }
    }

    /// Return to the freshly created state.
    pub fn reset(&mut self) {
        self.ip = self.start_address;
        self.stack.clear();
        self.halted = false;
        self.result_reg = 0;
        self.argument_queue.clear();
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn result_reg(&self) -> i32 {
        self.result_reg
    }

    /// Stack contents, bottom first.
    pub fn stack(&self) -> &[i32] {
        &self.stack
    }

    pub fn argument_queue(&self) -> &VecDeque<i32> {
        &self.argument_queue
    }

    pub fn constants(&self) -> &[i32] {
        &self.constants
    }

    pub fn initial_arguments(&self) -> &[i32] {
        &self.initial_arguments
    }

    pub fn start_address(&self) -> usize {
        self.start_address
    }

    pub(crate) fn halt(&mut self) {
        self.halted = true;
    }

    /// Push a value onto the stack, checking for overflow.
    pub(crate) fn push(&mut self, value: i32, at: usize) -> Result<(), ConfigurationFault> {
        if self.stack.len() >= MAX_STACK_DEPTH {
            return Err(ConfigurationFault::StackOverflow { at });
        }
        self.stack.push(value);
        Ok(())
    }

    /// Pop a value from the stack.
    pub(crate) fn pop(&mut self, at: usize) -> Result<i32, ConfigurationFault> {
        self.stack
            .pop()
            .ok_or(ConfigurationFault::StackUnderflow { at })
    }

    /// Read the slot `offset` places below the top (0 is the top).
    pub(crate) fn peek(&self, offset: i32, at: usize) -> Result<i32, ConfigurationFault> {
        let depth = self.stack.len();
        usize::try_from(offset)
            .ok()
            .filter(|&o| o < depth)
            .map(|o| self.stack[depth - 1 - o])
            .ok_or(ConfigurationFault::StackIndexOutOfRange { at, offset, depth })
    }

    /// Read a constant addressed from the end of the array.
    ///
    /// The compiler emits frame-relative offsets: slot `len + offset + 1`,
    /// so `-2` is the last constant.
    pub(crate) fn constant(&self, offset: i32, at: usize) -> Result<i32, ConfigurationFault> {
        let len = self.constants.len();
        let index = len as i64 + i64::from(offset) + 1;
        usize::try_from(index)
            .ok()
            .and_then(|i| self.constants.get(i).copied())
            .ok_or(ConfigurationFault::ConstantOutOfRange { at, offset, len })
    }
}
