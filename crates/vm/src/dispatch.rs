//! The native-call boundary: what an `ACTION` instruction hands the host.
//!
//! The VM resolves the action name and collects arguments; everything else
//! belongs to a [`NativeActions`] implementation. Timers are the only state
//! the VM owns on the host's behalf.

use std::collections::VecDeque;

use fsm_common::{EntityRef, FsmPath, ProgramDefinition};
use thiserror::Error;

/// Number of timer slots shared by all machines of a mission.
pub const TIMER_SLOTS: usize = 10;

/// Errors a native action can report.
///
/// [`ActionError::Unbound`] is recoverable: the runner logs it and the
/// action evaluates to 0. Every other variant means the compiled call site
/// is malformed and becomes a configuration fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// The host has no binding for this name.
    #[error("no native binding for action '{name}'")]
    Unbound { name: String },

    /// The argument queue ran dry.
    #[error("action '{action}' expected argument {position} but the queue is empty")]
    MissingArgument { action: String, position: usize },

    /// An argument does not index into the named table.
    #[error("action '{action}': {value} is not a valid {table} index")]
    IndexOutOfRange {
        action: String,
        table: &'static str,
        value: i32,
    },
}

impl ActionError {
    pub fn is_unbound(&self) -> bool {
        matches!(self, ActionError::Unbound { .. })
    }
}

/// Elapsed-time baselines written by `startTimer` and read by `timeGreater`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Timers {
    slots: [f32; TIMER_SLOTS],
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: usize) -> Option<f32> {
        self.slots.get(slot).copied()
    }

    /// Store a baseline. Returns false if the slot does not exist.
    pub fn set(&mut self, slot: usize, value: f32) -> bool {
        match self.slots.get_mut(slot) {
            Some(s) => {
                *s = value;
                true
            }
            None => false,
        }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.slots
    }
}

/// The argument queue of the calling machine, consumed front to back.
pub struct Arguments<'a> {
    action: &'a str,
    queue: &'a mut VecDeque<i32>,
    taken: usize,
}

impl<'a> Arguments<'a> {
    pub fn new(action: &'a str, queue: &'a mut VecDeque<i32>) -> Self {
        Self {
            action,
            queue,
            taken: 0,
        }
    }

    /// Dequeue the next argument.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<i32, ActionError> {
        let value = self
            .queue
            .pop_front()
            .ok_or_else(|| ActionError::MissingArgument {
                action: self.action.to_string(),
                position: self.taken,
            })?;
        self.taken += 1;
        Ok(value)
    }

    /// Dequeue exactly `N` arguments.
    pub fn take<const N: usize>(&mut self) -> Result<[i32; N], ActionError> {
        let mut out = [0; N];
        for slot in &mut out {
            *slot = self.next()?;
        }
        Ok(out)
    }

    /// Arguments not yet consumed.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn action(&self) -> &str {
        self.action
    }
}

/// Shared state and tables visible to a native action.
pub struct ActionEnv<'a> {
    definition: &'a ProgramDefinition,
    timers: &'a mut Timers,
    action: &'a str,
    machine: usize,
    at: usize,
}

impl<'a> ActionEnv<'a> {
    pub fn new(
        definition: &'a ProgramDefinition,
        timers: &'a mut Timers,
        action: &'a str,
        machine: usize,
        at: usize,
    ) -> Self {
        Self {
            definition,
            timers,
            action,
            machine,
            at,
        }
    }

    /// Index of the calling machine in declaration order.
    pub fn machine(&self) -> usize {
        self.machine
    }

    /// Instruction index of the `ACTION` being executed.
    pub fn at(&self) -> usize {
        self.at
    }

    pub fn definition(&self) -> &'a ProgramDefinition {
        self.definition
    }

    pub fn entity(&self, index: i32) -> Result<&'a EntityRef, ActionError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.definition.entity(i))
            .ok_or_else(|| self.out_of_range("entity", index))
    }

    pub fn path(&self, index: i32) -> Result<&'a FsmPath, ActionError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.definition.path(i))
            .ok_or_else(|| self.out_of_range("path", index))
    }

    pub fn sound_clip(&self, index: i32) -> Result<&'a str, ActionError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.definition.sound_clip(i))
            .ok_or_else(|| self.out_of_range("sound clip", index))
    }

    pub fn timer(&self, slot: i32) -> Result<f32, ActionError> {
        usize::try_from(slot)
            .ok()
            .and_then(|s| self.timers.get(s))
            .ok_or_else(|| self.out_of_range("timer", slot))
    }

    pub fn set_timer(&mut self, slot: i32, value: f32) -> Result<(), ActionError> {
        match usize::try_from(slot) {
            Ok(s) if self.timers.set(s, value) => Ok(()),
            _ => Err(self.out_of_range("timer", slot)),
        }
    }

    fn out_of_range(&self, table: &'static str, value: i32) -> ActionError {
        ActionError::IndexOutOfRange {
            action: self.action.to_string(),
            table,
            value,
        }
    }
}

/// Host implementation of the native action vocabulary.
///
/// Called synchronously from the runner with the calling machine's
/// argument queue. The return value lands in the result register; use 1
/// for true/success and 0 for false/no effect.
pub trait NativeActions {
    fn dispatch(
        &mut self,
        name: &str,
        args: &mut Arguments<'_>,
        env: &mut ActionEnv<'_>,
    ) -> Result<i32, ActionError>;
}

impl<T: NativeActions + ?Sized> NativeActions for Box<T> {
    fn dispatch(
        &mut self,
        name: &str,
        args: &mut Arguments<'_>,
        env: &mut ActionEnv<'_>,
    ) -> Result<i32, ActionError> {
        (**self).dispatch(name, args, env)
    }
}

/// Dispatcher with no bindings. Every action is unbound.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoActions;

impl NativeActions for NoActions {
    fn dispatch(
        &mut self,
        name: &str,
        _args: &mut Arguments<'_>,
        _env: &mut ActionEnv<'_>,
    ) -> Result<i32, ActionError> {
        Err(ActionError::Unbound {
            name: name.to_string(),
        })
    }
}
