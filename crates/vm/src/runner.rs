//! The cooperative scheduler.
//!
//! A [`Runner`] owns everything a mission's scripts need: the program
//! definition, one stack machine per declaration, the shared timers and the
//! host's native actions. Each call to [`Runner::advance`] is one scheduling
//! tick: a single pass over the machines in declaration order, letting each
//! live machine run until it yields.

use std::collections::HashSet;
use std::sync::Arc;

use fsm_common::ProgramDefinition;
use tracing::{debug, error, warn};

use crate::config::RunnerConfig;
use crate::dispatch::{ActionEnv, ActionError, Arguments, NativeActions, Timers};
use crate::error::{ConfigurationFault, MachineFault};
use crate::execute::ActionRequest;
use crate::machine::StackMachine;

/// Summary of one scheduling tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// Machines that were not halted at the start of their turn.
    pub machines_run: usize,
    /// Instructions executed across all machines.
    pub instructions: u64,
    /// Machines that executed RST this tick.
    pub halted: usize,
    /// ACTION calls that had no native binding.
    pub unbound_calls: usize,
    /// Faults absorbed because `halt_on_fault` is off.
    pub faults: Vec<MachineFault>,
}

/// One mission's VM instance.
pub struct Runner<A> {
    definition: Arc<ProgramDefinition>,
    machines: Vec<StackMachine>,
    timers: Timers,
    actions: A,
    config: RunnerConfig,
    tick: u64,
    poisoned: Option<MachineFault>,
    unbound_seen: HashSet<String>,
}

impl<A: NativeActions> Runner<A> {
    /// Create a runner with the default configuration.
    pub fn new(definition: impl Into<Arc<ProgramDefinition>>, actions: A) -> Self {
        Self::with_config(definition, actions, RunnerConfig::default())
    }

    pub fn with_config(
        definition: impl Into<Arc<ProgramDefinition>>,
        actions: A,
        config: RunnerConfig,
    ) -> Self {
        let definition = definition.into();
        let machines = definition.machines.iter().map(StackMachine::new).collect();
        Self {
            definition,
            machines,
            timers: Timers::new(),
            actions,
            config,
            tick: 0,
            poisoned: None,
            unbound_seen: HashSet::new(),
        }
    }

    /// Run one scheduling tick.
    ///
    /// Returns the fault that stopped the mission if a machine raised a
    /// configuration fault and `halt_on_fault` is set. A stopped runner
    /// keeps returning that fault without executing anything.
    pub fn advance(&mut self) -> Result<TickReport, MachineFault> {
        if let Some(fault) = &self.poisoned {
            return Err(fault.clone());
        }

        self.tick += 1;
        let mut report = TickReport {
            tick: self.tick,
            ..TickReport::default()
        };

        for index in 0..self.machines.len() {
            if self.machines[index].is_halted() {
                continue;
            }
            report.machines_run += 1;

            if let Err(fault) = self.run_machine(index, &mut report) {
                self.machines[index].halt();
                let fault = MachineFault {
                    machine: index,
                    fault,
                };
                error!(tick = self.tick, "{fault}");
                if self.config.halt_on_fault {
                    self.poisoned = Some(fault.clone());
                    return Err(fault);
                }
                report.faults.push(fault);
            } else if self.machines[index].is_halted() {
                debug!(tick = self.tick, machine = index, "machine halted");
                report.halted += 1;
            }
        }

        debug!(
            tick = report.tick,
            machines_run = report.machines_run,
            instructions = report.instructions,
            "tick complete"
        );
        Ok(report)
    }

    fn run_machine(
        &mut self,
        index: usize,
        report: &mut TickReport,
    ) -> Result<(), ConfigurationFault> {
        let definition = Arc::clone(&self.definition);
        let machine = &mut self.machines[index];
        let timers = &mut self.timers;
        let actions = &mut self.actions;
        let unbound_seen = &mut self.unbound_seen;
        let warn_once = self.config.warn_unbound_once;
        let mut unbound_calls = 0;

        let executed = machine.run_turn(
            &definition,
            self.config.instruction_budget,
            |request: ActionRequest<'_>| {
                let ActionRequest { name, at, args, .. } = request;
                let mut args = Arguments::new(name, args);
                let mut env = ActionEnv::new(&definition, &mut *timers, name, index, at);
                match actions.dispatch(name, &mut args, &mut env) {
                    Ok(result) => Ok(result),
                    Err(ActionError::Unbound { name }) => {
                        unbound_calls += 1;
                        if !warn_once || unbound_seen.insert(name.clone()) {
                            warn!(action = %name, machine = index, at, "native action not bound");
                        }
                        Ok(0)
                    }
                    Err(source) => Err(ConfigurationFault::ActionArguments {
                        at,
                        action: name.to_string(),
                        source,
                    }),
                }
            },
        );

        report.unbound_calls += unbound_calls;
        report.instructions += executed?;
        Ok(())
    }

    /// Restart every machine from its start address and clear the timers.
    pub fn reset(&mut self) {
        for machine in &mut self.machines {
            machine.reset();
        }
        self.timers = Timers::new();
        self.tick = 0;
        self.poisoned = None;
        self.unbound_seen.clear();
    }

    /// Hash of every machine's execution state and the timers.
    ///
    /// Two runners fed the same definition and the same elapsed-time inputs
    /// produce the same digest after the same number of ticks.
    pub fn state_digest(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        for machine in &self.machines {
            hasher.update(&(machine.ip() as u64).to_le_bytes());
            hasher.update(&[u8::from(machine.is_halted())]);
            hasher.update(&machine.result_reg().to_le_bytes());
            hasher.update(&(machine.stack().len() as u64).to_le_bytes());
            for value in machine.stack() {
                hasher.update(&value.to_le_bytes());
            }
        }
        for timer in self.timers.as_slice() {
            hasher.update(&timer.to_bits().to_le_bytes());
        }
        hasher.finalize()
    }

    /// Number of completed ticks.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// The fault that stopped the mission, if any.
    pub fn fault(&self) -> Option<&MachineFault> {
        self.poisoned.as_ref()
    }

    /// True when every machine has halted.
    pub fn is_finished(&self) -> bool {
        self.machines.iter().all(StackMachine::is_halted)
    }

    pub fn definition(&self) -> &ProgramDefinition {
        &self.definition
    }

    pub fn machines(&self) -> &[StackMachine] {
        &self.machines
    }

    pub fn machine(&self, index: usize) -> Option<&StackMachine> {
        self.machines.get(index)
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    pub fn timers_mut(&mut self) -> &mut Timers {
        &mut self.timers
    }

    pub fn actions(&self) -> &A {
        &self.actions
    }

    pub fn actions_mut(&mut self) -> &mut A {
        &mut self.actions
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::NoActions;
    use fsm_common::{Instruction, MachineDecl, Opcode};

    fn op(opcode: Opcode, operand: i32) -> Instruction {
        Instruction::new(opcode, operand)
    }

    /// Answers `true` with 1 and records every call; anything else is unbound.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<(usize, String, Vec<i32>)>,
    }

    impl NativeActions for Recorder {
        fn dispatch(
            &mut self,
            name: &str,
            args: &mut Arguments<'_>,
            env: &mut ActionEnv<'_>,
        ) -> Result<i32, ActionError> {
            let mut seen = Vec::new();
            while args.remaining() > 0 {
                seen.push(args.next()?);
            }
            self.calls.push((env.machine(), name.to_string(), seen));
            match name {
                "true" => Ok(1),
                "null" => Ok(0),
                "needsArg" => args.next(),
                other => Err(ActionError::Unbound {
                    name: other.to_string(),
                }),
            }
        }
    }

    #[test]
    fn machines_run_in_declaration_order() {
        let def = ProgramDefinition::new(
            vec![
                op(Opcode::Push, 1),
                op(Opcode::ArgPushS, 0),
                op(Opcode::Action, 0),
                op(Opcode::Rst, 0),
                op(Opcode::Action, 1),
                op(Opcode::JmpI, 4),
            ],
            vec![MachineDecl::new(4), MachineDecl::new(0)],
        )
        .with_actions(["true", "null"]);
        let mut runner = Runner::new(def, Recorder::default());
        let report = runner.advance().unwrap();

        assert_eq!(report.machines_run, 2);
        assert_eq!(report.instructions, 2 + 4);
        assert_eq!(report.halted, 1);
        let order: Vec<_> = runner.actions().calls.iter().map(|c| c.0).collect();
        assert_eq!(order, vec![0, 1]);
        assert_eq!(runner.actions().calls[1].2, vec![1]);
    }

    #[test]
    fn halted_machines_are_skipped() {
        let def = ProgramDefinition::new(vec![op(Opcode::Rst, 0)], vec![MachineDecl::new(0)]);
        let mut runner = Runner::new(def, NoActions);
        assert_eq!(runner.advance().unwrap().halted, 1);
        let report = runner.advance().unwrap();
        assert_eq!(report.machines_run, 0);
        assert_eq!(report.instructions, 0);
        assert!(runner.is_finished());
    }

    #[test]
    fn unbound_action_yields_zero_and_continues() {
        let def = ProgramDefinition::new(
            vec![op(Opcode::Neg, 0), op(Opcode::Action, 0), op(Opcode::Rst, 0)],
            vec![MachineDecl::new(0)],
        )
        .with_actions(["flyToMoon"]);
        let mut runner = Runner::new(def, NoActions);
        let report = runner.advance().unwrap();
        assert_eq!(report.unbound_calls, 1);
        assert_eq!(runner.machine(0).unwrap().result_reg(), 0);
        assert!(runner.machine(0).unwrap().is_halted());
    }

    #[test]
    fn fault_poisons_runner_by_default() {
        let def = ProgramDefinition::new(
            vec![op(Opcode::Drop, 0), op(Opcode::Rst, 0)],
            vec![MachineDecl::new(1), MachineDecl::new(0), MachineDecl::new(1)],
        );
        let mut runner = Runner::new(def, NoActions);
        let fault = runner.advance().unwrap_err();
        assert_eq!(fault.machine, 1);
        assert_eq!(fault.fault, ConfigurationFault::InvalidDrop { at: 0, count: 0 });
        // The machine after the faulting one never ran.
        assert!(!runner.machine(2).unwrap().is_halted());
        assert_eq!(runner.advance().unwrap_err(), fault);
        assert_eq!(runner.tick(), 1);
        assert_eq!(runner.fault(), Some(&fault));
    }

    #[test]
    fn fault_isolated_when_halt_on_fault_is_off() {
        let def = ProgramDefinition::new(
            vec![op(Opcode::Drop, 1), op(Opcode::Rst, 0)],
            vec![MachineDecl::new(0), MachineDecl::new(1)],
        );
        let config = RunnerConfig::default().with_halt_on_fault(false);
        let mut runner = Runner::with_config(def, NoActions, config);
        let report = runner.advance().unwrap();
        assert_eq!(report.faults.len(), 1);
        assert_eq!(report.faults[0].machine, 0);
        assert_eq!(report.halted, 1);
        assert!(runner.is_finished());
        assert!(runner.fault().is_none());
    }

    #[test]
    fn malformed_action_arguments_fault() {
        let def = ProgramDefinition::new(
            vec![op(Opcode::Action, 0), op(Opcode::Rst, 0)],
            vec![MachineDecl::new(0)],
        )
        .with_actions(["needsArg"]);
        let mut runner = Runner::new(def, Recorder::default());
        let fault = runner.advance().unwrap_err();
        assert!(matches!(
            fault.fault,
            ConfigurationFault::ActionArguments {
                at: 0,
                source: ActionError::MissingArgument { .. },
                ..
            }
        ));
    }

    #[test]
    fn budget_fires_on_busy_loop() {
        let def = ProgramDefinition::new(vec![op(Opcode::Jmp, 0)], vec![MachineDecl::new(0)]);
        let config = RunnerConfig::default().with_instruction_budget(64);
        let mut runner = Runner::with_config(def, NoActions, config);
        let fault = runner.advance().unwrap_err();
        assert_eq!(
            fault.fault,
            ConfigurationFault::BudgetExhausted { at: 0, limit: 64 }
        );
    }

    #[test]
    fn reset_restores_fresh_state() {
        let def = ProgramDefinition::new(
            vec![op(Opcode::Push, 3), op(Opcode::JmpI, 1)],
            vec![MachineDecl::new(0)],
        );
        let mut runner = Runner::new(def, NoActions);
        let fresh = runner.state_digest();
        runner.timers_mut().set(0, 4.0);
        runner.advance().unwrap();
        assert_ne!(runner.state_digest(), fresh);
        runner.reset();
        assert_eq!(runner.state_digest(), fresh);
        assert_eq!(runner.tick(), 0);
    }

    #[test]
    fn digest_tracks_timers() {
        let def = ProgramDefinition::new(vec![op(Opcode::Rst, 0)], vec![MachineDecl::new(0)]);
        let mut a = Runner::new(def.clone(), NoActions);
        let b = Runner::new(def, NoActions);
        assert_eq!(a.state_digest(), b.state_digest());
        a.timers_mut().set(3, 1.5);
        assert_ne!(a.state_digest(), b.state_digest());
    }
}
