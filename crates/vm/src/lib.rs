//! Mission-script virtual machine: stack machines, a cooperative scheduler
//! and the native action boundary.
//!
//! A [`ProgramDefinition`](fsm_common::ProgramDefinition) declares one or
//! more stack machines over a shared bytecode stream. A [`Runner`] gives
//! each live machine one turn per [`Runner::advance`], running it until it
//! executes a yielding instruction (`JMP_I` or `RST`). `ACTION` calls go to
//! a [`NativeActions`] implementation supplied by the host.
//!
//! # Usage
//!
//! ```
//! use fsm_common::{Instruction, MachineDecl, Opcode, ProgramDefinition};
//! use fsm_vm::{headless::SimWorld, Runner, StandardActions};
//!
//! // loop: if true() { halt } else { yield and retry }
//! let def = ProgramDefinition::new(
//!     vec![
//!         Instruction::new(Opcode::Action, 0),
//!         Instruction::new(Opcode::Jz, 3),
//!         Instruction::new(Opcode::Rst, 0),
//!         Instruction::new(Opcode::JmpI, 0),
//!     ],
//!     vec![MachineDecl::new(0)],
//! )
//! .with_actions(["true"]);
//!
//! let mut runner = Runner::new(def, StandardActions::new(SimWorld::new()));
//! let report = runner.advance().unwrap();
//! assert_eq!(report.halted, 1);
//! assert!(runner.is_finished());
//! ```

pub mod actions;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod execute;
pub mod headless;
pub mod machine;
pub mod runner;

pub use actions::{Builtin, Pilot, StandardActions, Transform, World};
pub use config::{ConfigError, RunnerConfig};
pub use dispatch::{ActionEnv, ActionError, Arguments, NativeActions, NoActions, Timers};
pub use error::{ConfigurationFault, MachineFault};
pub use execute::Flow;
pub use machine::StackMachine;
pub use runner::{Runner, TickReport};
