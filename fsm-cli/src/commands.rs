//! CLI command implementations.

use std::path::Path;

use fsm_cli::Mission;
use fsm_common::ProgramDefinition;
use fsm_vm::headless::SimWorld;
use fsm_vm::{Runner, RunnerConfig, StandardActions};

const DEFAULT_TICKS: u64 = 1000;
const DEFAULT_DT: f32 = 0.1;

/// Assemble and verify a mission manifest.
pub fn check(args: &[String]) -> Result<(), i32> {
    let Some(input) = args.first() else {
        eprintln!("error: check requires a mission file");
        eprintln!("Usage: fsm check <mission.toml>");
        return Err(1);
    };

    let mission = load(input)?;
    verify_or_report(&mission.definition)?;
    report_busy_loops(&mission.definition);
    report_unbound(&mission.definition, &StandardActions::new(SimWorld::new()));

    println!(
        "OK: {input} ({} instructions, {} machines, {} actions)",
        mission.definition.len(),
        mission.definition.machines.len(),
        mission.definition.actions.len()
    );
    Ok(())
}

/// Print the canonical listing of a mission's bytecode.
pub fn disassemble(args: &[String]) -> Result<(), i32> {
    let Some(input) = args.first() else {
        eprintln!("error: disassemble requires a mission file");
        eprintln!("Usage: fsm disassemble <mission.toml>");
        return Err(1);
    };

    let mission = load(input)?;
    print!(
        "{}",
        fsm_assembler::disassemble(&mission.definition.bytecode, &mission.definition.actions)
    );
    Ok(())
}

struct RunOptions {
    ticks: u64,
    dt: f32,
    config: Option<String>,
}

impl RunOptions {
    fn parse(args: &[String]) -> Result<Self, i32> {
        let mut options = RunOptions {
            ticks: DEFAULT_TICKS,
            dt: DEFAULT_DT,
            config: None,
        };
        let mut rest = args.iter();
        while let Some(flag) = rest.next() {
            let Some(value) = rest.next() else {
                eprintln!("error: {flag} requires a value");
                return Err(1);
            };
            match flag.as_str() {
                "--ticks" => options.ticks = parse_value(flag, value)?,
                "--dt" => options.dt = parse_value(flag, value)?,
                "--config" => options.config = Some(value.clone()),
                other => {
                    eprintln!("error: unknown option '{other}'");
                    return Err(1);
                }
            }
        }
        Ok(options)
    }
}

fn parse_value<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T, i32> {
    value.parse().map_err(|_| {
        eprintln!("error: invalid value '{value}' for {flag}");
        1
    })
}

/// Verify a mission and run it in a headless world.
pub fn run(args: &[String]) -> Result<(), i32> {
    let Some(input) = args.first() else {
        eprintln!("error: run requires a mission file");
        eprintln!(
            "Usage: fsm run <mission.toml> [--ticks N] [--dt SECONDS] [--config FILE]"
        );
        return Err(1);
    };
    let options = RunOptions::parse(&args[1..])?;

    let mission = load(input)?;
    verify_or_report(&mission.definition)?;
    report_busy_loops(&mission.definition);

    let config = match &options.config {
        Some(path) => RunnerConfig::load(Path::new(path)).map_err(|e| {
            eprintln!("error: {e}");
            1
        })?,
        None => RunnerConfig::default(),
    };

    let actions = StandardActions::new(mission.build_world());
    report_unbound(&mission.definition, &actions);
    let mut runner = Runner::with_config(mission.definition.clone(), actions, config);

    let mut faulted = false;
    while runner.tick() < options.ticks && !runner.is_finished() {
        let pressed = mission.key_pressed_on(runner.tick() + 1);
        runner.actions_mut().world_mut().set_key_pressed(pressed);

        match runner.advance() {
            Ok(report) => {
                for fault in &report.faults {
                    eprintln!("fault: {fault}");
                    faulted = true;
                }
            }
            Err(fault) => {
                eprintln!("runtime error: {fault}");
                print_summary(&runner);
                return Err(3);
            }
        }
        runner.actions_mut().world_mut().step(options.dt);
    }

    print_summary(&runner);
    if faulted {
        Err(3)
    } else {
        Ok(())
    }
}

// ---- Helpers ----

fn load(input: &str) -> Result<Mission, i32> {
    Mission::load(Path::new(input)).map_err(|e| {
        eprintln!("error: {e:#}");
        1
    })
}

fn verify_or_report(def: &ProgramDefinition) -> Result<(), i32> {
    fsm_verifier::verify(def).map_err(|errors| {
        for e in &errors {
            eprintln!("error: {e}");
        }
        2
    })
}

fn report_busy_loops(def: &ProgramDefinition) {
    for warning in fsm_verifier::busy_loops(def) {
        eprintln!("warning: {warning}");
    }
}

fn report_unbound(def: &ProgramDefinition, actions: &StandardActions<SimWorld>) {
    for name in fsm_verifier::unbound_actions(def, |name| actions.binds(name)) {
        eprintln!("warning: action '{name}' has no native binding and evaluates to 0");
    }
}

fn print_summary(runner: &Runner<StandardActions<SimWorld>>) {
    println!("ticks: {}", runner.tick());
    for (i, machine) in runner.machines().iter().enumerate() {
        let state = if machine.is_halted() { "halted" } else { "running" };
        println!(
            "machine {i}: {state} ip={} result={} stack={:?}",
            machine.ip(),
            machine.result_reg(),
            machine.stack()
        );
    }
    println!("digest: {}", runner.state_digest().to_hex());
    if runner.is_finished() {
        println!("all machines halted");
    }
}
