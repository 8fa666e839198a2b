//! FSM CLI: check, disassemble and run mission manifests.
//!
//! Exit codes:
//! - 0: Success
//! - 1: Input/manifest/assembly error
//! - 2: Verification failure
//! - 3: Runtime fault

mod commands;

use std::process;

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "check" => commands::check(&args[2..]),
        "disassemble" => commands::disassemble(&args[2..]),
        "run" => commands::run(&args[2..]),
        "--help" | "-h" | "help" => {
            print_usage();
            process::exit(0);
        }
        other => {
            eprintln!("error: unknown command '{other}'");
            eprintln!();
            print_usage();
            process::exit(1);
        }
    };

    if let Err(code) = result {
        process::exit(code);
    }
}

fn print_usage() {
    eprintln!("Usage: fsm <command> [args]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  check <mission.toml>                  Assemble and verify a mission");
    eprintln!("  disassemble <mission.toml>            Print the canonical listing");
    eprintln!("  run <mission.toml> [options]          Verify and run in a headless world");
    eprintln!();
    eprintln!("Run options:");
    eprintln!("  --ticks N        Stop after N ticks (default 1000)");
    eprintln!("  --dt SECONDS     World time per tick (default 0.1)");
    eprintln!("  --config FILE    Runner configuration (TOML)");
    eprintln!();
    eprintln!("Set RUST_LOG=debug for per-tick tracing.");
}
