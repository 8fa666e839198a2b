//! Integration tests for the FSM CLI.
//!
//! These tests invoke the `fsm` binary as a subprocess and check
//! exit codes, stdout, and stderr.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[allow(deprecated)]
fn fsm() -> Command {
    Command::cargo_bin("fsm").unwrap()
}

/// Helper: write a manifest into `dir`, returning its path.
fn write_mission(dir: &TempDir, manifest: &str) -> PathBuf {
    let path = dir.path().join("mission.toml");
    fs::write(&path, manifest).unwrap();
    path
}

fn inline(code: &str, machines: &str) -> String {
    format!("code = \"\"\"\n{code}\"\"\"\n\n{machines}")
}

const CONVOY: &str = r#"
source = "convoy.fsm"
entities = [{ label = "leader", object = "car_leader" }]

[[paths]]
name = "road"
nodes = [[0.0, 0.0, 10.0], [0.0, 0.0, 20.0]]

[[machines]]
start = "leader"
constants = [0, 0, 10]

[[world.objects]]
name = "car_leader"
vehicle = true
"#;

const CONVOY_LISTING: &str = "\
leader:
    ARGPUSH_B -4   ; entity
    ARGPUSH_B -3   ; path
    ARGPUSH_B -2   ; speed
    ACTION goto
wait:
    ARGPUSH_B -4
    ACTION isArrived
    JZ again
    RST
again:
    JMP_I wait
";

fn convoy(dir: &TempDir) -> PathBuf {
    fs::write(dir.path().join("convoy.fsm"), CONVOY_LISTING).unwrap();
    write_mission(dir, CONVOY)
}

// ---- No-args / help ----

#[test]
fn no_args_prints_usage_and_exits_1() {
    fsm()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Usage: fsm"));
}

#[test]
fn help_exits_0() {
    fsm()
        .arg("--help")
        .assert()
        .success()
        .stderr(predicate::str::contains("disassemble"));
}

#[test]
fn unknown_command_exits_1() {
    fsm()
        .arg("compile")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown command 'compile'"));
}

// ---- check ----

#[test]
fn check_valid_mission() {
    let dir = TempDir::new().unwrap();
    let path = convoy(&dir);
    fsm()
        .arg("check")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("OK:"))
        .stdout(predicate::str::contains("9 instructions, 1 machines, 2 actions"));
}

#[test]
fn check_warns_about_unbound_actions() {
    let dir = TempDir::new().unwrap();
    let path = write_mission(
        &dir,
        &inline("ACTION fly\nRST\n", "[[machines]]\nstart = 0\n"),
    );
    fsm()
        .arg("check")
        .arg(&path)
        .assert()
        .success()
        .stderr(predicate::str::contains("warning: action 'fly'"));
}

#[test]
fn check_reports_verify_errors_with_exit_2() {
    let dir = TempDir::new().unwrap();
    let path = write_mission(
        &dir,
        &inline("ACTION true\n", "[[machines]]\nstart = 0\n"),
    );
    fsm()
        .arg("check")
        .arg(&path)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("run past the last instruction"));
}

#[test]
fn check_missing_file_exits_1() {
    fsm()
        .args(["check", "/nonexistent/mission.toml"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cannot read"));
}

#[test]
fn check_assembly_error_exits_1() {
    let dir = TempDir::new().unwrap();
    let path = write_mission(
        &dir,
        &inline("JMP nowhere\n", "[[machines]]\nstart = 0\n"),
    );
    fsm()
        .arg("check")
        .arg(&path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("nowhere"));
}

#[test]
fn check_requires_argument() {
    fsm()
        .arg("check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("requires a mission file"));
}

// ---- disassemble ----

#[test]
fn disassemble_prints_canonical_listing() {
    let dir = TempDir::new().unwrap();
    let path = convoy(&dir);
    fsm()
        .arg("disassemble")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::starts_with(".action goto\n.action isArrived\n"))
        .stdout(predicate::str::contains("L4:\nARGPUSH_B -4\nACTION isArrived\nJZ L8\nRST\n"))
        .stdout(predicate::str::contains("L8:\nJMP_I L4\n"));
}

// ---- run ----

#[test]
fn run_drives_convoy_to_completion() {
    let dir = TempDir::new().unwrap();
    let path = convoy(&dir);
    fsm()
        .arg("run")
        .arg(&path)
        .args(["--dt", "0.5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ticks: 5"))
        .stdout(predicate::str::contains("all machines halted"))
        .stdout(predicate::str::contains("digest: "));
}

#[test]
fn run_stops_at_tick_limit() {
    let dir = TempDir::new().unwrap();
    let path = write_mission(
        &dir,
        &inline("idle:\n    JMP_I idle\n", "[[machines]]\nstart = \"idle\"\n"),
    );
    fsm()
        .arg("run")
        .arg(&path)
        .args(["--ticks", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ticks: 3"))
        .stdout(predicate::str::contains("machine 0: running ip=0"))
        .stdout(predicate::str::contains("all machines halted").not());
}

#[test]
fn run_presses_key_on_listed_tick() {
    let dir = TempDir::new().unwrap();
    let code = "\
wait:
    ACTION isKeypress
    JZ later
    RST
later:
    JMP_I wait
";
    let manifest = format!(
        "{}\n[world]\nkey_press_ticks = [3]\n",
        inline(code, "[[machines]]\nstart = 0\n")
    );
    let path = write_mission(&dir, &manifest);
    fsm()
        .arg("run")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("ticks: 3"))
        .stdout(predicate::str::contains("all machines halted"));
}

#[test]
fn key_press_lasts_one_tick() {
    let code = "\
first:
    ACTION isKeypress
    JZ wait_first
    JMP_I second
wait_first:
    JMP_I first
second:
    ACTION isKeypress
    JZ wait_second
    RST
wait_second:
    JMP_I second
";
    let dir = TempDir::new().unwrap();
    let machines = "[[machines]]\nstart = 0\n";

    let once = format!("{}\n[world]\nkey_press_ticks = [2]\n", inline(code, machines));
    let path = write_mission(&dir, &once);
    fsm()
        .arg("run")
        .arg(&path)
        .args(["--ticks", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("machine 0: running"));

    let twice = format!("{}\n[world]\nkey_press_ticks = [2, 4]\n", inline(code, machines));
    let path = write_mission(&dir, &twice);
    fsm()
        .arg("run")
        .arg(&path)
        .args(["--ticks", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ticks: 4"))
        .stdout(predicate::str::contains("all machines halted"));
}

const FAULTY: &str = "\
.action isDead
.action true
bad:
    PUSH 3
    ARGPUSH_S 0
    ACTION isDead
    RST
good:
    ACTION true
    RST
";

#[test]
fn run_fault_exits_3() {
    let dir = TempDir::new().unwrap();
    let path = write_mission(
        &dir,
        &inline(FAULTY, "[[machines]]\nstart = \"bad\"\n\n[[machines]]\nstart = \"good\"\n"),
    );
    fsm()
        .arg("run")
        .arg(&path)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("runtime error: machine 0 faulted"))
        .stdout(predicate::str::contains("machine 1: running"));
}

#[test]
fn run_fault_without_halt_lets_others_finish() {
    let dir = TempDir::new().unwrap();
    let path = write_mission(
        &dir,
        &inline(FAULTY, "[[machines]]\nstart = \"bad\"\n\n[[machines]]\nstart = \"good\"\n"),
    );
    let config = dir.path().join("vm.toml");
    fs::write(&config, "halt_on_fault = false\n").unwrap();
    fsm()
        .arg("run")
        .arg(&path)
        .arg("--config")
        .arg(&config)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("fault: machine 0 faulted"))
        .stdout(predicate::str::contains("machine 1: halted"))
        .stdout(predicate::str::contains("all machines halted"));
}

#[test]
fn run_verify_failure_exits_2() {
    let dir = TempDir::new().unwrap();
    let path = write_mission(
        &dir,
        &inline("ACTION true\n", "[[machines]]\nstart = 0\n"),
    );
    fsm()
        .arg("run")
        .arg(&path)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("run past the last instruction"));
}

#[test]
fn run_loop_without_yield_warns_and_finishes() {
    let dir = TempDir::new().unwrap();
    let code = "\
again:
    PUSH 0
    ARGPUSH_S 0
    ACTION isArrived
    DROP 1
    JZ done
    JMP again
done:
    RST
";
    let manifest = format!(
        "entities = [{{ label = \"car\", object = \"car_01\" }}]\n{}\n[[world.objects]]\nname = \"car_01\"\nvehicle = true\n",
        inline(code, "[[machines]]\nstart = 0\n")
    );
    let path = write_mission(&dir, &manifest);
    fsm()
        .arg("run")
        .arg(&path)
        .assert()
        .success()
        .stderr(predicate::str::contains("without yielding"))
        .stdout(predicate::str::contains("ticks: 1"))
        .stdout(predicate::str::contains("all machines halted"));
}

#[test]
fn run_rejects_unknown_option() {
    let dir = TempDir::new().unwrap();
    let path = convoy(&dir);
    fsm()
        .arg("run")
        .arg(&path)
        .args(["--speed", "2"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown option '--speed'"));
}
