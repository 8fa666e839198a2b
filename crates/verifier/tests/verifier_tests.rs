//! Integration tests for the FSM verifier.
//!
//! Programs are written as listings and assembled, so each test reads like
//! the mission code that would trigger the error.

use fsm_assembler::assemble;
use fsm_common::{MachineDecl, ProgramDefinition};
use fsm_verifier::{busy_loops, unbound_actions, verify, VerifyError};
use proptest::prelude::*;

// ---- Test helpers ----

fn program(text: &str, machines: Vec<MachineDecl>) -> ProgramDefinition {
    assemble(text).unwrap().into_definition(machines)
}

fn at_label(text: &str, label: &str) -> MachineDecl {
    MachineDecl::new(assemble(text).unwrap().label(label).unwrap())
}

// ---- Valid missions ----

const CONVOY: &str = "\
.action true
.action startTimer
.action timeGreater
.action goto
.action isArrived

leader:
    PUSH 0
    ARGPUSH_S 0
    ACTION startTimer
    DROP 1
wait:
    ARGPUSH_B -3        ; timer slot
    ARGPUSH_B -2        ; seconds
    ACTION timeGreater
    JZ not_yet
    ARGPUSH_B -4        ; entity
    ARGPUSH_B -3        ; path
    ARGPUSH_B -2        ; speed
    ACTION goto
drive:
    ARGPUSH_B -4
    ACTION isArrived
    JZ driving
    RST
driving:
    JMP_I drive
not_yet:
    JMP_I wait

escort:
    ACTION true
    JZ escort_idle
    RST
escort_idle:
    JMP_I escort
";

#[test]
fn convoy_mission_verifies() {
    let def = program(
        CONVOY,
        vec![
            at_label(CONVOY, "leader").with_constants(vec![0, 0, 5]),
            at_label(CONVOY, "escort"),
        ],
    );
    assert_eq!(verify(&def), Ok(()));
}

#[test]
fn shared_code_checked_per_declaration() {
    // Same code, but the second declaration lacks the constants it reads.
    let def = program(
        CONVOY,
        vec![
            at_label(CONVOY, "leader").with_constants(vec![0, 0, 5]),
            at_label(CONVOY, "leader").with_constants(vec![0]),
        ],
    );
    let errors = verify(&def).unwrap_err();
    assert!(!errors.is_empty());
    assert!(errors.iter().all(|e| matches!(
        e,
        VerifyError::ConstantOutOfRange { machine: 1, len: 1, .. }
    )));
}

// ---- Structural ----

#[test]
fn unused_opcode_reported() {
    let def = program(".raw 11 0\nRST\n", vec![MachineDecl::new(1)]);
    let errors = verify(&def).unwrap_err();
    assert!(matches!(errors[0], VerifyError::InvalidOpcode { at: 0, .. }));
}

#[test]
fn action_index_past_table() {
    let def = program(".action true\nACTION 1\nRST\n", vec![MachineDecl::new(0)]);
    assert_eq!(
        verify(&def).unwrap_err(),
        vec![VerifyError::UnknownAction { at: 0, index: 1 }]
    );
}

#[test]
fn jump_past_end() {
    let def = program("JMP 2\nRST\n", vec![MachineDecl::new(0)]);
    assert_eq!(
        verify(&def).unwrap_err(),
        vec![VerifyError::JumpOutOfRange { at: 0, target: 2 }]
    );
}

#[test]
fn drop_zero_rejected() {
    let def = program("PUSH 1\nDROP 0\nRST\n", vec![MachineDecl::new(0)]);
    assert_eq!(
        verify(&def).unwrap_err(),
        vec![VerifyError::InvalidDrop { at: 1, count: 0 }]
    );
}

// ---- Flow ----

#[test]
fn busy_wait_without_yield_is_only_a_warning() {
    let text = "\
poll:
    ACTION isArrived
    JZ poll
    RST
";
    let def = program(text, vec![MachineDecl::new(0)]);
    assert_eq!(verify(&def), Ok(()));
    assert_eq!(
        busy_loops(&def),
        vec![VerifyError::NonYieldingLoop { machine: 0, at: 0 }]
    );
}

#[test]
fn terminating_loop_without_yield_verifies() {
    let text = "\
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
    let def = program(text, vec![MachineDecl::new(0)]);
    assert_eq!(verify(&def), Ok(()));
    assert_eq!(
        busy_loops(&def),
        vec![VerifyError::NonYieldingLoop { machine: 0, at: 0 }]
    );
}

#[test]
fn missing_rst() {
    let def = program("ACTION true\n", vec![MachineDecl::new(0)]);
    assert_eq!(
        verify(&def).unwrap_err(),
        vec![VerifyError::FallsOffEnd { machine: 0, at: 0 }]
    );
}

// ---- Stack ----

#[test]
fn yield_preserves_depth() {
    let text = "\
    ADJUST 2
loop:
    ARGPUSH_S 1
    ACTION sit
    JMP_I loop
";
    let def = program(text, vec![MachineDecl::new(0)]);
    assert_eq!(verify(&def), Ok(()));
}

#[test]
fn depth_differs_across_turns() {
    let text = "\
loop:
    ADJUST 1
    JMP_I loop
";
    let def = program(text, vec![MachineDecl::new(0)]);
    assert!(matches!(
        &verify(&def).unwrap_err()[..],
        [VerifyError::InconsistentStackDepth { at: 0, expected: 0, found: 1, .. }]
    ));
}

// ---- Unbound actions ----

#[test]
fn unbound_actions_report() {
    let def = program(CONVOY, vec![at_label(CONVOY, "escort")]);
    let known = ["true", "goto", "isArrived", "startTimer"];
    assert_eq!(
        unbound_actions(&def, |name| known.contains(&name)),
        vec!["timeGreater"]
    );
}

// ---- Properties ----

proptest! {
    /// Straight-line pushes and drops verify exactly when no prefix drops
    /// more than has been pushed.
    #[test]
    fn straight_line_balance(ops in prop::collection::vec((any::<bool>(), 1i32..4), 0..24)) {
        let mut text = String::new();
        let mut depth = 0i32;
        let mut underflow = false;
        for (push, n) in &ops {
            if *push {
                text.push_str(&format!("ADJUST {n}\n"));
                depth += n;
            } else {
                text.push_str(&format!("DROP {n}\n"));
                if *n > depth {
                    underflow = true;
                    break;
                }
                depth -= n;
            }
        }
        text.push_str("RST\n");

        let def = program(&text, vec![MachineDecl::new(0)]);
        prop_assert_eq!(verify(&def).is_err(), underflow);
    }
}
