//! Control-flow checks for mission programs.
//!
//! Walks the slots reachable from every declaration start. A reachable
//! slot may not fall through past the end of the program.
//!
//! Cycles that never pass through a yielding `JMP_I` are legal (the loop
//! may end once an action returns a different result), so they are only
//! reported by [`check_busy_loops`] for hosts to show as warnings.

use crate::error::VerifyError;
use crate::structural::ProgramContext;

/// Run the control-flow check. Assumes a non-fatal context.
pub fn check_flow(ctx: &ProgramContext) -> Vec<VerifyError> {
    let mut errors = Vec::new();
    let len = ctx.ops.len();

    for (machine, &start) in ctx.starts.iter().enumerate() {
        let reachable = reachable_from(ctx, start);

        for pc in (0..len).filter(|&pc| reachable[pc]) {
            if ctx.successors(pc).0 == Some(len) {
                errors.push(VerifyError::FallsOffEnd { machine, at: pc });
            }
        }
    }

    errors
}

/// Loops each machine can run without yielding. Assumes a non-fatal context.
pub fn check_busy_loops(ctx: &ProgramContext) -> Vec<VerifyError> {
    let mut found = Vec::new();
    for (machine, &start) in ctx.starts.iter().enumerate() {
        let reachable = reachable_from(ctx, start);
        for at in non_yielding_loops(ctx, &reachable) {
            found.push(VerifyError::NonYieldingLoop { machine, at });
        }
    }
    found
}

/// Slots reachable from `start`, across any number of turns.
pub fn reachable_from(ctx: &ProgramContext, start: usize) -> Vec<bool> {
    let len = ctx.ops.len();
    let mut reachable = vec![false; len];
    if start >= len {
        return reachable;
    }

    let mut work = vec![start];
    reachable[start] = true;
    while let Some(pc) = work.pop() {
        let (fall, jump) = ctx.successors(pc);
        for next in [fall, jump].into_iter().flatten() {
            if next < len && !reachable[next] {
                reachable[next] = true;
                work.push(next);
            }
        }
    }
    reachable
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnPath,
    Done,
}

/// Successors within a single turn: `JMP_I` and `RST` end the turn.
fn same_turn_successors(ctx: &ProgramContext, pc: usize) -> [Option<usize>; 2] {
    if ctx.ops[pc].0.is_yield() {
        return [None, None];
    }
    let (fall, jump) = ctx.successors(pc);
    [fall, jump]
}

/// Loop heads of cycles among reachable slots that never yield.
fn non_yielding_loops(ctx: &ProgramContext, reachable: &[bool]) -> Vec<usize> {
    let len = ctx.ops.len();
    let mut marks = vec![Mark::Unvisited; len];
    let mut heads = Vec::new();

    for root in (0..len).filter(|&pc| reachable[pc]) {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        marks[root] = Mark::OnPath;
        let mut path: Vec<(usize, usize)> = vec![(root, 0)];

        while let Some(top) = path.last_mut() {
            let (pc, edge) = *top;
            if edge == 2 {
                marks[pc] = Mark::Done;
                path.pop();
                continue;
            }
            top.1 += 1;

            let Some(next) = same_turn_successors(ctx, pc)[edge].filter(|&n| n < len) else {
                continue;
            };
            match marks[next] {
                Mark::Unvisited => {
                    marks[next] = Mark::OnPath;
                    path.push((next, 0));
                }
                Mark::OnPath => {
                    if !heads.contains(&next) {
                        heads.push(next);
                    }
                }
                Mark::Done => {}
            }
        }
    }

    heads.sort_unstable();
    heads
}
