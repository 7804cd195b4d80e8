//! Memo-vertex selector (component E).
//!
//! Runs once, after the whole program has been emitted (so every
//! cross-reference is a final index), and decides `should_memo` per
//! instruction for the given [`MemoMode`], then assigns dense
//! `memo_state_num`s in `state_num` order.

use crate::config::MemoMode;
use crate::program::{Op, Program};

/// Computes in-degree for every instruction: the number of successor
/// links (across all opcodes) that target it, plus the implicit in-edge
/// of 1 that `q0` (the program's entry instruction) always carries.
fn compute_in_degrees(program: &Program) -> Vec<u32> {
    let len = program.len();
    let mut in_degree = vec![0u32; len];
    if len > 0 {
        in_degree[0] += 1;
    }
    for inst in &program.instructions {
        match &inst.op {
            Op::Jmp { x } => in_degree[*x] += 1,
            Op::Split { x, y } => {
                in_degree[*x] += 1;
                in_degree[*y] += 1;
            }
            Op::SplitMany { edges } => {
                for e in edges {
                    in_degree[*e] += 1;
                }
            }
            _ => {}
        }
    }
    in_degree
}

/// Every instruction that is the target of a `Jmp` whose origin has a
/// strictly larger `state_num` than its target: a back-edge. Note that a
/// `Plus` loop closes via `Split.x` rather than a `Jmp`, so this scan is
/// deliberately unioned with (not a replacement for) the emission-time
/// `should_memo` marks the compiler places directly on `Star`/`Plus` loop
/// instructions.
fn jmp_back_edge_targets(program: &Program) -> Vec<bool> {
    let len = program.len();
    let mut targets = vec![false; len];
    for inst in &program.instructions {
        if let Op::Jmp { x } = &inst.op {
            if *x < inst.state_num {
                targets[*x] = true;
            }
        }
    }
    targets
}

/// Selects `should_memo` per instruction and assigns dense
/// `memo_state_num`s. Must run after every cross-reference in `program`
/// has its final value.
pub fn select(program: &mut Program, mode: MemoMode) {
    let in_degrees = compute_in_degrees(program);
    for (pc, inst) in program.instructions.iter_mut().enumerate() {
        inst.memo_info.in_degree = in_degrees[pc];
    }

    match mode {
        MemoMode::None => {
            for inst in &mut program.instructions {
                inst.memo_info.should_memo = false;
            }
        }
        MemoMode::Full => {
            for inst in &mut program.instructions {
                inst.memo_info.should_memo = true;
            }
        }
        MemoMode::InDegreeGt1 => {
            for inst in &mut program.instructions {
                inst.memo_info.should_memo = inst.memo_info.in_degree > 1;
            }
        }
        MemoMode::LoopDest => {
            let back_edge_targets = jmp_back_edge_targets(program);
            for (pc, inst) in program.instructions.iter_mut().enumerate() {
                if back_edge_targets[pc] {
                    inst.memo_info.should_memo = true;
                }
                inst.memo_info.is_ancestor_loop_destination = inst.memo_info.should_memo;
            }
        }
    }

    let mut next_memo_state = 0usize;
    for inst in &mut program.instructions {
        if inst.memo_info.should_memo {
            inst.memo_info.memo_state_num = Some(next_memo_state);
            next_memo_state += 1;
        } else {
            inst.memo_info.memo_state_num = None;
        }
    }
    program.n_memoized_states = next_memo_state;
}
