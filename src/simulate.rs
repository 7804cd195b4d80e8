//! The backtracking simulator (component I).
//!
//! A LIFO stack of logical "threads" `(pc, sp, sub)`, exactly as in
//! `backtrack.c`: the current thread runs to completion (match, death, or
//! a non-deterministic choice that pushes a sibling) before the next
//! thread is popped. A single level of nested lookahead simulation is
//! supported by swapping out the thread stack for a fresh one and
//! resuming the same step loop against it; the outer stack is restored
//! once the nested simulation succeeds or is exhausted.

use std::time::{Duration, Instant};

use tracing::{debug, info, trace};

use crate::ast::ZwaKind;
use crate::memo::Memo;
use crate::program::{Op, Pc, Program};
use crate::sub::{Sub, SubPool};
use crate::visit_table::VisitTable;

/// A pending continuation: automaton position, input offset, and the
/// capture state it carries.
#[derive(Debug, Clone, Copy)]
struct Thread {
    pc: Pc,
    sp: usize,
    sub: Sub,
}

/// What a run of the step loop is trying to reach. `RealMatch` is the
/// outermost simulation; `Lookahead` is the nested one spawned by a
/// `RecursiveZeroWidthAssertion`, which only ever terminates by hitting
/// `RecursiveMatch` or exhausting its stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Goal {
    RealMatch,
    Lookahead,
}

/// A byte counts as a word character for `\b`/`\B` purposes iff it is
/// ASCII alphanumeric -- deliberately narrower than the `\w` escape's
/// character class, which also admits `_`.
fn is_word_byte(c: u8) -> bool {
    c.is_ascii_alphanumeric()
}

fn zwa_satisfied(kind: ZwaKind, input: &[u8], sp: usize) -> bool {
    match kind {
        ZwaKind::Caret | ZwaKind::StartOfText => sp == 0,
        ZwaKind::Dollar => sp == input.len(),
        ZwaKind::EndOfText => sp == input.len(),
        ZwaKind::EndOfTextAllowTrailingNewline => {
            sp == input.len() || (sp + 1 == input.len() && input[sp] == b'\n')
        }
        ZwaKind::WordBoundary | ZwaKind::NonWordBoundary => {
            let before = sp > 0 && is_word_byte(input[sp - 1]);
            let after = sp < input.len() && is_word_byte(input[sp]);
            let boundary = before != after;
            if kind == ZwaKind::WordBoundary { boundary } else { !boundary }
        }
    }
}

/// Outcome of one call to [`backtrack`]: whether a match was found, the
/// capture spans if so (group 0 first), and the diagnostic tables the
/// statistics reporter (component J) consumes.
pub struct SimulationRun {
    pub matched: bool,
    pub captures: Vec<Option<(usize, usize)>>,
    pub visit_table: VisitTable,
    pub memo: Memo,
    pub elapsed: Duration,
    /// `|w| + 1`, the width every per-vertex visit/memo vector was sized to.
    pub n_chars: usize,
}

/// Runs the backtracking simulation of `program` against `input`.
///
/// `input` is treated as a byte string; patterns and the surface parser
/// are responsible for keeping multi-byte UTF-8 sequences intact across
/// literal and char-class boundaries.
pub fn backtrack(program: &Program, input: &[u8]) -> SimulationRun {
    let n_chars = input.len() + 1;
    let mut subs = SubPool::new();
    let mut visit_table = VisitTable::new(program.len(), n_chars);
    let mut memo = Memo::new(program, n_chars);

    let start = Instant::now();
    let initial_sub = subs.newsub();
    let stack = vec![Thread { pc: 0, sp: 0, sub: initial_sub }];
    let result = run_stack(program, input, &mut subs, &mut visit_table, &mut memo, stack, Goal::RealMatch);
    let elapsed = start.elapsed();
    info!(matched = result.is_some(), ?elapsed, n_chars, "simulation run finished");

    let n_slots = max_save_slot(program).map(|n| n + 1).unwrap_or(0);
    let group_count = n_slots / 2;

    let (matched, captures) = match result {
        Some((_, sub)) => {
            let captures = (0..group_count)
                .map(|g| match (subs.get(sub, 2 * g), subs.get(sub, 2 * g + 1)) {
                    (Some(a), Some(b)) => Some((a, b)),
                    _ => None,
                })
                .collect();
            subs.decref(sub);
            (true, captures)
        }
        None => (false, vec![None; group_count]),
    };

    SimulationRun { matched, captures, visit_table, memo, elapsed, n_chars }
}

fn max_save_slot(program: &Program) -> Option<usize> {
    program
        .instructions
        .iter()
        .filter_map(|inst| match inst.op {
            Op::Save { n } => Some(n),
            _ => None,
        })
        .max()
}

/// Runs threads off `stack` in LIFO order until one reaches the `goal`
/// terminator or the stack is exhausted. Shares `subs`/`visit`/`memo`
/// with whichever call (outer or nested) invoked it.
fn run_stack(
    program: &Program,
    input: &[u8],
    subs: &mut SubPool,
    visit: &mut VisitTable,
    memo: &mut Memo,
    mut stack: Vec<Thread>,
    goal: Goal,
) -> Option<(usize, Sub)> {
    while let Some(Thread { mut pc, mut sp, mut sub }) = stack.pop() {
        debug_assert!(subs.ref_count(sub) > 0);
        loop {
            let i = sp;
            let inst = program.get(pc);
            trace!(pc, sp = i, ?goal, "step");

            if let Some(s) = inst.memo_info.memo_state_num {
                if memo.is_marked(program, subs, s, i, sub) {
                    // Prior visit to this (state, offset) failed -- if it
                    // had succeeded we would already have returned.
                    debug!(state = s, offset = i, "memo hit, killing thread");
                    subs.decref(sub);
                    break;
                }
                debug!(state = s, offset = i, "memo mark");
                memo.mark(program, subs, s, i, sub);
            }

            visit.record(inst.state_num, i);

            match &inst.op {
                Op::Char(c) => {
                    if sp < input.len() && input[sp] == *c {
                        pc += 1;
                        sp += 1;
                        continue;
                    }
                    subs.decref(sub);
                    break;
                }
                Op::Any => {
                    if sp < input.len() && input[sp] != b'\n' && input[sp] != b'\r' {
                        pc += 1;
                        sp += 1;
                        continue;
                    }
                    subs.decref(sub);
                    break;
                }
                Op::CharClass { ranges, invert } => {
                    if sp >= input.len() {
                        subs.decref(sub);
                        break;
                    }
                    let c = input[sp];
                    let in_class = ranges.iter().any(|r| r.matches(c));
                    if in_class != *invert {
                        pc += 1;
                        sp += 1;
                        continue;
                    }
                    subs.decref(sub);
                    break;
                }
                Op::Match => {
                    if goal != Goal::RealMatch {
                        unreachable!("compiled programs never route a real Match inside a lookahead body");
                    }
                    if !program.eol_anchor || sp == input.len() {
                        return Some((sp, sub));
                    }
                    subs.decref(sub);
                    break;
                }
                Op::Jmp { x } => {
                    pc = *x;
                    continue;
                }
                Op::Split { x, y } => {
                    subs.incref(sub);
                    stack.push(Thread { pc: *y, sp, sub });
                    pc = *x;
                    continue;
                }
                Op::SplitMany { edges } => {
                    debug_assert!(edges.len() >= 2);
                    for &edge in edges[1..].iter().rev() {
                        subs.incref(sub);
                        stack.push(Thread { pc: edge, sp, sub });
                    }
                    pc = edges[0];
                    continue;
                }
                Op::Save { n } => {
                    sub = subs.update(sub, *n, sp);
                    pc += 1;
                    continue;
                }
                Op::StringCompare { cg_num } => {
                    if !subs.is_group_set(sub, *cg_num) {
                        subs.decref(sub);
                        break;
                    }
                    let g_start = subs.get(sub, 2 * cg_num).unwrap();
                    let g_end = subs.get(sub, 2 * cg_num + 1).unwrap();
                    let len = g_end.saturating_sub(g_start);
                    if sp + len > input.len() || input[g_start..g_end] != input[sp..sp + len] {
                        subs.decref(sub);
                        break;
                    }
                    pc += 1;
                    sp += len;
                    continue;
                }
                Op::InlineZeroWidthAssertion { kind } => {
                    if zwa_satisfied(*kind, input, sp) {
                        pc += 1;
                        continue;
                    }
                    subs.decref(sub);
                    break;
                }
                Op::RecursiveZeroWidthAssertion { past } => {
                    subs.incref(sub);
                    let nested_stack = vec![Thread { pc: pc + 1, sp, sub }];
                    match run_stack(program, input, subs, visit, memo, nested_stack, Goal::Lookahead) {
                        Some((_, matched_sub)) => {
                            subs.decref(sub);
                            sub = matched_sub;
                            pc = *past;
                            continue;
                        }
                        None => {
                            subs.decref(sub);
                            break;
                        }
                    }
                }
                Op::RecursiveMatch => {
                    if goal != Goal::Lookahead {
                        unreachable!("RecursiveMatch is only reachable from within a lookahead sub-simulation");
                    }
                    return Some((sp, sub));
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Ast, AstKind, AstNode};
    use crate::compiler::compile;
    use crate::config::{CompileConfig, MemoEncoding, MemoMode};

    fn ast_of(root: AstNode, group_count: usize) -> Ast {
        Ast { root, bol_anchor: false, eol_anchor: false, group_count }
    }

    fn lit(b: u8) -> AstNode {
        AstNode::new(AstKind::Literal(b))
    }

    fn concat(nodes: Vec<AstNode>) -> AstNode {
        nodes
            .into_iter()
            .reduce(|l, r| AstNode::new(AstKind::Concat(Box::new(l), Box::new(r))))
            .unwrap()
    }

    fn literal_ast(s: &str, group_count: usize) -> Ast {
        ast_of(concat(s.bytes().map(lit).collect()), group_count)
    }

    #[test]
    fn literal_matches_whole_match_span() {
        let ast = literal_ast("abc", 0);
        let prog = compile(&ast, &CompileConfig::default()).unwrap();
        let run = backtrack(&prog, b"abc");
        assert!(run.matched);
        assert_eq!(run.captures[0], Some((0, 3)));
    }

    #[test]
    fn literal_fails_on_mismatch() {
        let ast = literal_ast("abc", 0);
        let prog = compile(&ast, &CompileConfig::default()).unwrap();
        let run = backtrack(&prog, b"abd");
        assert!(!run.matched);
    }

    #[test]
    fn alt_list_prefers_leftmost_branch() {
        let root = AstNode::new(AstKind::AltList(vec![lit(b'a'), lit(b'a'), lit(b'b')]));
        let ast = ast_of(root, 0);
        let prog = compile(&ast, &CompileConfig::default()).unwrap();
        let run = backtrack(&prog, b"a");
        assert!(run.matched);
    }

    #[test]
    fn capture_group_records_its_span() {
        // a(b|c)d
        let root = concat(vec![
            lit(b'a'),
            AstNode::new(AstKind::Paren {
                index: 1,
                child: Box::new(AstNode::new(AstKind::AltList(vec![lit(b'b'), lit(b'c')]))),
            }),
            lit(b'd'),
        ]);
        let ast = ast_of(root, 1);
        let prog = compile(&ast, &CompileConfig::default()).unwrap();
        let run = backtrack(&prog, b"abd");
        assert!(run.matched);
        assert_eq!(run.captures[0], Some((0, 3)));
        assert_eq!(run.captures[1], Some((1, 2)));
    }

    #[test]
    fn star_is_greedy_then_backtracks_for_trailing_literal() {
        // a*a
        let root = concat(vec![
            AstNode::new(AstKind::Star { child: Box::new(lit(b'a')), nongreedy: false }),
            lit(b'a'),
        ]);
        let ast = ast_of(root, 0);
        let prog = compile(&ast, &CompileConfig::default()).unwrap();
        let run = backtrack(&prog, b"aaaa");
        assert!(run.matched);
        assert_eq!(run.captures[0], Some((0, 4)));
    }

    #[test]
    fn backref_requires_identical_bytes() {
        // (a+)\1
        let root = concat(vec![
            AstNode::new(AstKind::Paren {
                index: 1,
                child: Box::new(AstNode::new(AstKind::Plus { child: Box::new(lit(b'a')), nongreedy: false })),
            }),
            AstNode::new(AstKind::Backref(1)),
        ]);
        let ast = Ast { root, bol_anchor: false, eol_anchor: true, group_count: 1 };
        let config = CompileConfig { mode: MemoMode::None, encoding: MemoEncoding::None, allow_rle_tuned: false };
        let prog = compile(&ast, &config).unwrap();
        let run = backtrack(&prog, b"aaaa");
        assert!(run.matched);
        assert_eq!(run.captures[0], Some((0, 4)));

        let run2 = backtrack(&prog, b"aab");
        assert!(!run2.matched);
    }

    #[test]
    fn lookahead_is_zero_width_and_does_not_consume() {
        // a(?=b)b
        let root = concat(vec![
            lit(b'a'),
            AstNode::new(AstKind::Lookahead(Box::new(lit(b'b')))),
            lit(b'b'),
        ]);
        let ast = ast_of(root, 0);
        let prog = compile(&ast, &CompileConfig::default()).unwrap();
        let run = backtrack(&prog, b"ab");
        assert!(run.matched);
        assert_eq!(run.captures[0], Some((0, 2)));

        let run2 = backtrack(&prog, b"ac");
        assert!(!run2.matched);
    }

    #[test]
    fn lookahead_captures_are_preserved_on_success() {
        // a(?=(b))b
        let root = concat(vec![
            lit(b'a'),
            AstNode::new(AstKind::Lookahead(Box::new(AstNode::new(AstKind::Paren {
                index: 1,
                child: Box::new(lit(b'b')),
            })))),
            lit(b'b'),
        ]);
        let ast = ast_of(root, 1);
        let prog = compile(&ast, &CompileConfig::default()).unwrap();
        let run = backtrack(&prog, b"ab");
        assert!(run.matched);
        assert_eq!(run.captures[1], Some((1, 2)));
    }

    #[test]
    fn word_boundary_matches_at_transition() {
        let root = concat(vec![
            AstNode::new(AstKind::InlineZwa(ZwaKind::WordBoundary)),
            lit(b'a'),
        ]);
        let ast = ast_of(root, 0);
        let prog = compile(&ast, &CompileConfig::default()).unwrap();
        let run = backtrack(&prog, b"a");
        assert!(run.matched);

        let run2 = backtrack(&prog, b" a");
        // With no anchoring the engine only tries sp == 0 here (single
        // start-position simulation); boundary holds at sp=1 but this
        // simulator does not itself slide the start position.
        assert!(!run2.matched);
    }

    #[test]
    fn memoization_does_not_change_match_outcome() {
        // (a*)*b against a pathological run of a's followed by a mismatch.
        let root = concat(vec![
            AstNode::new(AstKind::Star {
                child: Box::new(AstNode::new(AstKind::Paren {
                    index: 1,
                    child: Box::new(AstNode::new(AstKind::Star { child: Box::new(lit(b'a')), nongreedy: false })),
                })),
                nongreedy: false,
            }),
            lit(b'b'),
        ]);
        let ast = ast_of(root, 1);
        let none_cfg = CompileConfig::default();
        let loop_cfg = CompileConfig { mode: MemoMode::LoopDest, ..CompileConfig::default() };
        let prog_none = compile(&ast, &none_cfg).unwrap();
        let prog_loop = compile(&ast, &loop_cfg).unwrap();

        let input = b"aaaaaaaaaaaaaaaaaac";
        let run_none = backtrack(&prog_none, input);
        let run_loop = backtrack(&prog_loop, input);
        assert_eq!(run_none.matched, run_loop.matched);
    }
}
