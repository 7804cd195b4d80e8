//! The compiler (component F): AST optimization, counting, and emission.
//!
//! Emission uses the standard placeholder-then-patch technique: a `Jmp`
//! or `Split` is pushed with a dummy target, its index is remembered, and
//! once the target's final address is known the instruction is
//! overwritten in place. This keeps the whole program a single `Vec`
//! built in one forward pass with no separate backpatch table.

use std::collections::HashSet;

use tracing::{info, warn};

use crate::ast::{Ast, AstKind, AstNode, ZwaKind, analyze_language_lengths, compute_visit_intervals};
use crate::config::{CompileConfig, MemoEncoding, MemoMode};
use crate::error::CompileError;
use crate::program::{ClassRange, Instruction, Op, Pc, Program};

/// Normalizes the AST before counting/emission: right-associative `Alt`
/// chains become one `AltList` (so scenario tests like `a|b|c|d` see a
/// single `SplitMany` rather than a cascade of binary `Split`s), and
/// nested non-inverted `CustomCharClass` children are spliced into their
/// parent's range list.
pub fn optimize(node: AstNode) -> AstNode {
    match node.kind {
        AstKind::Alt(l, r) => {
            let mut children = Vec::new();
            flatten_alt_chain(*l, *r, &mut children);
            AstNode::new(AstKind::AltList(children))
        }
        AstKind::AltList(children) => {
            AstNode::new(AstKind::AltList(children.into_iter().map(optimize).collect()))
        }
        AstKind::CustomCharClass { inverted, children } => {
            let mut flat = Vec::new();
            flatten_char_class_children(children, &mut flat);
            AstNode::new(AstKind::CustomCharClass {
                inverted,
                children: flat,
            })
        }
        AstKind::Concat(l, r) => AstNode::new(AstKind::Concat(
            Box::new(optimize(*l)),
            Box::new(optimize(*r)),
        )),
        AstKind::Question { child, nongreedy } => AstNode::new(AstKind::Question {
            child: Box::new(optimize(*child)),
            nongreedy,
        }),
        AstKind::Star { child, nongreedy } => AstNode::new(AstKind::Star {
            child: Box::new(optimize(*child)),
            nongreedy,
        }),
        AstKind::Plus { child, nongreedy } => AstNode::new(AstKind::Plus {
            child: Box::new(optimize(*child)),
            nongreedy,
        }),
        AstKind::Curly { child, min, max, nongreedy } => {
            desugar_curly(optimize(*child), min, max, nongreedy)
        }
        AstKind::Paren { index, child } => AstNode::new(AstKind::Paren {
            index,
            child: Box::new(optimize(*child)),
        }),
        AstKind::Lookahead(child) => AstNode::new(AstKind::Lookahead(Box::new(optimize(*child)))),
        leaf => AstNode::new(leaf),
    }
}

fn flatten_alt_chain(l: AstNode, r: AstNode, out: &mut Vec<AstNode>) {
    out.push(optimize(l));
    match r.kind {
        AstKind::Alt(l2, r2) => flatten_alt_chain(*l2, *r2, out),
        _ => out.push(optimize(r)),
    }
}

/// Bounded repetition is not an emitted primitive (the compiler's
/// instruction table has no `Curly` row); it desugars here into `min`
/// mandatory copies followed by `max - min` independent optional copies,
/// or a trailing `Star`/`Plus` when unbounded.
fn desugar_curly(child: AstNode, min: u32, max: Option<u32>, nongreedy: bool) -> AstNode {
    let mut parts: Vec<AstNode> = Vec::new();
    for _ in 0..min {
        parts.push(child.clone());
    }
    match max {
        Some(max) => {
            for _ in min..max {
                parts.push(AstNode::new(AstKind::Question {
                    child: Box::new(child.clone()),
                    nongreedy,
                }));
            }
        }
        None if min == 0 => {
            parts.push(AstNode::new(AstKind::Star {
                child: Box::new(child),
                nongreedy,
            }));
        }
        None => {
            parts.pop();
            parts.push(AstNode::new(AstKind::Plus {
                child: Box::new(child),
                nongreedy,
            }));
        }
    }
    match parts.into_iter().reduce(|l, r| AstNode::new(AstKind::Concat(Box::new(l), Box::new(r)))) {
        Some(node) => node,
        None => AstNode::new(AstKind::Empty),
    }
}

fn flatten_char_class_children(children: Vec<AstNode>, out: &mut Vec<AstNode>) {
    for c in children {
        match c.kind {
            AstKind::CustomCharClass {
                inverted: false,
                children: nested,
            } => flatten_char_class_children(nested, out),
            other => out.push(AstNode::new(other)),
        }
    }
}

/// Instruction count for this node, one preallocation pass ahead of
/// emission. Exercised directly by tests and cross-checked against the
/// emitted program length.
pub fn count_instructions(node: &AstNode) -> usize {
    match &node.kind {
        AstKind::Empty => 0,
        AstKind::Literal(_)
        | AstKind::Dot
        | AstKind::CharEscape(_)
        | AstKind::CharRange(_, _)
        | AstKind::CustomCharClass { .. }
        | AstKind::InlineZwa(_)
        | AstKind::Backref(_) => 1,
        AstKind::Concat(l, r) => count_instructions(l) + count_instructions(r),
        AstKind::Alt(l, r) => 2 + count_instructions(l) + count_instructions(r),
        AstKind::AltList(children) => {
            1 + children.iter().map(|c| count_instructions(c) + 1).sum::<usize>()
        }
        AstKind::Question { child, .. } => 1 + count_instructions(child),
        AstKind::Star { child, .. } => 2 + count_instructions(child),
        AstKind::Plus { child, .. } => 1 + count_instructions(child),
        AstKind::Paren { child, .. } => 2 + count_instructions(child),
        AstKind::Lookahead(child) => 2 + count_instructions(child),
        AstKind::Curly { .. } => unreachable!("optimize() desugars Curly before counting"),
    }
}

/// Translates a `CharEscape` byte into its emitted operation, per the
/// table's `\s,\w,\d` (and inverses) handling, with `\n`/`\t` re-interpreted
/// as literal bytes for anything else recognized.
fn escape_to_op(c: u8) -> Op {
    const DIGIT: [ClassRange; 1] = [ClassRange { low: b'0', high: b'9', invert: false }];
    const WORD: [ClassRange; 4] = [
        ClassRange { low: b'a', high: b'z', invert: false },
        ClassRange { low: b'A', high: b'Z', invert: false },
        ClassRange { low: b'0', high: b'9', invert: false },
        ClassRange { low: b'_', high: b'_', invert: false },
    ];
    const SPACE: [ClassRange; 2] = [
        ClassRange { low: b' ', high: b' ', invert: false },
        ClassRange { low: b'\t', high: b'\r', invert: false },
    ];
    match c {
        b'd' => Op::CharClass { ranges: DIGIT.to_vec(), invert: false },
        b'D' => Op::CharClass { ranges: DIGIT.to_vec(), invert: true },
        b'w' => Op::CharClass { ranges: WORD.to_vec(), invert: false },
        b'W' => Op::CharClass { ranges: WORD.to_vec(), invert: true },
        b's' => Op::CharClass { ranges: SPACE.to_vec(), invert: false },
        b'S' => Op::CharClass { ranges: SPACE.to_vec(), invert: true },
        b'n' => Op::Char(b'\n'),
        b't' => Op::Char(b'\t'),
        b'r' => Op::Char(b'\r'),
        other => Op::Char(other),
    }
}

struct Emitter {
    instructions: Vec<Instruction>,
    mode: MemoMode,
    opened_groups: HashSet<usize>,
    lookahead_depth: u32,
}

impl Emitter {
    fn push(&mut self, op: Op) -> Pc {
        self.instructions.push(Instruction::new(op));
        self.instructions.len() - 1
    }

    fn next_pc(&self) -> Pc {
        self.instructions.len()
    }

    fn emit(&mut self, node: &AstNode) -> Result<Pc, CompileError> {
        let primary = match &node.kind {
            AstKind::Literal(b) => self.push(Op::Char(*b)),
            AstKind::Dot => self.push(Op::Any),
            AstKind::CharEscape(c) => self.push(escape_to_op(*c)),
            AstKind::CharRange(low, high) => self.push(Op::CharClass {
                ranges: vec![ClassRange { low: *low, high: *high, invert: false }],
                invert: false,
            }),
            AstKind::CustomCharClass { inverted, children } => {
                let mut ranges = Vec::new();
                for c in children {
                    match &c.kind {
                        AstKind::CharRange(low, high) => {
                            ranges.push(ClassRange { low: *low, high: *high, invert: false })
                        }
                        AstKind::CharEscape(e) => match escape_to_op(*e) {
                            Op::CharClass { ranges: mut r, invert } => {
                                for rg in r.iter_mut() {
                                    rg.invert ^= invert;
                                }
                                ranges.append(&mut r);
                            }
                            Op::Char(b) => ranges.push(ClassRange { low: b, high: b, invert: false }),
                            _ => return Err(CompileError::CharClassOverflow),
                        },
                        AstKind::Literal(b) => {
                            ranges.push(ClassRange { low: *b, high: *b, invert: false })
                        }
                        _ => return Err(CompileError::CharClassOverflow),
                    }
                }
                self.push(Op::CharClass { ranges, invert: *inverted })
            }
            AstKind::Concat(l, r) => {
                let primary = self.emit(l)?;
                self.emit(r)?;
                primary
            }
            AstKind::Alt(_, _) => return Err(CompileError::UnknownNode),
            AstKind::AltList(children) => {
                if children.len() < 2 {
                    return Err(CompileError::UnknownNode);
                }
                let splitmany_pc = self.push(Op::SplitMany { edges: Vec::new() });
                let mut edges = Vec::with_capacity(children.len());
                let mut jmp_pcs = Vec::with_capacity(children.len());
                for child in children {
                    edges.push(self.next_pc());
                    self.emit(child)?;
                    jmp_pcs.push(self.push(Op::Jmp { x: 0 }));
                }
                let end = self.next_pc();
                self.instructions[splitmany_pc].op = Op::SplitMany { edges };
                for pc in jmp_pcs {
                    self.instructions[pc].op = Op::Jmp { x: end };
                }
                splitmany_pc
            }
            AstKind::Question { child, nongreedy } => {
                let split_pc = self.push(Op::Split { x: 0, y: 0 });
                let body_start = self.next_pc();
                self.emit(child)?;
                let past = self.next_pc();
                self.instructions[split_pc].op = if *nongreedy {
                    Op::Split { x: past, y: body_start }
                } else {
                    Op::Split { x: body_start, y: past }
                };
                split_pc
            }
            AstKind::Star { child, nongreedy } => {
                let split_pc = self.push(Op::Split { x: 0, y: 0 });
                let body_start = self.next_pc();
                self.emit(child)?;
                self.push(Op::Jmp { x: split_pc });
                let past = self.next_pc();
                self.instructions[split_pc].op = if *nongreedy {
                    Op::Split { x: past, y: body_start }
                } else {
                    Op::Split { x: body_start, y: past }
                };
                if self.mode == MemoMode::LoopDest {
                    self.instructions[split_pc].memo_info.should_memo = true;
                }
                split_pc
            }
            AstKind::Plus { child, nongreedy } => {
                let body_start = self.next_pc();
                self.emit(child)?;
                let split_pc = self.push(Op::Split { x: 0, y: 0 });
                let past = self.next_pc();
                self.instructions[split_pc].op = if *nongreedy {
                    Op::Split { x: past, y: body_start }
                } else {
                    Op::Split { x: body_start, y: past }
                };
                if self.mode == MemoMode::LoopDest {
                    self.instructions[body_start].memo_info.should_memo = true;
                }
                body_start
            }
            AstKind::Paren { index, child } => {
                let save_open = self.push(Op::Save { n: 2 * index });
                self.opened_groups.insert(*index);
                self.emit(child)?;
                self.push(Op::Save { n: 2 * index + 1 });
                save_open
            }
            AstKind::Backref(g) => {
                if !self.opened_groups.contains(g) {
                    return Err(CompileError::UnresolvedBackref(*g));
                }
                self.push(Op::StringCompare { cg_num: *g })
            }
            AstKind::Lookahead(child) => {
                if self.lookahead_depth > 0 {
                    return Err(CompileError::LookaheadNestingTooDeep);
                }
                self.lookahead_depth += 1;
                let start = self.push(Op::RecursiveZeroWidthAssertion { past: 0 });
                self.emit(child)?;
                self.push(Op::RecursiveMatch);
                let past = self.next_pc();
                self.instructions[start].op = Op::RecursiveZeroWidthAssertion { past };
                self.lookahead_depth -= 1;
                start
            }
            AstKind::InlineZwa(kind) => self.push(Op::InlineZeroWidthAssertion { kind: *kind }),
            AstKind::Empty => self.next_pc(),
            AstKind::Curly { .. } => unreachable!("optimize() desugars Curly before emission"),
        };
        Ok(primary)
    }
}

/// Lowers `ast` into an executable [`Program`] under `config`.
pub fn compile(ast: &Ast, config: &CompileConfig) -> Result<Program, CompileError> {
    if config.encoding == MemoEncoding::RleTuned {
        if !config.allow_rle_tuned {
            return Err(CompileError::RleTunedNotAllowed);
        }
        warn!("RLE_TUNED encoding opted into; its language-length analyzer is unfinished upstream");
    }

    if ast.group_count > 10 {
        return Err(CompileError::TooManyCaptureGroups);
    }

    let mut root = optimize(ast.root.clone());
    analyze_language_lengths(&mut root);
    info!("language-length analysis done");
    compute_visit_intervals(&mut root);
    info!("visit-interval analysis done");

    // `count_instructions` covers the root node alone; the whole match is
    // additionally wrapped in an implicit group-0 `Save(0) .. Save(1)`
    // pair (group 0 is never an explicit `Paren` node) plus the trailing
    // `Match`.
    let expected_len = count_instructions(&root) + 3;

    let mut emitter = Emitter {
        instructions: Vec::with_capacity(expected_len),
        mode: config.mode,
        opened_groups: HashSet::new(),
        lookahead_depth: 0,
    };

    emitter.push(Op::Save { n: 0 });
    emitter.emit(&root)?;
    emitter.push(Op::Save { n: 1 });
    emitter.push(Op::Match);

    let mut instructions = emitter.instructions;
    for (pc, inst) in instructions.iter_mut().enumerate() {
        inst.state_num = pc;
    }
    debug_assert_eq!(instructions.len(), expected_len);
    info!(n_instructions = instructions.len(), "program emitted");

    let has_backrefs = instructions
        .iter()
        .any(|i| matches!(i.op, Op::StringCompare { .. }));

    let (cg_num_to_memo_idx, memo_idx_to_cg_num) = build_backref_maps(&instructions);

    let mut program = Program {
        instructions,
        memo_mode: config.mode,
        memo_encoding: config.encoding,
        n_memoized_states: 0,
        eol_anchor: ast.eol_anchor,
        has_backrefs,
        cg_num_to_memo_idx,
        memo_idx_to_cg_num,
    };

    crate::memo_select::select(&mut program, config.mode);
    info!(
        mode = ?config.mode,
        n_memoized_states = program.n_memoized_states,
        "memo vertex selection done"
    );
    apply_visit_intervals(&root, &mut program.instructions, &mut 1);
    program.validate()?;
    Ok(program)
}

fn build_backref_maps(instructions: &[Instruction]) -> (Vec<Option<usize>>, Vec<usize>) {
    let max_cg = instructions
        .iter()
        .filter_map(|i| match &i.op {
            Op::StringCompare { cg_num } => Some(*cg_num),
            _ => None,
        })
        .max();
    let Some(max_cg) = max_cg else {
        return (Vec::new(), Vec::new());
    };
    let mut cg_num_to_memo_idx = vec![None; max_cg + 1];
    let mut memo_idx_to_cg_num = Vec::new();
    for inst in instructions {
        if let Op::StringCompare { cg_num } = &inst.op {
            if cg_num_to_memo_idx[*cg_num].is_none() {
                cg_num_to_memo_idx[*cg_num] = Some(memo_idx_to_cg_num.len());
                memo_idx_to_cg_num.push(*cg_num);
            }
        }
    }
    (cg_num_to_memo_idx, memo_idx_to_cg_num)
}

/// Re-walks `node` in the same order `Emitter::emit` used, so each node's
/// `visit_interval` lands on the exact instruction that is its "primary"
/// emitted instruction, without threading that bookkeeping back out of
/// `Emitter` itself.
fn apply_visit_intervals(node: &AstNode, instructions: &mut [Instruction], pc: &mut Pc) {
    let start = *pc;
    match &node.kind {
        AstKind::Empty => {}
        AstKind::Literal(_)
        | AstKind::Dot
        | AstKind::CharEscape(_)
        | AstKind::CharRange(_, _)
        | AstKind::CustomCharClass { .. }
        | AstKind::InlineZwa(_)
        | AstKind::Backref(_) => {
            instructions[start].memo_info.visit_interval = node.visit_interval;
            *pc += 1;
        }
        AstKind::Concat(l, r) => {
            apply_visit_intervals(l, instructions, pc);
            apply_visit_intervals(r, instructions, pc);
        }
        AstKind::AltList(children) => {
            instructions[start].memo_info.visit_interval = node.visit_interval;
            *pc += 1;
            for c in children {
                apply_visit_intervals(c, instructions, pc);
                *pc += 1; // trailing Jmp
            }
        }
        AstKind::Question { child, .. } => {
            instructions[start].memo_info.visit_interval = node.visit_interval;
            *pc += 1;
            apply_visit_intervals(child, instructions, pc);
        }
        AstKind::Star { child, .. } => {
            instructions[start].memo_info.visit_interval = node.visit_interval;
            *pc += 1;
            apply_visit_intervals(child, instructions, pc);
            *pc += 1; // trailing Jmp
        }
        AstKind::Plus { child, .. } => {
            apply_visit_intervals(child, instructions, pc);
            instructions[start].memo_info.visit_interval = node.visit_interval;
            *pc += 1;
        }
        AstKind::Curly { .. } => {
            // Bounded repetition has no single clean "primary"; the
            // instruction-count table already treats it as a desugaring,
            // so its visit_interval is left at the per-instruction default.
            let consumed = count_instructions(node);
            *pc += consumed;
        }
        AstKind::Paren { child, .. } => {
            instructions[start].memo_info.visit_interval = node.visit_interval;
            *pc += 1;
            apply_visit_intervals(child, instructions, pc);
            *pc += 1;
        }
        AstKind::Lookahead(child) => {
            instructions[start].memo_info.visit_interval = node.visit_interval;
            *pc += 1;
            apply_visit_intervals(child, instructions, pc);
            *pc += 1;
        }
        AstKind::Alt(_, _) => unreachable!("optimize() removes Alt before emission"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Ast, AstKind, AstNode};

    fn ast_of(root: AstNode, group_count: usize) -> Ast {
        Ast { root, bol_anchor: false, eol_anchor: false, group_count }
    }

    fn lit(b: u8) -> AstNode {
        AstNode::new(AstKind::Literal(b))
    }

    #[test]
    fn literal_compiles_to_save_char_save_match() {
        let ast = ast_of(lit(b'a'), 0);
        let prog = compile(&ast, &CompileConfig::default()).unwrap();
        assert_eq!(prog.len(), 4);
        assert!(matches!(prog.get(0).op, Op::Save { n: 0 }));
        assert!(matches!(prog.get(1).op, Op::Char(b'a')));
        assert!(matches!(prog.get(2).op, Op::Save { n: 1 }));
        assert!(matches!(prog.get(3).op, Op::Match));
    }

    #[test]
    fn count_matches_emitted_length_for_alt_list() {
        let root = AstNode::new(AstKind::Alt(
            Box::new(lit(b'a')),
            Box::new(AstNode::new(AstKind::Alt(
                Box::new(lit(b'b')),
                Box::new(AstNode::new(AstKind::Alt(
                    Box::new(lit(b'c')),
                    Box::new(lit(b'd')),
                ))),
            ))),
        ));
        let ast = ast_of(root, 0);
        let prog = compile(&ast, &CompileConfig::default()).unwrap();
        let mut root2 = optimize(ast.root.clone());
        analyze_language_lengths(&mut root2);
        assert_eq!(count_instructions(&root2) + 3, prog.len());
        assert!(matches!(prog.get(1).op, Op::SplitMany { .. }));
    }

    #[test]
    fn star_marks_split_under_loop_dest() {
        let root = AstNode::new(AstKind::Star { child: Box::new(lit(b'a')), nongreedy: false });
        let ast = ast_of(root, 0);
        let config = CompileConfig { mode: MemoMode::LoopDest, ..CompileConfig::default() };
        let prog = compile(&ast, &config).unwrap();
        assert!(prog.get(1).memo_info.should_memo);
    }

    #[test]
    fn unresolved_backref_is_an_error() {
        let root = AstNode::new(AstKind::Backref(1));
        let ast = ast_of(root, 0);
        let err = compile(&ast, &CompileConfig::default()).unwrap_err();
        assert_eq!(err, CompileError::UnresolvedBackref(1));
    }

    #[test]
    fn resolved_backref_compiles() {
        let root = AstNode::new(AstKind::Concat(
            Box::new(AstNode::new(AstKind::Paren { index: 1, child: Box::new(lit(b'a')) })),
            Box::new(AstNode::new(AstKind::Backref(1))),
        ));
        let ast = ast_of(root, 1);
        let prog = compile(&ast, &CompileConfig::default()).unwrap();
        assert!(prog.has_backrefs);
    }

    #[test]
    fn rle_tuned_rejected_without_opt_in() {
        let ast = ast_of(lit(b'a'), 0);
        let config = CompileConfig { encoding: MemoEncoding::RleTuned, ..CompileConfig::default() };
        let err = compile(&ast, &config).unwrap_err();
        assert_eq!(err, CompileError::RleTunedNotAllowed);
    }
}
