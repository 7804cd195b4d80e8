//! Memo table (component G): a polymorphic container mapping
//! `(memo-vertex, string-index[, capture-state])` to a visited bit.

use std::collections::HashSet;

use crate::config::MemoEncoding;
use crate::program::Program;
use crate::rle::RunLengthBitVector;
use crate::sub::{Sub, SubPool};

/// Key used by the Negative (sparse hash-set) encoding. When the program
/// has back-references, the key is extended with every referenced
/// capture group's `(start, end)` pair so that two visits with identical
/// `(state, index)` but different capture state are not conflated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SimPos {
    memo_state_num: usize,
    string_index: usize,
    cg_key: Vec<(Option<usize>, Option<usize>)>,
}

enum Storage {
    /// The `none` encoding token: a plain dense 2-D boolean grid.
    Dense { visit_vectors: Vec<Vec<bool>> },
    Negative { seen: HashSet<SimPos> },
    Rle { vectors: Vec<RunLengthBitVector> },
}

/// The memo table for one match operation.
pub struct Memo {
    storage: Storage,
    effective_encoding: MemoEncoding,
}

impl Memo {
    /// `n_chars` is `|w| + 1` (every valid string-offset plus the
    /// one-past-end position). If the program uses back-references and
    /// memoization is enabled, the requested encoding is coerced to
    /// `Negative` regardless of what was asked for, since the other two
    /// encodings cannot key on capture state.
    pub fn new(program: &Program, n_chars: usize) -> Self {
        let memo_enabled = program.n_memoized_states > 0;
        let requested = program.memo_encoding;
        let effective_encoding = if memo_enabled && program.has_backrefs {
            MemoEncoding::Negative
        } else {
            requested
        };

        let storage = match effective_encoding {
            MemoEncoding::None => Storage::Dense {
                visit_vectors: vec![vec![false; n_chars]; program.n_memoized_states],
            },
            MemoEncoding::Negative => Storage::Negative { seen: HashSet::new() },
            MemoEncoding::Rle | MemoEncoding::RleTuned => {
                let tuned = effective_encoding == MemoEncoding::RleTuned;
                let vectors = (0..program.n_memoized_states)
                    .map(|s| {
                        let run_length = if tuned {
                            visit_interval_for_state(program, s)
                        } else {
                            1
                        };
                        RunLengthBitVector::new(run_length, true)
                    })
                    .collect();
                Storage::Rle { vectors }
            }
        };

        Self { storage, effective_encoding }
    }

    pub fn effective_encoding(&self) -> MemoEncoding {
        self.effective_encoding
    }

    fn cg_key(program: &Program, subs: &SubPool, sub: Sub) -> Vec<(Option<usize>, Option<usize>)> {
        program
            .memo_idx_to_cg_num
            .iter()
            .map(|&cg| (subs.get(sub, 2 * cg), subs.get(sub, 2 * cg + 1)))
            .collect()
    }

    pub fn is_marked(
        &self,
        program: &Program,
        subs: &SubPool,
        s: usize,
        i: usize,
        sub: Sub,
    ) -> bool {
        match &self.storage {
            Storage::Dense { visit_vectors } => visit_vectors[s][i],
            Storage::Negative { seen } => {
                let key = SimPos {
                    memo_state_num: s,
                    string_index: i,
                    cg_key: if program.has_backrefs {
                        Self::cg_key(program, subs, sub)
                    } else {
                        Vec::new()
                    },
                };
                seen.contains(&key)
            }
            Storage::Rle { vectors } => vectors[s].get(i as u64),
        }
    }

    pub fn mark(&mut self, program: &Program, subs: &SubPool, s: usize, i: usize, sub: Sub) {
        match &mut self.storage {
            Storage::Dense { visit_vectors } => visit_vectors[s][i] = true,
            Storage::Negative { seen } => {
                let key = SimPos {
                    memo_state_num: s,
                    string_index: i,
                    cg_key: if program.has_backrefs {
                        Self::cg_key(program, subs, sub)
                    } else {
                        Vec::new()
                    },
                };
                seen.insert(key);
            }
            Storage::Rle { vectors } => {
                if !vectors[s].get(i as u64) {
                    vectors[s].set(i as u64);
                }
            }
        }
    }

    /// Current/historical-max RLE run counts per memoized state, for the
    /// statistics reporter. Empty for non-RLE encodings.
    pub fn rle_sizes(&self) -> Vec<(usize, usize)> {
        match &self.storage {
            Storage::Rle { vectors } => vectors
                .iter()
                .map(|v| (v.curr_size(), v.max_observed_size()))
                .collect(),
            _ => Vec::new(),
        }
    }
}

fn visit_interval_for_state(program: &Program, memo_state: usize) -> u32 {
    program
        .instructions
        .iter()
        .find(|inst| inst.memo_info.memo_state_num == Some(memo_state))
        .map(|inst| inst.memo_info.visit_interval)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use crate::config::CompileConfig;

    fn trivial_program(mode: crate::config::MemoMode, encoding: MemoEncoding) -> Program {
        let ast = crate::ast::Ast {
            root: crate::ast::AstNode::new(crate::ast::AstKind::Literal(b'a')),
            bol_anchor: false,
            eol_anchor: false,
            group_count: 0,
        };
        compile(&ast, &CompileConfig { mode, encoding, allow_rle_tuned: true }).unwrap()
    }

    #[test]
    fn mark_then_is_marked_is_true() {
        let prog = trivial_program(crate::config::MemoMode::Full, MemoEncoding::Negative);
        let mut memo = Memo::new(&prog, 2);
        let mut subs = SubPool::new();
        let sub = subs.newsub();
        assert!(!memo.is_marked(&prog, &subs, 0, 0, sub));
        memo.mark(&prog, &subs, 0, 0, sub);
        assert!(memo.is_marked(&prog, &subs, 0, 0, sub));
    }

    #[test]
    fn rle_encoding_marks_correctly() {
        let prog = trivial_program(crate::config::MemoMode::Full, MemoEncoding::Rle);
        let mut memo = Memo::new(&prog, 5);
        let mut subs = SubPool::new();
        let sub = subs.newsub();
        memo.mark(&prog, &subs, 0, 3, sub);
        assert!(memo.is_marked(&prog, &subs, 0, 3, sub));
        assert!(!memo.is_marked(&prog, &subs, 0, 4, sub));
    }

    #[test]
    fn backrefs_coerce_to_negative_encoding() {
        let ast = crate::ast::Ast {
            root: crate::ast::AstNode::new(crate::ast::AstKind::Concat(
                Box::new(crate::ast::AstNode::new(crate::ast::AstKind::Paren {
                    index: 1,
                    child: Box::new(crate::ast::AstNode::new(crate::ast::AstKind::Literal(b'a'))),
                })),
                Box::new(crate::ast::AstNode::new(crate::ast::AstKind::Backref(1))),
            )),
            bol_anchor: false,
            eol_anchor: false,
            group_count: 1,
        };
        let prog = compile(
            &ast,
            &CompileConfig { mode: crate::config::MemoMode::Full, encoding: MemoEncoding::Rle, allow_rle_tuned: false },
        )
        .unwrap();
        let memo = Memo::new(&prog, 3);
        assert_eq!(memo.effective_encoding(), MemoEncoding::Negative);
    }
}
