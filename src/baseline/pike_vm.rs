//! A small Thompson-construction Pike VM over [`regex_syntax::hir::Hir`],
//! adapted from the bytecode compiler and interpreter this crate's other
//! engines were built from. Deliberately narrower than the memoized
//! simulator: no backreferences, no lookaround, operates over `char`s
//! rather than bytes. Its only job is to give the statistics/testing
//! tooling a second opinion on plain patterns.

use std::collections::{HashSet, VecDeque};
use std::error::Error;
use std::fmt;

use regex_syntax::Parser;
use regex_syntax::hir::{Capture, Class, Hir, HirKind, Literal, Repetition};

#[derive(Debug, Clone)]
enum Instruction {
    Consume(char),
    ConsumeAny,
    ConsumeClass(Box<[(char, char)]>),
    Fork2(usize, usize),
    ForkN(Box<[usize]>),
    Jmp(usize),
    WriteReg(u32),
    Accept,
}

use Instruction::*;

#[derive(Debug)]
pub enum BaselineError {
    ContainsLookAround,
    ContainsBackref,
    Parse(regex_syntax::Error),
}

impl fmt::Display for BaselineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaselineError::ContainsLookAround => write!(f, "baseline engine does not support lookaround"),
            BaselineError::ContainsBackref => write!(f, "baseline engine does not support backreferences"),
            BaselineError::Parse(e) => write!(f, "{e}"),
        }
    }
}

impl Error for BaselineError {}

impl From<regex_syntax::Error> for BaselineError {
    fn from(e: regex_syntax::Error) -> Self {
        BaselineError::Parse(e)
    }
}

/// Compiles a plain (no backref, no lookaround -- `regex_syntax` cannot
/// represent either) pattern into [`Instruction`]s.
#[derive(Default)]
struct Compiler {
    instructions: Vec<Instruction>,
}

impl Compiler {
    fn current_pc(&self) -> usize {
        self.instructions.len()
    }

    fn push(&mut self, inst: Instruction) -> usize {
        self.instructions.push(inst);
        self.instructions.len() - 1
    }

    fn compile(hir: Hir) -> Result<Vec<Instruction>, BaselineError> {
        let mut compiler = Compiler::default();
        compiler.push(WriteReg(0));
        compiler.compile_node(hir)?;
        compiler.push(WriteReg(1));
        compiler.push(Accept);
        Ok(compiler.instructions)
    }

    fn compile_node(&mut self, hir: Hir) -> Result<(), BaselineError> {
        match hir.into_kind() {
            HirKind::Empty => {}
            HirKind::Literal(Literal(bytes)) => {
                let s = std::str::from_utf8(&bytes).map_err(|_| BaselineError::ContainsBackref)?;
                for c in s.chars() {
                    self.push(Consume(c));
                }
            }
            HirKind::Class(class) => {
                let ranges: Box<[(char, char)]> = match class {
                    Class::Unicode(u) => u.iter().map(|r| (r.start(), r.end())).collect(),
                    Class::Bytes(b) => b
                        .iter()
                        .map(|r| (r.start() as char, r.end() as char))
                        .collect(),
                };
                self.push(ConsumeClass(ranges));
            }
            HirKind::Look(_) => return Err(BaselineError::ContainsLookAround),
            HirKind::Repetition(Repetition { min, max, greedy, sub }) => {
                let mut last_iter_start = None;
                for i in 0..min {
                    if i + 1 == min {
                        last_iter_start = Some(self.current_pc());
                    }
                    self.compile_node((*sub).clone())?;
                }
                match max {
                    Some(max) => {
                        let mut fork_pcs = Vec::new();
                        for _ in min..max {
                            fork_pcs.push(self.push(Fork2(0, 0)));
                            self.compile_node((*sub).clone())?;
                        }
                        let end = self.current_pc();
                        for fork_pc in fork_pcs {
                            self.instructions[fork_pc] = fork2(fork_pc + 1, end, greedy);
                        }
                    }
                    None => match last_iter_start {
                        Some(start) => {
                            self.push(fork2(start, self.current_pc() + 1, greedy));
                        }
                        None => {
                            let fork_pc = self.push(Fork2(0, 0));
                            self.compile_node(*sub)?;
                            self.push(Jmp(fork_pc));
                            let end = self.current_pc();
                            self.instructions[fork_pc] = fork2(fork_pc + 1, end, greedy);
                        }
                    },
                }
            }
            HirKind::Capture(Capture { sub, .. }) => {
                self.compile_node(*sub)?;
            }
            HirKind::Concat(hirs) => {
                for h in hirs {
                    self.compile_node(h)?;
                }
            }
            HirKind::Alternation(hirs) => {
                let n = hirs.len();
                let fork_pc = self.push(ForkN(Box::new([])));
                let mut targets = Vec::with_capacity(n);
                let mut jmps = Vec::with_capacity(n.saturating_sub(1));
                for (i, h) in hirs.into_iter().enumerate() {
                    targets.push(self.current_pc());
                    self.compile_node(h)?;
                    if i + 1 < n {
                        jmps.push(self.push(Jmp(0)));
                    }
                }
                let end = self.current_pc();
                self.instructions[fork_pc] = ForkN(targets.into_boxed_slice());
                for pc in jmps {
                    self.instructions[pc] = Jmp(end);
                }
            }
        }
        Ok(())
    }
}

fn fork2(a: usize, b: usize, greedy: bool) -> Instruction {
    if greedy { Fork2(a, b) } else { Fork2(b, a) }
}

struct Thread {
    pc: usize,
    regs: [Option<usize>; 2],
}

impl Clone for Thread {
    fn clone(&self) -> Self {
        Thread { pc: self.pc, regs: self.regs }
    }
}

struct Vm {
    active: VecDeque<Thread>,
    next: VecDeque<Thread>,
    visited: HashSet<usize>,
    best: Option<Thread>,
}

/// A compiled plain-pattern matcher, standing in for an independent
/// implementation to sanity-check the memoized engine's overall-match
/// verdict against.
pub struct PikeVm {
    bytecode: Vec<Instruction>,
}

impl PikeVm {
    pub fn new(pattern: &str) -> Result<Self, BaselineError> {
        let hir = Parser::new().parse(pattern)?;
        let bytecode = Compiler::compile(hir)?;
        Ok(Self { bytecode })
    }

    /// Returns the overall match span, if any, searching only from the
    /// start of `input` (no auto-scan across start positions).
    pub fn find(&self, input: &str) -> Option<(usize, usize)> {
        let mut vm = Vm {
            active: VecDeque::new(),
            next: VecDeque::new(),
            visited: HashSet::new(),
            best: None,
        };
        vm.active.push_back(Thread { pc: 0, regs: [None; 2] });

        let mut pos = 0usize;
        for c in input.chars() {
            self.step(&mut vm, Some(c), pos);
            if vm.best.is_some() && vm.next.is_empty() {
                break;
            }
            pos += c.len_utf8();
            vm.visited.clear();
            std::mem::swap(&mut vm.active, &mut vm.next);
        }
        if vm.best.is_none() {
            self.step(&mut vm, None, pos);
        }

        vm.best.and_then(|t| match t.regs {
            [Some(a), Some(b)] => Some((a, b)),
            _ => None,
        })
    }

    pub fn is_match(&self, input: &str) -> bool {
        self.find(input).is_some()
    }

    fn step(&self, vm: &mut Vm, c: Option<char>, pos: usize) {
        while let Some(mut th) = vm.active.pop_front() {
            if !vm.visited.insert(th.pc) {
                continue;
            }
            match &self.bytecode[th.pc] {
                Consume(expected) => {
                    if c == Some(*expected) {
                        vm.next.push_back(Thread { pc: th.pc + 1, regs: th.regs });
                    }
                }
                ConsumeAny => {
                    if c.is_some() {
                        vm.next.push_back(Thread { pc: th.pc + 1, regs: th.regs });
                    }
                }
                ConsumeClass(ranges) => {
                    if let Some(c) = c {
                        if ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi) {
                            vm.next.push_back(Thread { pc: th.pc + 1, regs: th.regs });
                        }
                    }
                }
                Fork2(a, b) => {
                    vm.active.push_front(Thread { pc: *b, regs: th.regs });
                    vm.active.push_front(Thread { pc: *a, regs: th.regs });
                }
                ForkN(targets) => {
                    for &t in targets.iter().rev() {
                        vm.active.push_front(Thread { pc: t, regs: th.regs });
                    }
                }
                Jmp(target) => {
                    vm.active.push_front(Thread { pc: *target, regs: th.regs });
                }
                WriteReg(r) => {
                    th.regs[*r as usize] = Some(pos);
                    vm.active.push_front(th);
                }
                Accept => {
                    vm.best = Some(th);
                    vm.active.clear();
                }
            }
        }
    }
}
