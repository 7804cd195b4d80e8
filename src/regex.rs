//! Types and API for regex matching.
//!
//! This module defines the [`Regex`] struct: a thin, convenient wrapper
//! around parsing ([`crate::parser`]), compilation ([`crate::compiler`])
//! and the memoized backtracking simulator ([`crate::simulate`]).

use crate::config::{CompileConfig, MemoEncoding, MemoMode};
use crate::error::CompileError;
use crate::parser;
use crate::program::Program;
use crate::simulate::{self, SimulationRun};
use crate::stats::StatsReport;
use crate::util::{Captures, Match, Span};

/// A compiled regular expression, ready to be matched against byte
/// subjects.
pub struct Regex {
    program: Program,
}

impl Regex {
    /// Parses and compiles `pattern` with default memoization settings
    /// (memoization disabled).
    pub fn new(pattern: &str) -> Result<Self, CompileError> {
        Self::with_config(pattern, &CompileConfig::default())
    }

    /// Parses and compiles `pattern` under an explicit [`CompileConfig`],
    /// selecting a memo-vertex policy and table encoding.
    pub fn with_config(pattern: &str, config: &CompileConfig) -> Result<Self, CompileError> {
        let ast = parser::parse(pattern)?;
        let program = crate::compiler::compile(&ast, config)?;
        Ok(Self { program })
    }

    /// Returns true iff the regex matches `subject`, without computing
    /// capture group bounds.
    pub fn is_match(&self, subject: &[u8]) -> bool {
        simulate::backtrack(&self.program, subject).matched
    }

    /// Matches the regex against `subject` and returns the bounds of the
    /// overall match (group 0), or `None`.
    pub fn find<'s>(&self, subject: &'s [u8]) -> Option<Match<'s>> {
        let run = simulate::backtrack(&self.program, subject);
        if !run.matched {
            return None;
        }
        let (from, to) = run.captures[0]?;
        Some(Match::new(subject, Span { from, to }))
    }

    /// Matches the regex against `subject` and returns every capture
    /// group's bounds (group 0 is the overall match), or `None` if the
    /// pattern did not match at all.
    pub fn find_captures<'s>(&self, subject: &'s [u8]) -> Option<Captures<'s>> {
        let run = simulate::backtrack(&self.program, subject);
        if !run.matched {
            return None;
        }
        let spans: Box<[Option<Span>]> = run
            .captures
            .iter()
            .map(|c| c.map(|(from, to)| Span { from, to }))
            .collect();
        Some(Captures::new(subject, spans))
    }

    /// Runs a match and returns the full simulation run (visit table,
    /// memo table, timing) alongside the match outcome, for callers that
    /// need the statistics reporter's input.
    pub fn run(&self, subject: &[u8]) -> SimulationRun {
        simulate::backtrack(&self.program, subject)
    }

    /// Runs a match and builds the statistics report (component J) in
    /// one call.
    pub fn run_with_stats(&self, subject: &[u8]) -> (SimulationRun, StatsReport) {
        let run = simulate::backtrack(&self.program, subject);
        let report = crate::stats::build_report(&self.program, &run);
        (run, report)
    }

    /// The underlying compiled program, for callers that want to inspect
    /// the memoization configuration or instruction count directly.
    pub fn program(&self) -> &Program {
        &self.program
    }
}

/// Fluent alternative to hand-assembling a [`CompileConfig`]: set the
/// knobs that matter, leaving the rest at their defaults.
///
/// ```rust
/// use memo_regex::Builder;
/// use memo_regex::config::{MemoEncoding, MemoMode};
///
/// let re = Builder::new("(a*)*b")
///     .memo_mode(MemoMode::LoopDest)
///     .memo_encoding(MemoEncoding::Rle)
///     .build()
///     .unwrap();
/// assert!(re.is_match(b"aaab"));
/// ```
pub struct Builder {
    pattern: String,
    config: CompileConfig,
}

impl Builder {
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            config: CompileConfig::default(),
        }
    }

    pub fn memo_mode(mut self, mode: MemoMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn memo_encoding(mut self, encoding: MemoEncoding) -> Self {
        self.config.encoding = encoding;
        self
    }

    /// Opts into `RLE_TUNED`; without this, `build()` rejects that
    /// encoding with [`CompileError::RleTunedNotAllowed`].
    pub fn allow_rle_tuned(mut self, allow: bool) -> Self {
        self.config.allow_rle_tuned = allow;
        self
    }

    pub fn build(self) -> Result<Regex, CompileError> {
        Regex::with_config(&self.pattern, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MemoEncoding, MemoMode};

    #[test]
    fn is_match_on_plain_literal() {
        let re = Regex::new("abc").unwrap();
        assert!(re.is_match(b"abc"));
        assert!(!re.is_match(b"xyz"));
    }

    #[test]
    fn find_reports_overall_match_span() {
        let re = Regex::new("a+").unwrap();
        let m = re.find(b"aaab").unwrap();
        assert_eq!((m.start(), m.end()), (0, 3));
    }

    #[test]
    fn find_captures_reports_group_spans() {
        let re = Regex::new("a(b)(c)?").unwrap();
        let caps = re.find_captures(b"ab").unwrap();
        assert_eq!((caps.group0().start(), caps.group0().end()), (0, 2));
        assert_eq!((caps.get(1).unwrap().start(), caps.get(1).unwrap().end()), (1, 2));
        assert!(caps.get(2).is_none());
    }

    #[test]
    fn rejects_pattern_with_too_many_groups() {
        let pattern: String = (0..11).map(|_| "(a)").collect();
        assert!(Regex::new(&pattern).is_err());
    }

    #[test]
    fn with_config_wires_memoization_through_to_the_program() {
        let config = CompileConfig {
            mode: MemoMode::LoopDest,
            encoding: MemoEncoding::Negative,
            allow_rle_tuned: false,
        };
        let re = Regex::with_config("(a*)*b", &config).unwrap();
        assert!(re.is_match(b"aaaab"));
        assert_eq!(re.program().memo_mode, MemoMode::LoopDest);
    }

    #[test]
    fn builder_wires_memo_mode_and_encoding() {
        let re = Builder::new("(a*)*b")
            .memo_mode(MemoMode::LoopDest)
            .memo_encoding(MemoEncoding::Rle)
            .build()
            .unwrap();
        assert!(re.is_match(b"aaaab"));
        assert_eq!(re.program().memo_mode, MemoMode::LoopDest);
        assert_eq!(re.program().memo_encoding, MemoEncoding::Rle);
    }

    #[test]
    fn builder_rejects_rle_tuned_without_opt_in() {
        let err = Builder::new("a").memo_encoding(MemoEncoding::RleTuned).build();
        assert!(err.is_err());
    }

    #[test]
    fn builder_allows_rle_tuned_after_opt_in() {
        let re = Builder::new("a")
            .memo_encoding(MemoEncoding::RleTuned)
            .allow_rle_tuned(true)
            .build()
            .unwrap();
        assert_eq!(re.program().memo_encoding, MemoEncoding::RleTuned);
    }
}
