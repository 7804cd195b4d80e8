//! # memo-regex
//!
//! **memo-regex** is a prototype regex matching engine built around
//! *selective memoization* of backtracking simulation: rather than
//! exploring every backtrack path naively, the simulator recognizes when
//! it is about to revisit an `(automaton-vertex, string-index)`
//! configuration already explored on a dead-ended path and prunes that
//! thread, avoiding the super-linear blowup catastrophic patterns cause
//! in plain backtracking engines.
//!
//! ## Usage
//!
//! ```rust
//! use memo_regex::Regex;
//!
//! let re = Regex::new(r"a(b)c").unwrap();
//! assert!(re.is_match(b"abc"));
//! let caps = re.find_captures(b"abc").unwrap();
//! assert_eq!(caps.get(1).unwrap().as_bytes(), b"b");
//! ```
//!
//! Memoization is opt-in, selected via [`config::CompileConfig`] and
//! [`Regex::with_config`], or fluently via [`Builder`]: a vertex-selection
//! policy (which instructions are worth memoizing) paired with a
//! memo-table encoding (how the per-vertex visited-set is stored).
//!
//! ## Crate organization
//!
//! - [`parser`] / [`ast`]: surface syntax into the regex AST, plus the
//!   language-length static analysis that feeds memo-vertex selection.
//! - [`compiler`] / [`program`]: AST lowering into a stack-machine
//!   program annotated with memoization metadata.
//! - [`memo_select`]: the four memo-vertex selection policies.
//! - [`simulate`]: the memoized backtracking simulator.
//! - [`memo`] / [`rle`]: the three memo-table storage encodings.
//! - [`sub`]: the capture-record arena threads share during simulation.
//! - [`stats`]: the statistics reporter.
//! - [`baseline`]: an independent Pike VM used only to cross-check match
//!   outcomes in tests and the CLI.
//!
//! ## License
//!
//! Licensed under MIT or Apache-2.0.

pub mod ast;
pub mod baseline;
pub mod compiler;
pub mod config;
pub mod error;
pub mod memo;
pub mod memo_select;
pub mod parser;
pub mod program;
pub mod regex;
pub mod rle;
pub mod simulate;
pub mod stats;
pub mod sub;
pub mod util;
pub mod visit_table;

pub use config::{CompileConfig, MemoEncoding, MemoMode};
pub use error::CompileError;
pub use regex::{Builder, Regex};
