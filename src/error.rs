//! Error types for pattern compilation.
//!
//! Match failure is not an error (see [`crate::simulate::backtrack`]); this
//! module only covers the "program-construction" class of failures from
//! the error taxonomy: a pattern that cannot be turned into a runnable
//! [`crate::program::Program`] at all.

use std::fmt;

/// Failure to compile a pattern into a [`crate::program::Program`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// The surface parser collaborator rejected the pattern text.
    Parse(String),
    /// An AST node carried a shape the compiler does not recognize.
    UnknownNode,
    /// More than 10 capture groups were requested (`MAXSUB = 20`).
    TooManyCaptureGroups,
    /// A custom character class accumulated more ranges than fit.
    CharClassOverflow,
    /// A backreference named a group that is never opened in the pattern.
    UnresolvedBackref(usize),
    /// A second lookahead was nested inside an already-active one.
    LookaheadNestingTooDeep,
    /// `RLE_TUNED` was requested without opting in via `CompileConfig`.
    RleTunedNotAllowed,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Parse(msg) => write!(f, "pattern parse error: {msg}"),
            CompileError::UnknownNode => write!(f, "AST contained an unrecognized node"),
            CompileError::TooManyCaptureGroups => {
                write!(f, "pattern has more than 10 capture groups")
            }
            CompileError::CharClassOverflow => {
                write!(f, "character class has too many ranges")
            }
            CompileError::UnresolvedBackref(g) => {
                write!(f, "backreference to unopened group {g}")
            }
            CompileError::LookaheadNestingTooDeep => {
                write!(f, "lookahead nested inside another lookahead")
            }
            CompileError::RleTunedNotAllowed => write!(
                f,
                "RLE_TUNED encoding requires CompileConfig::allow_rle_tuned"
            ),
        }
    }
}

impl std::error::Error for CompileError {}
