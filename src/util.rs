/*!
Small shared types used by the public [`crate::Regex`] API: spans, matches
and captures. The engine is byte-oriented throughout (see the crate's
Non-goals around Unicode code-point handling), so these operate on `&[u8]`
rather than `&str`.
*/

use std::ops::Range;

/// A span of bytes in a subject. Similar to [`std::ops::Range<usize>`], but
/// implements `Copy`.
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub from: usize,
    pub to: usize,
}

impl Span {
    pub fn empty(&self) -> bool {
        self.from == self.to
    }

    pub fn len(&self) -> usize {
        self.to - self.from
    }

    pub fn is_empty(&self) -> bool {
        self.empty()
    }
}

impl From<Range<usize>> for Span {
    fn from(value: Range<usize>) -> Self {
        Self { from: value.start, to: value.end }
    }
}

impl From<Span> for Range<usize> {
    fn from(val: Span) -> Self {
        val.from..val.to
    }
}

impl From<(usize, usize)> for Span {
    fn from((from, to): (usize, usize)) -> Self {
        Self { from, to }
    }
}

/// A successful, non-capturing match: the bounds of the overall match
/// (capture group 0) within the subject.
#[derive(Copy, Debug, Clone)]
pub struct Match<'s> {
    subject: &'s [u8],
    span: Span,
}

impl<'s> Match<'s> {
    pub fn new(subject: &'s [u8], span: impl Into<Span>) -> Self {
        Self { subject, span: span.into() }
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn start(&self) -> usize {
        self.span.from
    }

    pub fn end(&self) -> usize {
        self.span.to
    }

    pub fn as_bytes(&self) -> &'s [u8] {
        &self.subject[self.span.from..self.span.to]
    }
}

/// A successful, capturing match. Holds the bounds (if set) of every
/// capture group named in the pattern, including the implicit group 0
/// (the overall match).
#[derive(Debug, Clone)]
pub struct Captures<'s> {
    subject: &'s [u8],
    spans: Box<[Option<Span>]>,
}

impl<'s> Captures<'s> {
    pub fn new(subject: &'s [u8], spans: Box<[Option<Span>]>) -> Self {
        Self { subject, spans }
    }

    pub fn get(&self, group_index: usize) -> Option<Match<'s>> {
        let span = (*self.spans.get(group_index)?)?;
        Some(Match { subject: self.subject, span })
    }

    pub fn group0(&self) -> Match<'s> {
        // Always set on a successful match.
        self.get(0).unwrap()
    }

    pub fn group_len(&self) -> usize {
        self.spans.len()
    }
}
