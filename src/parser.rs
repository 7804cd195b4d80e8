//! The surface parser (AST-producing collaborator): turns pattern text
//! into an [`Ast`]. Hand-rolled rather than built on `regex_syntax`,
//! since `regex_syntax::hir::Hir` has no representation for
//! backreferences or lookahead.
//!
//! Grammar (highest to lowest precedence): atom, repetition (`* + ? {m,n}`,
//! each with an optional trailing `?` for non-greedy), concatenation,
//! alternation (`|`).

use crate::ast::{AstKind, AstNode, ZwaKind};
use crate::error::CompileError;

pub fn parse(pattern: &str) -> Result<crate::ast::Ast, CompileError> {
    let bytes = pattern.as_bytes();
    let mut p = Parser {
        bytes,
        pos: 0,
        next_group: 1,
        group_count: 0,
    };
    let root = p.parse_alt()?;
    if p.pos != bytes.len() {
        return Err(CompileError::Parse(format!(
            "unexpected character {:?} at offset {}",
            bytes[p.pos] as char,
            p.pos
        )));
    }
    let (bol_anchor, eol_anchor) = detect_anchors(&root);
    Ok(crate::ast::Ast {
        root,
        bol_anchor,
        eol_anchor,
        group_count: p.group_count,
    })
}

/// Whether the outermost node is an unconditional `^`/`$` anchor: a
/// best-effort flag used only to annotate the AST root, since the actual
/// anchoring behavior lives in the `InlineZwa`/`eol_anchor` opcodes
/// themselves. Only the simplest "anchor is the very first/last atom of
/// a top-level concatenation" shape is recognized.
fn detect_anchors(node: &AstNode) -> (bool, bool) {
    fn leftmost(node: &AstNode) -> &AstNode {
        match &node.kind {
            AstKind::Concat(l, _) => leftmost(l),
            _ => node,
        }
    }
    fn rightmost(node: &AstNode) -> &AstNode {
        match &node.kind {
            AstKind::Concat(_, r) => rightmost(r),
            _ => node,
        }
    }
    let bol = matches!(
        leftmost(node).kind,
        AstKind::InlineZwa(ZwaKind::Caret) | AstKind::InlineZwa(ZwaKind::StartOfText)
    );
    let eol = matches!(
        rightmost(node).kind,
        AstKind::InlineZwa(ZwaKind::Dollar)
            | AstKind::InlineZwa(ZwaKind::EndOfText)
            | AstKind::InlineZwa(ZwaKind::EndOfTextAllowTrailingNewline)
    );
    (bol, eol)
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
    next_group: usize,
    group_count: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, c: u8) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_alt(&mut self) -> Result<AstNode, CompileError> {
        let mut node = self.parse_concat()?;
        while self.eat(b'|') {
            let rhs = self.parse_concat()?;
            node = AstNode::new(AstKind::Alt(Box::new(node), Box::new(rhs)));
        }
        Ok(node)
    }

    fn parse_concat(&mut self) -> Result<AstNode, CompileError> {
        let mut parts = Vec::new();
        while let Some(c) = self.peek() {
            if c == b'|' || c == b')' {
                break;
            }
            parts.push(self.parse_repetition()?);
        }
        let mut iter = parts.into_iter().rev();
        let mut node = match iter.next() {
            Some(n) => n,
            None => AstNode::new(AstKind::Empty),
        };
        for part in iter {
            node = AstNode::new(AstKind::Concat(Box::new(part), Box::new(node)));
        }
        Ok(node)
    }

    fn parse_repetition(&mut self) -> Result<AstNode, CompileError> {
        let mut node = self.parse_atom()?;
        loop {
            match self.peek() {
                Some(b'*') => {
                    self.pos += 1;
                    let nongreedy = self.eat(b'?');
                    node = AstNode::new(AstKind::Star { child: Box::new(node), nongreedy });
                }
                Some(b'+') => {
                    self.pos += 1;
                    let nongreedy = self.eat(b'?');
                    node = AstNode::new(AstKind::Plus { child: Box::new(node), nongreedy });
                }
                Some(b'?') => {
                    self.pos += 1;
                    let nongreedy = self.eat(b'?');
                    node = AstNode::new(AstKind::Question { child: Box::new(node), nongreedy });
                }
                Some(b'{') => {
                    let checkpoint = self.pos;
                    match self.try_parse_curly() {
                        Some((min, max)) => {
                            let nongreedy = self.eat(b'?');
                            node = AstNode::new(AstKind::Curly {
                                child: Box::new(node),
                                min,
                                max,
                                nongreedy,
                            });
                        }
                        None => {
                            // Not a valid `{m,n}`: treat `{` as a literal,
                            // as most regex flavors do.
                            self.pos = checkpoint;
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
        Ok(node)
    }

    /// Parses `{m}`, `{m,}` or `{m,n}` starting at `{`. Returns `None`
    /// (without consuming input) if what follows isn't one of those
    /// shapes.
    fn try_parse_curly(&mut self) -> Option<(u32, Option<u32>)> {
        let start = self.pos;
        self.pos += 1; // '{'
        let min_start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == min_start {
            self.pos = start;
            return None;
        }
        let min: u32 = std::str::from_utf8(&self.bytes[min_start..self.pos])
            .unwrap()
            .parse()
            .ok()?;
        let max = if self.eat(b',') {
            let max_start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
            if self.pos == max_start {
                None
            } else {
                Some(
                    std::str::from_utf8(&self.bytes[max_start..self.pos])
                        .unwrap()
                        .parse()
                        .ok()?,
                )
            }
        } else {
            Some(min)
        };
        if !self.eat(b'}') {
            self.pos = start;
            return None;
        }
        Some((min, max))
    }

    fn parse_atom(&mut self) -> Result<AstNode, CompileError> {
        match self.peek() {
            Some(b'(') => self.parse_group(),
            Some(b'[') => self.parse_class(),
            Some(b'.') => {
                self.pos += 1;
                Ok(AstNode::new(AstKind::Dot))
            }
            Some(b'^') => {
                self.pos += 1;
                Ok(AstNode::new(AstKind::InlineZwa(ZwaKind::Caret)))
            }
            Some(b'$') => {
                self.pos += 1;
                Ok(AstNode::new(AstKind::InlineZwa(ZwaKind::Dollar)))
            }
            Some(b'\\') => self.parse_escape(),
            Some(c) => {
                self.pos += 1;
                Ok(AstNode::new(AstKind::Literal(c)))
            }
            None => Err(CompileError::Parse("unexpected end of pattern".into())),
        }
    }

    fn parse_group(&mut self) -> Result<AstNode, CompileError> {
        self.pos += 1; // '('
        if self.peek() == Some(b'?') {
            let save = self.pos;
            self.pos += 1;
            match self.peek() {
                Some(b':') => {
                    self.pos += 1;
                    let child = self.parse_alt()?;
                    self.expect_close_paren()?;
                    return Ok(child);
                }
                Some(b'=') => {
                    self.pos += 1;
                    let child = self.parse_alt()?;
                    self.expect_close_paren()?;
                    return Ok(AstNode::new(AstKind::Lookahead(Box::new(child))));
                }
                _ => {
                    self.pos = save;
                    return Err(CompileError::Parse(format!(
                        "unsupported group syntax at offset {}",
                        save - 1
                    )));
                }
            }
        }
        let index = self.next_group;
        self.next_group += 1;
        self.group_count = self.group_count.max(index);
        let child = self.parse_alt()?;
        self.expect_close_paren()?;
        Ok(AstNode::new(AstKind::Paren { index, child: Box::new(child) }))
    }

    fn expect_close_paren(&mut self) -> Result<(), CompileError> {
        if self.eat(b')') {
            Ok(())
        } else {
            Err(CompileError::Parse(format!(
                "expected ')' at offset {}",
                self.pos
            )))
        }
    }

    fn parse_escape(&mut self) -> Result<AstNode, CompileError> {
        self.pos += 1; // '\\'
        let c = self
            .bump()
            .ok_or_else(|| CompileError::Parse("dangling backslash".into()))?;
        let node = match c {
            b'd' => class_shorthand(b'0', b'9', false),
            b'D' => class_shorthand(b'0', b'9', true),
            b'w' => word_class(false),
            b'W' => word_class(true),
            b's' => space_class(false),
            b'S' => space_class(true),
            b'n' => AstNode::new(AstKind::CharEscape(b'\n')),
            b't' => AstNode::new(AstKind::CharEscape(b'\t')),
            b'r' => AstNode::new(AstKind::CharEscape(b'\r')),
            b'0' => AstNode::new(AstKind::CharEscape(0)),
            b'A' => AstNode::new(AstKind::InlineZwa(ZwaKind::StartOfText)),
            b'Z' => AstNode::new(AstKind::InlineZwa(ZwaKind::EndOfTextAllowTrailingNewline)),
            b'z' => AstNode::new(AstKind::InlineZwa(ZwaKind::EndOfText)),
            b'b' => AstNode::new(AstKind::InlineZwa(ZwaKind::WordBoundary)),
            b'B' => AstNode::new(AstKind::InlineZwa(ZwaKind::NonWordBoundary)),
            c @ b'1'..=b'9' => AstNode::new(AstKind::Backref((c - b'0') as usize)),
            c => AstNode::new(AstKind::CharEscape(c)),
        };
        Ok(node)
    }

    fn parse_class(&mut self) -> Result<AstNode, CompileError> {
        self.pos += 1; // '['
        let inverted = self.eat(b'^');
        let mut children = Vec::new();
        let mut first = true;
        loop {
            match self.peek() {
                None => return Err(CompileError::Parse("unterminated character class".into())),
                Some(b']') if !first => {
                    self.pos += 1;
                    break;
                }
                _ => {
                    first = false;
                    children.push(self.parse_class_member()?);
                }
            }
        }
        Ok(AstNode::new(AstKind::CustomCharClass { inverted, children }))
    }

    fn parse_class_member(&mut self) -> Result<AstNode, CompileError> {
        let lo = self.parse_class_atom()?;
        if let ClassAtom::Byte(lo) = lo {
            if self.peek() == Some(b'-') && self.bytes.get(self.pos + 1) != Some(&b']') {
                self.pos += 1;
                if let ClassAtom::Byte(hi) = self.parse_class_atom()? {
                    return Ok(AstNode::new(AstKind::CharRange(lo, hi)));
                }
            }
            return Ok(AstNode::new(AstKind::CharRange(lo, lo)));
        }
        match lo {
            ClassAtom::Node(kind) => Ok(AstNode::new(kind)),
            ClassAtom::Byte(_) => unreachable!(),
        }
    }

    fn parse_class_atom(&mut self) -> Result<ClassAtom, CompileError> {
        match self.bump() {
            Some(b'\\') => {
                let c = self
                    .bump()
                    .ok_or_else(|| CompileError::Parse("dangling backslash in class".into()))?;
                Ok(match c {
                    b'd' => ClassAtom::Node(class_shorthand(b'0', b'9', false).kind),
                    b'D' => ClassAtom::Node(class_shorthand(b'0', b'9', true).kind),
                    b'w' => ClassAtom::Node(word_class(false).kind),
                    b'W' => ClassAtom::Node(word_class(true).kind),
                    b's' => ClassAtom::Node(space_class(false).kind),
                    b'S' => ClassAtom::Node(space_class(true).kind),
                    b'n' => ClassAtom::Byte(b'\n'),
                    b't' => ClassAtom::Byte(b'\t'),
                    b'r' => ClassAtom::Byte(b'\r'),
                    other => ClassAtom::Byte(other),
                })
            }
            Some(c) => Ok(ClassAtom::Byte(c)),
            None => Err(CompileError::Parse("unterminated character class".into())),
        }
    }
}

enum ClassAtom {
    Byte(u8),
    Node(AstKind),
}

fn class_shorthand(low: u8, high: u8, invert: bool) -> AstNode {
    let mut kind = AstKind::CustomCharClass { inverted: false, children: vec![] };
    if let AstKind::CustomCharClass { children, .. } = &mut kind {
        children.push(AstNode::new(AstKind::CharRange(low, high)));
    }
    if invert {
        if let AstKind::CustomCharClass { inverted, .. } = &mut kind {
            *inverted = true;
        }
    }
    AstNode::new(kind)
}

fn word_class(invert: bool) -> AstNode {
    let ranges = [(b'a', b'z'), (b'A', b'Z'), (b'0', b'9'), (b'_', b'_')];
    let children = ranges
        .into_iter()
        .map(|(lo, hi)| AstNode::new(AstKind::CharRange(lo, hi)))
        .collect();
    AstNode::new(AstKind::CustomCharClass { inverted: invert, children })
}

fn space_class(invert: bool) -> AstNode {
    let children = [b' ', b'\t', b'\n', b'\r', 0x0b, 0x0c]
        .into_iter()
        .map(|c| AstNode::new(AstKind::CharRange(c, c)))
        .collect();
    AstNode::new(AstKind::CustomCharClass { inverted: invert, children })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_literal_concat() {
        let ast = parse("ab").unwrap();
        assert!(matches!(ast.root.kind, AstKind::Concat(_, _)));
        assert_eq!(ast.group_count, 0);
    }

    #[test]
    fn parses_alternation_as_right_nested_alt() {
        let ast = parse("a|b|c").unwrap();
        assert!(matches!(ast.root.kind, AstKind::Alt(_, _)));
    }

    #[test]
    fn parses_capture_group_and_assigns_index() {
        let ast = parse("(a)(b)").unwrap();
        assert_eq!(ast.group_count, 2);
    }

    #[test]
    fn parses_non_capturing_group_without_bumping_group_count() {
        let ast = parse("(?:ab)(c)").unwrap();
        assert_eq!(ast.group_count, 1);
    }

    #[test]
    fn parses_lookahead() {
        let ast = parse("a(?=b)").unwrap();
        assert!(matches!(ast.root.kind, AstKind::Concat(_, _)));
    }

    #[test]
    fn parses_backref() {
        let ast = parse("(a+)\\1").unwrap();
        assert_eq!(ast.group_count, 1);
    }

    #[test]
    fn parses_bounded_repetition() {
        let ast = parse("a{2,4}").unwrap();
        assert!(matches!(
            ast.root.kind,
            AstKind::Curly { min: 2, max: Some(4), .. }
        ));
    }

    #[test]
    fn treats_unmatched_brace_as_literal() {
        let ast = parse("a{").unwrap();
        assert!(matches!(ast.root.kind, AstKind::Concat(_, _)));
    }

    #[test]
    fn detects_bol_and_eol_anchors() {
        let ast = parse("^abc$").unwrap();
        assert!(ast.bol_anchor);
        assert!(ast.eol_anchor);
    }

    #[test]
    fn rejects_unbalanced_paren() {
        assert!(parse("(a").is_err());
    }

    #[test]
    fn rejects_unterminated_class() {
        assert!(parse("[abc").is_err());
    }
}
