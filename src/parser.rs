use crate::ast::{
    AnchorKind, BackrefTarget, CharacterClass, ClassMember, ClassMemberKind, FlagGroupScope,
    GroupKind, Node, NodeKind, Quantifier, QuantifierMode, Shorthand, ShorthandKind, Span,
    POSIX_NAMES,
};
use crate::errors::{Found, SyntaxError};
use crate::flags::{FlagScope, FlagSet};

/// Groups and nested classes deeper than this are refused.
pub const DEFAULT_MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxDiagnostic {
    pub span: Span,
    pub error: SyntaxError,
}

impl SyntaxDiagnostic {
    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

/// A parsed pattern. `root` is best-effort when `diagnostics` is not empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult {
    pub root: Node,
    pub diagnostics: Vec<SyntaxDiagnostic>,
}

impl ParseResult {
    pub fn is_valid(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Parses `pattern` with `flags` in effect from the outside.
pub fn parse(pattern: &str, flags: FlagSet) -> ParseResult {
    Parser::new(pattern, flags).parse()
}

/// Recursive-descent parser for regular expressions.
///
/// The `Parser` struct holds the pattern and the current byte position. It
/// numbers capturing groups, tracks the lexically scoped flags and collects
/// syntax diagnostics instead of stopping at the first one.
pub struct Parser<'a> {
    pattern: &'a str,
    pos: usize,
    next_group_id: u32,
    flags: FlagScope,
    depth: usize,
    max_depth: usize,
    diagnostics: Vec<SyntaxDiagnostic>,
    halted: bool,
}

enum Opened {
    Group(GroupKind),
    ScopedFlags(FlagSet, FlagSet),
    UnscopedFlags(FlagSet, FlagSet),
}

enum Escape {
    Char(char),
    Shorthand(Shorthand),
    Anchor(AnchorKind),
    Backreference(BackrefTarget),
}

enum ClassAtom {
    Char { ch: char, escaped: bool },
    Set(Shorthand),
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given pattern.
    pub fn new(pattern: &'a str, flags: FlagSet) -> Self {
        Self {
            pattern,
            pos: 0,
            next_group_id: 1,
            flags: FlagScope::new(flags),
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
            diagnostics: Vec::new(),
            halted: false,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Entry point. Always returns a tree; problems end up in `diagnostics`.
    ///
    /// Example:
    /// - Pattern: `a|b` → Alternation([Concatenation([a]), Concatenation([b])])
    pub fn parse(mut self) -> ParseResult {
        let root = if self.flags.current().contains(FlagSet::LITERAL) {
            self.parse_literal_text()
        } else {
            self.parse_alt()
        };
        ParseResult {
            root,
            diagnostics: self.diagnostics,
        }
    }

    /// Allocate a new group ID for capturing groups.
    fn alloc_group_id(&mut self) -> u32 {
        let id = self.next_group_id;
        self.next_group_id += 1;
        id
    }

    fn rest(&self) -> &'a str {
        &self.pattern[self.pos..]
    }

    /// Peek at the next character in the pattern without advancing.
    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Advance the parser by one character and return it.
    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    /// Expect a specific character and advance if it matches.
    fn expect(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn char_span(&self) -> Span {
        let len = self.peek().map_or(0, char::len_utf8);
        Span::new(self.pos, self.pos + len)
    }

    fn report(&mut self, span: Span, error: SyntaxError) {
        if !self.halted {
            self.diagnostics.push(SyntaxDiagnostic { span, error });
        }
    }

    /// Reports `expected` against whatever is at the current position.
    fn report_expected(&mut self, expected: &'static str) {
        let (span, found) = match self.peek() {
            Some(c) => (self.char_span(), Found::Char(c)),
            None => (Span::empty_at(self.pos), Found::End),
        };
        self.report(span, SyntaxError::Expected { expected, found });
    }

    fn halt_on_depth(&mut self, start: usize) {
        self.report(
            Span::new(start, start + 1),
            SyntaxError::NestingTooDeep(self.max_depth),
        );
        self.halted = true;
        self.pos = self.pattern.len();
    }

    /// Skips whitespace and `#` comments when the comments flag is active.
    fn skip_trivia(&mut self) {
        self.pos = self.after_trivia(self.pos);
    }

    /// Where the whitespace and comments starting at `from` end.
    fn after_trivia(&self, from: usize) -> usize {
        if !self.flags.current().contains(FlagSet::COMMENTS) {
            return from;
        }
        let mut pos = from;
        let mut in_comment = false;
        for ch in self.pattern.get(from..).unwrap_or("").chars() {
            if in_comment {
                in_comment = ch != '\n';
            } else if ch == '#' {
                in_comment = true;
            } else if !ch.is_whitespace() {
                break;
            }
            pos += ch.len_utf8();
        }
        pos
    }

    fn sequence(&self, items: Vec<Node>, start: usize, flags: FlagSet) -> Node {
        let span = Span::new(start, self.pos);
        if items.is_empty() && span.is_empty() {
            Node::new(NodeKind::Empty, span, flags)
        } else {
            Node::new(NodeKind::Concatenation(items), span, flags)
        }
    }

    fn parse_literal_text(&mut self) -> Node {
        let flags = self.flags.current();
        let mut items = Vec::new();
        while let Some(ch) = self.peek() {
            let start = self.pos;
            self.advance();
            items.push(Node::new(NodeKind::Literal(ch), Span::new(start, self.pos), flags));
        }
        self.sequence(items, 0, flags)
    }

    /// Parse alternation (`|`) in the pattern.
    ///
    /// Example:
    /// - Pattern: `a|b|c` → Alternation([Concatenation([Literal('a')]), ...])
    /// - Pattern: `abc`   → Concatenation([Literal('a'), Literal('b'), Literal('c')])
    fn parse_alt(&mut self) -> Node {
        let start = self.pos;
        let flags = self.flags.current();
        let first = self.parse_seq();
        if self.peek() != Some('|') {
            return first;
        }
        let mut branches = vec![first];
        while self.peek() == Some('|') {
            self.advance();
            branches.push(self.parse_seq());
        }
        Node::new(
            NodeKind::Alternation(branches),
            Span::new(start, self.pos),
            flags,
        )
    }

    /// Parse a sequence of quantified atoms (concatenation).
    ///
    /// Example:
    /// - Pattern: `a(b|c)d` → Concatenation([Literal('a'), Group, Literal('d')])
    /// - Pattern: ``        → Empty
    fn parse_seq(&mut self) -> Node {
        let start = self.pos;
        let flags = self.flags.current();
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            let Some(ch) = self.peek() else { break };
            match ch {
                '|' => break,
                ')' if self.depth > 0 => break,
                ')' => {
                    let span = self.char_span();
                    self.report(span, SyntaxError::UnmatchedClosingParen);
                    self.advance();
                    items.push(Node::new(NodeKind::Literal(')'), span, self.flags.current()));
                }
                '*' | '+' | '?' => {
                    let span = self.char_span();
                    self.report(span, SyntaxError::UnexpectedQuantifier(ch));
                    self.advance();
                }
                '\\' if self.rest().starts_with("\\Q") => self.parse_quoted(&mut items),
                _ => {
                    let atom = self.parse_atom();
                    items.push(self.parse_quantifier_suffix(atom));
                }
            }
        }
        self.sequence(items, start, flags)
    }

    /// `\Q...\E`: everything up to `\E` (or the end) is literal. A quantifier
    /// right after `\E` binds to the last literal.
    fn parse_quoted(&mut self, items: &mut Vec<Node>) {
        self.pos += 2;
        let flags = self.flags.current();
        let end = self
            .rest()
            .find("\\E")
            .map_or(self.pattern.len(), |offset| self.pos + offset);
        while self.pos < end {
            let start = self.pos;
            if let Some(ch) = self.advance() {
                items.push(Node::new(NodeKind::Literal(ch), Span::new(start, self.pos), flags));
            }
        }
        if self.rest().starts_with("\\E") {
            self.pos += 2;
        }
        if let Some(last) = items.pop() {
            let node = self.parse_quantifier_suffix(last);
            items.push(node);
        }
    }

    /// Parse a quantifier (`*`, `+`, `?`, `{m,n}`) and its mode suffix after an atom.
    ///
    /// Example:
    /// - Pattern: `a*?`    → Quantifier { min: 0, max: None, mode: Reluctant }
    /// - Pattern: `b{2,}+` → Quantifier { min: 2, max: None, mode: Possessive }
    /// - Pattern: `c`      → Literal('c')
    fn parse_quantifier_suffix(&mut self, atom: Node) -> Node {
        self.skip_trivia();
        let op_start = self.pos;
        let bounds = match self.peek() {
            Some('*') => {
                self.advance();
                Some((0, None))
            }
            Some('+') => {
                self.advance();
                Some((1, None))
            }
            Some('?') => {
                self.advance();
                Some((0, Some(1)))
            }
            Some('{') => self.parse_bounds(),
            _ => None,
        };
        let Some((min, max)) = bounds else {
            return atom;
        };
        let mode = match self.peek() {
            Some('?') => {
                self.advance();
                QuantifierMode::Reluctant
            }
            Some('+') => {
                self.advance();
                QuantifierMode::Possessive
            }
            _ => QuantifierMode::Greedy,
        };
        let quantifier = Quantifier {
            min,
            max,
            mode,
            span: Span::new(op_start, self.pos),
        };
        let span = Span::new(atom.span.start, self.pos);
        let flags = atom.flags;
        Node::new(
            NodeKind::Quantifier {
                body: Box::new(atom),
                quantifier,
            },
            span,
            flags,
        )
    }

    /// `{n}`, `{n,}` or `{n,m}`. On a malformed bound the diagnostic is
    /// recorded and the parser resumes at the offending character.
    fn parse_bounds(&mut self) -> Option<(u32, Option<u32>)> {
        let open = self.pos;
        self.advance();
        let Some(min) = self.parse_int() else {
            self.report_expected("integer");
            return None;
        };
        let max = if self.expect(',') {
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.parse_int()
            } else {
                None
            }
        } else {
            Some(min)
        };
        if !self.expect('}') {
            self.report_expected("'}'");
            return None;
        }
        if max.is_some_and(|max| max < min) {
            self.report(Span::new(open, self.pos), SyntaxError::IllegalRepetitionRange);
            return None;
        }
        Some((min, max))
    }

    fn parse_int(&mut self) -> Option<u32> {
        let mut value: Option<u32> = None;
        while let Some(digit) = self.peek().and_then(|c| c.to_digit(10)) {
            self.advance();
            value = Some(value.unwrap_or(0).saturating_mul(10).saturating_add(digit));
        }
        value
    }

    /// Parse a single atom: group, class, escape, dot, anchor or literal.
    ///
    /// Examples:
    /// - Pattern: `(abc)` → Group { kind: Capturing { index: 1 }, body: Concatenation(..) }
    /// - Pattern: `[abc]` → CharacterClass { negated: false, members: [a, b, c] }
    /// - Pattern: `\d`    → Shorthand(Digit)
    /// - Pattern: `\1`    → Backreference(Index(1))
    /// - Pattern: `^`     → Anchor(LineStart)
    fn parse_atom(&mut self) -> Node {
        let start = self.pos;
        let flags = self.flags.current();
        let kind = match self.peek() {
            Some('(') => return self.parse_group(),
            Some('[') => NodeKind::CharacterClass(self.parse_char_class()),
            Some('\\') => match self.parse_escape_sequence(false) {
                Escape::Char(c) => NodeKind::Literal(c),
                Escape::Shorthand(shorthand) => NodeKind::Shorthand(shorthand),
                Escape::Anchor(anchor) => NodeKind::Anchor(anchor),
                Escape::Backreference(target) => NodeKind::Backreference(target),
            },
            Some('.') => {
                self.advance();
                NodeKind::Dot
            }
            Some('^') => {
                self.advance();
                NodeKind::Anchor(AnchorKind::LineStart)
            }
            Some('$') => {
                self.advance();
                NodeKind::Anchor(AnchorKind::LineEnd)
            }
            Some(c) => {
                self.advance();
                NodeKind::Literal(c)
            }
            None => NodeKind::Empty,
        };
        Node::new(kind, Span::new(start, self.pos), flags)
    }

    fn parse_group(&mut self) -> Node {
        let start = self.pos;
        let flags = self.flags.current();
        self.advance();
        if self.depth >= self.max_depth {
            self.halt_on_depth(start);
            return Node::new(NodeKind::Empty, Span::new(start, self.pos), flags);
        }

        let opened = self.parse_group_prefix();
        if let Opened::UnscopedFlags(added, removed) = opened {
            self.flags.apply(added, removed);
            return Node::new(
                NodeKind::FlagGroup {
                    added,
                    removed,
                    scope: FlagGroupScope::WholeRemainder,
                },
                Span::new(start, self.pos),
                flags,
            );
        }

        self.depth += 1;
        self.flags.enter_group();
        if let Opened::ScopedFlags(added, removed) = opened {
            self.flags.apply(added, removed);
        }
        let body = Box::new(self.parse_alt());
        self.flags.exit_group();
        self.depth -= 1;
        if !self.expect(')') {
            self.report_expected("')'");
        }

        let kind = match opened {
            Opened::Group(kind) => NodeKind::Group { kind, body },
            Opened::ScopedFlags(added, removed) | Opened::UnscopedFlags(added, removed) => {
                NodeKind::FlagGroup {
                    added,
                    removed,
                    scope: FlagGroupScope::Body(body),
                }
            }
        };
        Node::new(kind, Span::new(start, self.pos), flags)
    }

    /// Classifies the group from what follows `(`.
    fn parse_group_prefix(&mut self) -> Opened {
        if !self.expect('?') {
            let index = self.alloc_group_id();
            return Opened::Group(GroupKind::Capturing { index, name: None });
        }
        let kind = match self.peek() {
            Some(':') => GroupKind::NonCapturing,
            Some('>') => GroupKind::Atomic,
            Some('=') => GroupKind::LookaheadPos,
            Some('!') => GroupKind::LookaheadNeg,
            Some('<') => {
                self.advance();
                return match self.peek() {
                    Some('=') => {
                        self.advance();
                        Opened::Group(GroupKind::LookbehindPos)
                    }
                    Some('!') => {
                        self.advance();
                        Opened::Group(GroupKind::LookbehindNeg)
                    }
                    _ => {
                        let name = self.parse_group_name();
                        let index = self.alloc_group_id();
                        Opened::Group(GroupKind::Capturing {
                            index,
                            name: Some(name),
                        })
                    }
                };
            }
            Some(c) if c.is_ascii_alphabetic() || c == '-' => return self.parse_flag_directive(),
            _ => {
                self.report_expected("flag or ':' or ')'");
                return Opened::Group(GroupKind::NonCapturing);
            }
        };
        self.advance();
        Opened::Group(kind)
    }

    /// Reads `name>` after `(?<` or `\k<`.
    fn parse_group_name(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric()) {
            self.advance();
        }
        let name = self.pattern[start..self.pos].to_string();
        if !self.expect('>') {
            self.report_expected("'>'");
        }
        name
    }

    /// `(?i-m)` or `(?i-m:`. Letters without a modelled flag are skipped.
    fn parse_flag_directive(&mut self) -> Opened {
        let mut added = FlagSet::empty();
        let mut removed = FlagSet::empty();
        let mut negate = false;
        while let Some(c) = self.peek() {
            if c == '-' {
                negate = true;
            } else if c.is_ascii_alphabetic() {
                if let Some(flag) = FlagSet::from_letter(c) {
                    if negate {
                        removed |= flag;
                    } else {
                        added |= flag;
                    }
                }
            } else {
                break;
            }
            self.advance();
        }
        match self.peek() {
            Some(')') => {
                self.advance();
                Opened::UnscopedFlags(added, removed)
            }
            Some(':') => {
                self.advance();
                Opened::ScopedFlags(added, removed)
            }
            _ => {
                self.report_expected("flag or ':' or ')'");
                Opened::ScopedFlags(added, removed)
            }
        }
    }

    /// Parses a `\...` sequence starting at the backslash.
    fn parse_escape_sequence(&mut self, in_class: bool) -> Escape {
        let start = self.pos;
        self.advance();
        let Some(c) = self.advance() else {
            self.report_expected("escape sequence");
            return Escape::Char('\\');
        };
        let shorthand = |kind: ShorthandKind| {
            Escape::Shorthand(Shorthand {
                kind,
                negated: c.is_ascii_uppercase(),
            })
        };
        match c {
            'd' | 'D' => shorthand(ShorthandKind::Digit),
            'w' | 'W' => shorthand(ShorthandKind::Word),
            's' | 'S' => shorthand(ShorthandKind::Space),
            'h' | 'H' => shorthand(ShorthandKind::HorizontalSpace),
            'v' | 'V' => shorthand(ShorthandKind::VerticalSpace),
            'p' | 'P' => Escape::Shorthand(self.parse_property(c == 'P')),
            'b' if in_class => Escape::Char('\u{8}'),
            'b' => Escape::Anchor(AnchorKind::WordBoundary),
            'B' if !in_class => Escape::Anchor(AnchorKind::NonWordBoundary),
            'A' if !in_class => Escape::Anchor(AnchorKind::InputStart),
            'z' if !in_class => Escape::Anchor(AnchorKind::InputEnd),
            'Z' if !in_class => Escape::Anchor(AnchorKind::InputEndNoTerminator),
            'G' if !in_class => Escape::Anchor(AnchorKind::PreviousMatchEnd),
            '1'..='9' if !in_class => {
                Escape::Backreference(BackrefTarget::Index(self.parse_backref_number(c)))
            }
            'k' if !in_class && self.peek() == Some('<') => {
                self.advance();
                Escape::Backreference(BackrefTarget::Name(self.parse_group_name()))
            }
            't' => Escape::Char('\t'),
            'n' => Escape::Char('\n'),
            'r' => Escape::Char('\r'),
            'f' => Escape::Char('\u{c}'),
            'a' => Escape::Char('\u{7}'),
            'e' => Escape::Char('\u{1b}'),
            '0' => self.parse_octal(),
            'x' => self.parse_hex_escape(start),
            'u' => self.parse_unicode_escape(start),
            'c' => match self.advance() {
                Some(letter) => {
                    Escape::Char(char::from_u32(letter as u32 ^ 0x40).unwrap_or(letter))
                }
                None => {
                    self.report_expected("control character");
                    Escape::Char('c')
                }
            },
            other => Escape::Char(other),
        }
    }

    /// Takes further digits only while they still name an existing group.
    fn parse_backref_number(&mut self, first: char) -> u32 {
        let mut number = first.to_digit(10).unwrap_or(0);
        while let Some(digit) = self.peek().and_then(|c| c.to_digit(10)) {
            let next = number.saturating_mul(10).saturating_add(digit);
            if next >= self.next_group_id {
                break;
            }
            number = next;
            self.advance();
        }
        number
    }

    /// `\0n`, `\0nn` or `\0mnn` with `m <= 3`.
    fn parse_octal(&mut self) -> Escape {
        let mut value = 0u32;
        let mut digits = 0;
        while let Some(digit) = self.peek().and_then(|c| c.to_digit(8)) {
            if digits == 3 || (digits == 2 && value > 0o37) {
                break;
            }
            value = value * 8 + digit;
            digits += 1;
            self.advance();
        }
        if digits == 0 {
            self.report_expected("octal digit");
        }
        Escape::Char(char::from_u32(value).unwrap_or('\0'))
    }

    /// `\xhh` or `\x{h...h}`.
    fn parse_hex_escape(&mut self, start: usize) -> Escape {
        let pattern = self.pattern;
        let value = if self.expect('{') {
            let digits_start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.advance();
            }
            let digits = &pattern[digits_start..self.pos];
            if digits.is_empty() {
                self.report_expected("hexadecimal digit");
            }
            if !self.expect('}') {
                self.report_expected("'}'");
            }
            if digits.is_empty() {
                None
            } else {
                Some(u32::from_str_radix(digits, 16).unwrap_or(u32::MAX))
            }
        } else {
            self.parse_hex_digits(2)
        };
        self.code_point(value, start)
    }

    /// `\uhhhh`, combining a high/low surrogate pair written as two escapes.
    fn parse_unicode_escape(&mut self, start: usize) -> Escape {
        let Some(high) = self.parse_hex_digits(4) else {
            return Escape::Char(char::REPLACEMENT_CHARACTER);
        };
        if (0xD800..0xDC00).contains(&high) && self.rest().starts_with("\\u") {
            if let Some(low) = self
                .hex_at(self.pos + 2, 4)
                .filter(|low| (0xDC00..0xE000).contains(low))
            {
                self.pos += 6;
                let combined = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                return self.code_point(Some(combined), start);
            }
        }
        self.code_point(Some(high), start)
    }

    fn parse_hex_digits(&mut self, count: usize) -> Option<u32> {
        let mut value = 0u32;
        for _ in 0..count {
            match self.peek().and_then(|c| c.to_digit(16)) {
                Some(digit) => {
                    value = value * 16 + digit;
                    self.advance();
                }
                None => {
                    self.report_expected("hexadecimal digit");
                    return None;
                }
            }
        }
        Some(value)
    }

    fn hex_at(&self, at: usize, count: usize) -> Option<u32> {
        let digits = self.pattern.get(at..at + count)?;
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        u32::from_str_radix(digits, 16).ok()
    }

    fn code_point(&mut self, value: Option<u32>, start: usize) -> Escape {
        match value.map(|v| (v, char::from_u32(v))) {
            Some((_, Some(c))) => Escape::Char(c),
            Some((_, None)) => {
                self.report(Span::new(start, self.pos), SyntaxError::InvalidCodePoint);
                Escape::Char(char::REPLACEMENT_CHARACTER)
            }
            None => Escape::Char(char::REPLACEMENT_CHARACTER),
        }
    }

    /// `\p{Name}`, `\P{Name}` or the one-letter `\pL` form.
    fn parse_property(&mut self, negated: bool) -> Shorthand {
        let name = if self.expect('{') {
            let start = self.pos;
            while self.peek().is_some_and(|c| c != '}') {
                self.advance();
            }
            let name = self.pattern[start..self.pos].to_string();
            if !self.expect('}') {
                self.report_expected("'}'");
            }
            name
        } else {
            match self.advance() {
                Some(letter) => letter.to_string(),
                None => {
                    self.report_expected("property name");
                    String::new()
                }
            }
        };
        let kind = if POSIX_NAMES.contains(&name.as_str()) {
            ShorthandKind::Posix(name)
        } else {
            ShorthandKind::Property(name)
        };
        Shorthand { kind, negated }
    }

    /// Parse a character class, e.g. `[abc]`, `[^a-z]`, `[a[bc]]` or `[a-z&&[^x]]`.
    ///
    /// A `]` right after the opening bracket (or `[^`) is a literal.
    fn parse_char_class(&mut self) -> CharacterClass {
        self.advance();
        let negated = self.expect('^');
        self.depth += 1;
        let body_start = self.pos;
        let mut operands: Vec<Vec<ClassMember>> = Vec::new();
        let mut members = Vec::new();
        let mut first = true;
        loop {
            self.skip_trivia();
            match self.peek() {
                None => {
                    self.report_expected("']'");
                    break;
                }
                Some(']') if !first => break,
                Some('[') => {
                    let start = self.pos;
                    if self.depth >= self.max_depth {
                        self.halt_on_depth(start);
                        break;
                    }
                    let nested = self.parse_char_class();
                    members.push(ClassMember {
                        kind: ClassMemberKind::NestedClass(nested),
                        span: Span::new(start, self.pos),
                    });
                }
                Some('&') if self.rest().starts_with("&&") => {
                    self.pos += 2;
                    operands.push(std::mem::take(&mut members));
                }
                Some('\\') if self.rest().starts_with("\\Q") => {
                    self.parse_class_quoted(&mut members)
                }
                Some(_) => members.push(self.parse_class_item()),
            }
            first = false;
        }
        let body_end = self.pos;
        self.expect(']');
        self.depth -= 1;

        if !operands.is_empty() {
            operands.push(members);
            members = vec![ClassMember {
                kind: ClassMemberKind::Intersection(operands),
                span: Span::new(body_start, body_end),
            }];
        }
        CharacterClass { negated, members }
    }

    /// `\Q...\E` inside a class: each quoted character is a member.
    fn parse_class_quoted(&mut self, members: &mut Vec<ClassMember>) {
        self.pos += 2;
        let end = self
            .rest()
            .find("\\E")
            .map_or(self.pattern.len(), |offset| self.pos + offset);
        while self.pos < end {
            let start = self.pos;
            if let Some(ch) = self.advance() {
                members.push(ClassMember {
                    kind: ClassMemberKind::SingleChar { ch, escaped: false },
                    span: Span::new(start, self.pos),
                });
            }
        }
        if self.rest().starts_with("\\E") {
            self.pos += 2;
        }
    }

    fn parse_class_item(&mut self) -> ClassMember {
        let start = self.pos;
        let kind = match self.parse_class_atom() {
            ClassAtom::Set(shorthand) => ClassMemberKind::Shorthand(shorthand),
            ClassAtom::Char { ch, escaped } if self.range_follows() => {
                self.pos = self.after_trivia(self.pos) + 1;
                self.skip_trivia();
                match self.parse_class_atom() {
                    ClassAtom::Char { ch: hi, .. } if ch <= hi => ClassMemberKind::Range(ch, hi),
                    ClassAtom::Char { .. } => {
                        self.report(Span::new(start, self.pos), SyntaxError::IllegalCharacterRange);
                        ClassMemberKind::SingleChar { ch, escaped }
                    }
                    ClassAtom::Set(shorthand) => {
                        self.report(Span::new(start, self.pos), SyntaxError::IllegalCharacterRange);
                        ClassMemberKind::Shorthand(shorthand)
                    }
                }
            }
            ClassAtom::Char { ch, escaped } => ClassMemberKind::SingleChar { ch, escaped },
        };
        ClassMember {
            kind,
            span: Span::new(start, self.pos),
        }
    }

    /// A `-` starts a range unless it is the last thing in the class or is
    /// followed by a nested class. Comments-mode trivia may surround it.
    fn range_follows(&self) -> bool {
        let dash = self.after_trivia(self.pos);
        if !self.pattern[dash..].starts_with('-') {
            return false;
        }
        let high = self.after_trivia(dash + 1);
        !matches!(self.pattern[high..].chars().next(), None | Some(']') | Some('['))
    }

    fn parse_class_atom(&mut self) -> ClassAtom {
        match self.peek() {
            Some('\\') => match self.parse_escape_sequence(true) {
                Escape::Char(ch) => ClassAtom::Char { ch, escaped: true },
                Escape::Shorthand(shorthand) => ClassAtom::Set(shorthand),
                // Not produced inside a class.
                Escape::Anchor(_) | Escape::Backreference(_) => ClassAtom::Char {
                    ch: char::REPLACEMENT_CHARACTER,
                    escaped: true,
                },
            },
            Some(ch) => {
                self.advance();
                ClassAtom::Char { ch, escaped: false }
            }
            None => ClassAtom::Char {
                ch: char::REPLACEMENT_CHARACTER,
                escaped: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(pattern: &str) -> Node {
        let result = parse(pattern, FlagSet::empty());
        assert!(result.is_valid(), "{pattern}: {:?}", result.diagnostics);
        result.root
    }

    fn messages(pattern: &str) -> Vec<String> {
        parse(pattern, FlagSet::empty())
            .diagnostics
            .iter()
            .map(SyntaxDiagnostic::message)
            .collect()
    }

    #[test]
    fn alternation_of_concatenations() {
        let root = parse_ok("ab|c");
        let NodeKind::Alternation(branches) = &root.kind else {
            panic!("expected alternation, got {root:?}");
        };
        assert_eq!(branches.len(), 2);
        assert_eq!(branches[0].items().len(), 2);
        assert_eq!(branches[1].items()[0].kind, NodeKind::Literal('c'));
    }

    #[test]
    fn empty_pattern_is_empty_node() {
        assert_eq!(parse_ok("").kind, NodeKind::Empty);
        let root = parse_ok("(?:)");
        let NodeKind::Group { body, .. } = &root.items()[0].kind else {
            panic!("expected group");
        };
        assert_eq!(body.kind, NodeKind::Empty);
    }

    #[test]
    fn quantifier_modes() {
        let root = parse_ok("a*?b++c{2,3}d?");
        let modes: Vec<_> = root
            .items()
            .iter()
            .map(|node| match &node.kind {
                NodeKind::Quantifier { quantifier, .. } => {
                    (quantifier.min, quantifier.max, quantifier.mode)
                }
                other => panic!("expected quantifier, got {other:?}"),
            })
            .collect();
        assert_eq!(
            modes,
            vec![
                (0, None, QuantifierMode::Reluctant),
                (1, None, QuantifierMode::Possessive),
                (2, Some(3), QuantifierMode::Greedy),
                (0, Some(1), QuantifierMode::Greedy),
            ]
        );
    }

    #[test]
    fn quantifier_operator_span() {
        let root = parse_ok("<.+?>");
        let NodeKind::Quantifier { quantifier, .. } = &root.items()[1].kind else {
            panic!("expected quantifier");
        };
        assert_eq!(quantifier.span, Span::new(2, 4));
        assert_eq!(root.items()[1].span, Span::new(1, 4));
    }

    #[test]
    fn group_kinds() {
        let root = parse_ok("(a)(?:b)(?>c)(?=d)(?!e)(?<=f)(?<!g)(?<name>h)");
        let kinds: Vec<_> = root
            .items()
            .iter()
            .map(|node| match &node.kind {
                NodeKind::Group { kind, .. } => kind.clone(),
                other => panic!("expected group, got {other:?}"),
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                GroupKind::Capturing { index: 1, name: None },
                GroupKind::NonCapturing,
                GroupKind::Atomic,
                GroupKind::LookaheadPos,
                GroupKind::LookaheadNeg,
                GroupKind::LookbehindPos,
                GroupKind::LookbehindNeg,
                GroupKind::Capturing {
                    index: 2,
                    name: Some("name".to_string())
                },
            ]
        );
    }

    #[test]
    fn unmatched_open_paren() {
        let result = parse("(", FlagSet::empty());
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(
            result.diagnostics[0].message(),
            "Expected ')', but found the end of the regex"
        );
        assert_eq!(result.diagnostics[0].span, Span::empty_at(1));
    }

    #[test]
    fn unmatched_bracket() {
        assert_eq!(messages("[abc"), vec!["Expected ']', but found the end of the regex"]);
    }

    #[test]
    fn bad_bound_resyncs_as_literals() {
        let result = parse("x{1,2,3}", FlagSet::empty());
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].message(), "Expected '}', but found ','");
        assert_eq!(result.diagnostics[0].span, Span::new(5, 6));
        let literals: Vec<_> = result.root.items().iter().map(|n| n.kind.clone()).collect();
        assert_eq!(
            literals,
            vec![
                NodeKind::Literal('x'),
                NodeKind::Literal(','),
                NodeKind::Literal('3'),
                NodeKind::Literal('}'),
            ]
        );
    }

    #[test]
    fn multiple_independent_diagnostics() {
        assert_eq!(
            messages("a{1,2,3}|b)|*"),
            vec![
                "Expected '}', but found ','",
                "Unmatched closing ')'",
                "Unexpected quantifier '*'",
            ]
        );
    }

    #[test]
    fn reversed_ranges() {
        assert_eq!(messages("[z-a]"), vec!["Illegal character range"]);
        assert_eq!(messages("a{3,1}"), vec!["Illegal repetition range"]);
        assert!(messages("[a-]").is_empty());
        assert!(messages("[-a]").is_empty());
    }

    #[test]
    fn inline_flags_are_lexically_scoped() {
        let root = parse_ok("a(?i)b|c");
        let NodeKind::Alternation(branches) = &root.kind else {
            panic!("expected alternation");
        };
        let first = branches[0].items();
        assert!(!first[0].flags.contains(FlagSet::CASE_INSENSITIVE));
        assert!(first[2].flags.contains(FlagSet::CASE_INSENSITIVE));
        // Later branches of the same group see the directive.
        assert!(branches[1].items()[0].flags.contains(FlagSet::CASE_INSENSITIVE));

        let root = parse_ok("(a(?i)b)c");
        let items = root.items();
        assert!(!items[1].flags.contains(FlagSet::CASE_INSENSITIVE));

        let root = parse_ok("(?i:a)b");
        let items = root.items();
        let NodeKind::FlagGroup { scope: FlagGroupScope::Body(body), .. } = &items[0].kind else {
            panic!("expected scoped flag group");
        };
        assert!(body.items()[0].flags.contains(FlagSet::CASE_INSENSITIVE));
        assert!(!items[1].flags.contains(FlagSet::CASE_INSENSITIVE));
    }

    #[test]
    fn flag_removal_and_unknown_letters() {
        let result = parse("(?d-i)a", FlagSet::CASE_INSENSITIVE);
        assert!(result.is_valid());
        assert!(result.root.items()[1].flags.is_empty());
    }

    #[test]
    fn backreferences() {
        let root = parse_ok("(a)\\1\\11(?<n>b)\\k<n>");
        let refs: Vec<_> = root
            .items()
            .iter()
            .filter_map(|n| match &n.kind {
                NodeKind::Backreference(target) => Some(target.clone()),
                _ => None,
            })
            .collect();
        // `\11` with a single group is `\1` followed by `1`.
        assert_eq!(
            refs,
            vec![
                BackrefTarget::Index(1),
                BackrefTarget::Index(1),
                BackrefTarget::Name("n".to_string()),
            ]
        );
    }

    #[test]
    fn escapes_and_properties() {
        let root = parse_ok("\\x{1F600}\\u00e8\\uD83D\\uDE00\\t\\p{Lower}\\P{L}\\pL");
        let kinds: Vec<_> = root.items().iter().map(|n| n.kind.clone()).collect();
        assert_eq!(kinds[0], NodeKind::Literal('\u{1F600}'));
        assert_eq!(kinds[1], NodeKind::Literal('è'));
        assert_eq!(kinds[2], NodeKind::Literal('\u{1F600}'));
        assert_eq!(kinds[3], NodeKind::Literal('\t'));
        assert_eq!(
            kinds[4],
            NodeKind::Shorthand(Shorthand {
                kind: ShorthandKind::Posix("Lower".to_string()),
                negated: false
            })
        );
        assert_eq!(
            kinds[5],
            NodeKind::Shorthand(Shorthand {
                kind: ShorthandKind::Property("L".to_string()),
                negated: true
            })
        );
        assert_eq!(kinds.len(), 7);
    }

    #[test]
    fn class_members() {
        let root = parse_ok("[^a-c\\d\\x41[xy]]");
        let NodeKind::CharacterClass(class) = &root.items()[0].kind else {
            panic!("expected class");
        };
        assert!(class.negated);
        assert_eq!(class.members[0].kind, ClassMemberKind::Range('a', 'c'));
        assert_eq!(class.members[0].span, Span::new(2, 5));
        assert!(matches!(class.members[1].kind, ClassMemberKind::Shorthand(_)));
        assert_eq!(
            class.members[2].kind,
            ClassMemberKind::SingleChar { ch: 'A', escaped: true }
        );
        assert!(matches!(class.members[3].kind, ClassMemberKind::NestedClass(_)));
    }

    #[test]
    fn class_intersection() {
        let root = parse_ok("[a-z&&[^aeiou]]");
        let NodeKind::CharacterClass(class) = &root.items()[0].kind else {
            panic!("expected class");
        };
        let [ClassMember {
            kind: ClassMemberKind::Intersection(operands),
            ..
        }] = class.members.as_slice()
        else {
            panic!("expected a single intersection member");
        };
        assert_eq!(operands.len(), 2);
    }

    #[test]
    fn leading_bracket_is_literal() {
        let root = parse_ok("[]a]");
        let NodeKind::CharacterClass(class) = &root.items()[0].kind else {
            panic!("expected class");
        };
        assert_eq!(
            class.members[0].kind,
            ClassMemberKind::SingleChar { ch: ']', escaped: false }
        );
    }

    #[test]
    fn quoting() {
        let root = parse_ok("\\Qa.b\\E*");
        let items = root.items();
        assert_eq!(items.len(), 3);
        assert_eq!(items[1].kind, NodeKind::Literal('.'));
        assert!(matches!(items[2].kind, NodeKind::Quantifier { .. }));
    }

    #[test]
    fn comments_mode_skips_whitespace() {
        let result = parse("a b # comment\n c", FlagSet::COMMENTS);
        assert!(result.is_valid());
        let literals: Vec<_> = result.root.items().iter().map(|n| n.kind.clone()).collect();
        assert_eq!(
            literals,
            vec![NodeKind::Literal('a'), NodeKind::Literal('b'), NodeKind::Literal('c')]
        );
    }

    #[test]
    fn literal_flag_disables_syntax() {
        let result = parse("(a", FlagSet::LITERAL);
        assert!(result.is_valid());
        assert_eq!(result.root.items().len(), 2);
    }

    #[test]
    fn nesting_depth_is_capped() {
        let pattern = "(".repeat(300);
        let result = Parser::new(&pattern, FlagSet::empty())
            .with_max_depth(16)
            .parse();
        assert_eq!(
            result.diagnostics,
            vec![SyntaxDiagnostic {
                span: Span::new(16, 17),
                error: SyntaxError::NestingTooDeep(16),
            }]
        );
    }

    #[test]
    fn to_source_reproduces_valid_input() {
        for pattern in [
            "^(?:a|b|c)$",
            "<.+?>",
            "[0-9x9]",
            "(?i)a(?-i:B)|\\d{2,}+",
            "[^a-z&&[^aeiou]]\\p{Lower}",
            "\\Qa.b\\E*c",
            "(?<year>\\d{4})-\\k<year>",
        ] {
            let result = parse(pattern, FlagSet::empty());
            assert!(result.is_valid(), "{pattern}");
            assert_eq!(result.root.to_source(pattern), pattern);
        }
    }
}
