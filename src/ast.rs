use crate::flags::FlagSet;

/// Byte range into the decoded pattern text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub const fn empty_at(pos: usize) -> Self {
        Self { start: pos, end: pos }
    }

    pub const fn len(self) -> usize {
        self.end - self.start
    }

    pub const fn is_empty(self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    /// Flags in effect where this node starts.
    pub flags: FlagSet,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Alternation(Vec<Node>),
    Concatenation(Vec<Node>),
    Group {
        kind: GroupKind,
        body: Box<Node>,
    },
    CharacterClass(CharacterClass),
    Quantifier {
        body: Box<Node>,
        quantifier: Quantifier,
    },
    Anchor(AnchorKind),
    Backreference(BackrefTarget),
    FlagGroup {
        added: FlagSet,
        removed: FlagSet,
        scope: FlagGroupScope,
    },
    Shorthand(Shorthand),
    Dot,
    Literal(char),
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupKind {
    Capturing { index: u32, name: Option<String> },
    NonCapturing,
    Atomic,
    LookaheadPos,
    LookaheadNeg,
    LookbehindPos,
    LookbehindNeg,
}

impl GroupKind {
    pub fn is_lookaround(&self) -> bool {
        matches!(
            self,
            GroupKind::LookaheadPos
                | GroupKind::LookaheadNeg
                | GroupKind::LookbehindPos
                | GroupKind::LookbehindNeg
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlagGroupScope {
    /// `(?i:...)`
    Body(Box<Node>),
    /// `(?i)`: the rest of the enclosing group.
    WholeRemainder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantifier {
    pub min: u32,
    pub max: Option<u32>,
    pub mode: QuantifierMode,
    /// The operator alone, e.g. `+?` or `{2,3}`.
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantifierMode {
    Greedy,
    Reluctant,
    Possessive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorKind {
    LineStart,
    LineEnd,
    InputStart,
    InputEnd,
    InputEndNoTerminator,
    WordBoundary,
    NonWordBoundary,
    PreviousMatchEnd,
}

impl AnchorKind {
    pub fn is_start(self) -> bool {
        matches!(self, AnchorKind::LineStart | AnchorKind::InputStart)
    }

    pub fn is_end(self) -> bool {
        matches!(
            self,
            AnchorKind::LineEnd | AnchorKind::InputEnd | AnchorKind::InputEndNoTerminator
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackrefTarget {
    Index(u32),
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shorthand {
    pub kind: ShorthandKind,
    pub negated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShorthandKind {
    Digit,
    Word,
    Space,
    HorizontalSpace,
    VerticalSpace,
    /// `\p{Lower}` and the other POSIX names.
    Posix(String),
    /// Any other `\p{..}` property.
    Property(String),
}

pub const POSIX_NAMES: [&str; 13] = [
    "Lower", "Upper", "ASCII", "Alpha", "Digit", "Alnum", "Punct", "Graph", "Print", "Blank",
    "Cntrl", "XDigit", "Space",
];

#[derive(Debug, Clone, PartialEq)]
pub struct CharacterClass {
    pub negated: bool,
    pub members: Vec<ClassMember>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassMember {
    pub kind: ClassMemberKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassMemberKind {
    SingleChar { ch: char, escaped: bool },
    Range(char, char),
    Shorthand(Shorthand),
    NestedClass(CharacterClass),
    /// `a-z&&[^aeiou]`, one operand per side of each `&&`.
    Intersection(Vec<Vec<ClassMember>>),
}

impl Node {
    pub fn new(kind: NodeKind, span: Span, flags: FlagSet) -> Self {
        Self { kind, span, flags }
    }

    /// Visits this node and every descendant node in source order.
    /// Class members are not nodes and are not visited.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Node)) {
        visit(self);
        match &self.kind {
            NodeKind::Alternation(nodes) | NodeKind::Concatenation(nodes) => {
                for node in nodes {
                    node.walk(visit);
                }
            }
            NodeKind::Group { body, .. } | NodeKind::Quantifier { body, .. } => body.walk(visit),
            NodeKind::FlagGroup {
                scope: FlagGroupScope::Body(body),
                ..
            } => body.walk(visit),
            _ => {}
        }
    }

    /// Direct children for sequence-like nodes; the node itself otherwise.
    pub fn items(&self) -> &[Node] {
        match &self.kind {
            NodeKind::Concatenation(items) => items,
            NodeKind::Empty => &[],
            _ => std::slice::from_ref(self),
        }
    }

    pub fn is_unscoped_flag_group(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::FlagGroup {
                scope: FlagGroupScope::WholeRemainder,
                ..
            }
        )
    }

    /// Re-renders the tree. Leaves and delimiters come from `text` through
    /// their spans, structure from the tree itself.
    pub fn to_source(&self, text: &str) -> String {
        let mut out = String::with_capacity(self.span.len());
        self.write_source(text, &mut out);
        out
    }

    fn write_source(&self, text: &str, out: &mut String) {
        match &self.kind {
            NodeKind::Alternation(branches) => {
                for (i, branch) in branches.iter().enumerate() {
                    if i > 0 {
                        out.push('|');
                    }
                    branch.write_source(text, out);
                }
            }
            NodeKind::Concatenation(items) => {
                let mut cursor = self.span.start;
                for item in items {
                    out.push_str(slice(text, Span::new(cursor, item.span.start)));
                    item.write_source(text, out);
                    cursor = item.span.end;
                }
                out.push_str(slice(text, Span::new(cursor, self.span.end)));
            }
            NodeKind::Group { body, .. }
            | NodeKind::FlagGroup {
                scope: FlagGroupScope::Body(body),
                ..
            } => {
                out.push_str(slice(text, Span::new(self.span.start, body.span.start)));
                body.write_source(text, out);
                out.push_str(slice(text, Span::new(body.span.end, self.span.end)));
            }
            NodeKind::Quantifier { body, .. } => {
                body.write_source(text, out);
                out.push_str(slice(text, Span::new(body.span.end, self.span.end)));
            }
            NodeKind::CharacterClass(class) => class.write_source(self.span, text, out),
            _ => out.push_str(slice(text, self.span)),
        }
    }
}

impl CharacterClass {
    fn write_source(&self, span: Span, text: &str, out: &mut String) {
        out.push('[');
        if self.negated {
            out.push('^');
        }
        let body_start = span.start + if self.negated { 2 } else { 1 };
        let body_end = span.end.saturating_sub(1).max(body_start);
        write_members(&self.members, Span::new(body_start, body_end), text, out);
        out.push(']');
    }
}

fn write_members(members: &[ClassMember], within: Span, text: &str, out: &mut String) {
    let mut cursor = within.start;
    for member in members {
        out.push_str(slice(text, Span::new(cursor, member.span.start)));
        match &member.kind {
            ClassMemberKind::NestedClass(nested) => nested.write_source(member.span, text, out),
            ClassMemberKind::Intersection(operands) => {
                let mut operand_cursor = member.span.start;
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        out.push_str("&&");
                        operand_cursor += 2;
                    }
                    let operand_end = operand.last().map_or(operand_cursor, |m| m.span.end);
                    write_members(operand, Span::new(operand_cursor, operand_end), text, out);
                    operand_cursor = operand_end;
                }
            }
            _ => out.push_str(slice(text, member.span)),
        }
        cursor = member.span.end;
    }
    out.push_str(slice(text, Span::new(cursor, within.end)));
}

/// Source text of a span, or `""` when the span does not fit the text.
pub fn slice(text: &str, span: Span) -> &str {
    text.get(span.start..span.end).unwrap_or("")
}
