//! Regex modes and how inline directives scope them.
//!
//! Flags are resolved while parsing: the parser keeps a [`FlagScope`] and
//! stamps every node with the flags in effect where the node starts. An
//! unscoped directive such as `(?i)` changes the flags for the rest of the
//! enclosing group (later alternation branches included); a scoped one such
//! as `(?i:...)` only for its body. Leaving a group restores what was in
//! effect when it was entered.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FlagSet(u8);

impl FlagSet {
    pub const CASE_INSENSITIVE: FlagSet = FlagSet(1);
    pub const UNICODE_CASE: FlagSet = FlagSet(1 << 1);
    pub const UNICODE_CHARACTER_CLASS: FlagSet = FlagSet(1 << 2);
    pub const MULTILINE: FlagSet = FlagSet(1 << 3);
    pub const DOT_ALL: FlagSet = FlagSet(1 << 4);
    pub const COMMENTS: FlagSet = FlagSet(1 << 5);
    /// Whole pattern is literal text. Only settable from outside the pattern.
    pub const LITERAL: FlagSet = FlagSet(1 << 6);

    const LETTERS: [(char, FlagSet); 6] = [
        ('i', FlagSet::CASE_INSENSITIVE),
        ('u', FlagSet::UNICODE_CASE),
        ('U', FlagSet::UNICODE_CHARACTER_CLASS),
        ('m', FlagSet::MULTILINE),
        ('s', FlagSet::DOT_ALL),
        ('x', FlagSet::COMMENTS),
    ];

    pub const fn empty() -> Self {
        FlagSet(0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when every flag of `other` is set in `self`.
    pub const fn contains(self, other: FlagSet) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: FlagSet) -> Self {
        FlagSet(self.0 | other.0)
    }

    pub const fn difference(self, other: FlagSet) -> Self {
        FlagSet(self.0 & !other.0)
    }

    /// Applies an inline directive: additions first, then removals.
    pub const fn with_directive(self, added: FlagSet, removed: FlagSet) -> Self {
        self.union(added).difference(removed)
    }

    /// Case folding goes beyond ASCII.
    pub const fn unicode_case(self) -> bool {
        self.contains(FlagSet::UNICODE_CASE) || self.contains(FlagSet::UNICODE_CHARACTER_CLASS)
    }

    /// Maps an inline flag letter. Letters this engine does not model map to `None`.
    pub fn from_letter(letter: char) -> Option<FlagSet> {
        Self::LETTERS
            .iter()
            .find(|(c, _)| *c == letter)
            .map(|(_, flag)| *flag)
    }

    /// Parses a run of flag letters such as `"im"`, ignoring unknown letters.
    pub fn from_letters(letters: &str) -> FlagSet {
        letters
            .chars()
            .filter_map(FlagSet::from_letter)
            .fold(FlagSet::empty(), FlagSet::union)
    }
}

impl BitOr for FlagSet {
    type Output = FlagSet;

    fn bitor(self, rhs: FlagSet) -> FlagSet {
        self.union(rhs)
    }
}

impl BitOrAssign for FlagSet {
    fn bitor_assign(&mut self, rhs: FlagSet) {
        *self = self.union(rhs);
    }
}

impl fmt::Debug for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FlagSet(")?;
        for (letter, flag) in Self::LETTERS {
            if self.contains(flag) {
                write!(f, "{letter}")?;
            }
        }
        if self.contains(FlagSet::LITERAL) {
            write!(f, "+literal")?;
        }
        write!(f, ")")
    }
}

/// Lexical flag state carried by the parser.
#[derive(Debug, Clone)]
pub struct FlagScope {
    current: FlagSet,
    saved: Vec<FlagSet>,
}

impl FlagScope {
    pub fn new(external: FlagSet) -> Self {
        Self {
            current: external,
            saved: Vec::new(),
        }
    }

    pub fn current(&self) -> FlagSet {
        self.current
    }

    pub fn enter_group(&mut self) {
        self.saved.push(self.current);
    }

    pub fn exit_group(&mut self) {
        if let Some(flags) = self.saved.pop() {
            self.current = flags;
        }
    }

    pub fn apply(&mut self, added: FlagSet, removed: FlagSet) {
        self.current = self.current.with_directive(added, removed);
    }
}
