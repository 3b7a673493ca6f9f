//! Character-class semantics.
//!
//! Turns a parsed class plus the flags in effect into an explicit set of
//! Unicode scalar values. Anything whose membership depends on tables this
//! crate does not carry (Unicode properties, Unicode-mode `\w`, `&&`
//! intersections) makes the class opaque instead of being guessed.

use smallvec::SmallVec;
use unicode_segmentation::UnicodeSegmentation;

use crate::ast::{
    CharacterClass, ClassMember, ClassMemberKind, Node, NodeKind, Shorthand, ShorthandKind, Span,
};
use crate::flags::FlagSet;

const MAX_SCALAR: u32 = 0x10FFFF;
const SURROGATES: (u32, u32) = (0xD800, 0xDFFF);
/// Ranges wider than this only get ASCII case folding.
const FOLD_SCAN_LIMIT: u32 = 0x3000;

/// Sorted, non-overlapping, non-adjacent inclusive ranges of scalar values.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CodePointSet {
    ranges: SmallVec<[(u32, u32); 4]>,
}

impl CodePointSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(c: char) -> Self {
        Self::range(c, c)
    }

    pub fn range(lo: char, hi: char) -> Self {
        Self::from_ranges([(lo as u32, hi as u32)])
    }

    pub fn from_ranges(ranges: impl IntoIterator<Item = (u32, u32)>) -> Self {
        let mut ranges: SmallVec<[(u32, u32); 4]> = ranges
            .into_iter()
            .filter(|(lo, hi)| lo <= hi)
            .collect();
        ranges.sort_unstable();
        let mut merged: SmallVec<[(u32, u32); 4]> = SmallVec::with_capacity(ranges.len());
        for (lo, hi) in ranges {
            match merged.last_mut() {
                Some(last) if lo <= last.1.saturating_add(1) => last.1 = last.1.max(hi),
                _ => merged.push((lo, hi)),
            }
        }
        Self { ranges: merged }
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Number of scalar values in the set.
    pub fn len(&self) -> u64 {
        self.ranges
            .iter()
            .map(|(lo, hi)| u64::from(hi - lo) + 1)
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.ranges.iter().copied()
    }

    pub fn contains(&self, c: char) -> bool {
        let cp = c as u32;
        self.ranges.iter().any(|(lo, hi)| *lo <= cp && cp <= *hi)
    }

    pub fn union(&self, other: &CodePointSet) -> CodePointSet {
        Self::from_ranges(self.iter().chain(other.iter()))
    }

    pub fn intersection(&self, other: &CodePointSet) -> CodePointSet {
        let mut out = SmallVec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.ranges.len() && j < other.ranges.len() {
            let (a_lo, a_hi) = self.ranges[i];
            let (b_lo, b_hi) = other.ranges[j];
            let lo = a_lo.max(b_lo);
            let hi = a_hi.min(b_hi);
            if lo <= hi {
                out.push((lo, hi));
            }
            if a_hi < b_hi {
                i += 1;
            } else {
                j += 1;
            }
        }
        Self { ranges: out }
    }

    pub fn intersects(&self, other: &CodePointSet) -> bool {
        !self.intersection(other).is_empty()
    }

    /// Complement within the scalar values (surrogates are never members).
    pub fn complement(&self) -> CodePointSet {
        let mut gaps = Vec::with_capacity(self.ranges.len() + 2);
        let mut next = 0u32;
        for (lo, hi) in self.iter() {
            if lo > next {
                gaps.push((next, lo - 1));
            }
            next = hi.saturating_add(1);
        }
        if next <= MAX_SCALAR {
            gaps.push((next, MAX_SCALAR));
        }
        let surrogates = CodePointSet::from_ranges([SURROGATES]).complement_raw();
        Self::from_ranges(gaps).intersection(&surrogates)
    }

    fn complement_raw(&self) -> CodePointSet {
        let mut gaps = Vec::new();
        let mut next = 0u32;
        for (lo, hi) in self.iter() {
            if lo > next {
                gaps.push((next, lo - 1));
            }
            next = hi + 1;
        }
        gaps.push((next, MAX_SCALAR));
        Self::from_ranges(gaps)
    }

    /// Adds the case counterparts of every member. ASCII-only unless
    /// `unicode` is set, in which case the simple case mapping closure is used.
    pub fn case_fold(&self, unicode: bool) -> CodePointSet {
        let mut extra: Vec<(u32, u32)> = Vec::new();
        for (lo, hi) in self.iter() {
            fold_ascii(lo, hi, &mut extra);
            if unicode && hi - lo <= FOLD_SCAN_LIMIT {
                for c in (lo..=hi).filter_map(char::from_u32) {
                    if c.is_ascii() {
                        continue;
                    }
                    extra.extend(case_variants(c).into_iter().map(|v| (v as u32, v as u32)));
                }
            }
        }
        Self::from_ranges(self.iter().chain(extra))
    }
}

fn fold_ascii(lo: u32, hi: u32, extra: &mut Vec<(u32, u32)>) {
    const DELTA: u32 = 0x20;
    let lower = (lo.max('a' as u32), hi.min('z' as u32));
    if lower.0 <= lower.1 {
        extra.push((lower.0 - DELTA, lower.1 - DELTA));
    }
    let upper = (lo.max('A' as u32), hi.min('Z' as u32));
    if upper.0 <= upper.1 {
        extra.push((upper.0 + DELTA, upper.1 + DELTA));
    }
}

/// Every character reachable from `c` through single-character lower/upper
/// mappings, `c` included.
fn case_variants(c: char) -> SmallVec<[char; 4]> {
    let mut seen: SmallVec<[char; 4]> = SmallVec::new();
    seen.push(c);
    let mut i = 0;
    while i < seen.len() {
        let current = seen[i];
        let lower = single_mapping(current.to_lowercase());
        let upper = single_mapping(current.to_uppercase());
        for mapped in [lower, upper].into_iter().flatten() {
            if !seen.contains(&mapped) {
                seen.push(mapped);
            }
        }
        i += 1;
    }
    seen
}

fn single_mapping(mut mapping: impl Iterator<Item = char>) -> Option<char> {
    let first = mapping.next()?;
    mapping.next().is_none().then_some(first)
}

/// A multi-code-point user-perceived character written inside a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphemeCluster {
    pub span: Span,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedClass {
    /// Single code points of the effective membership.
    pub singles: Vec<char>,
    /// Multi-code-point ranges of the effective membership.
    pub ranges: Vec<(char, char)>,
    /// Shorthand members as written, nested classes included.
    pub shorthands: Vec<Shorthand>,
    pub clusters: Vec<GraphemeCluster>,
    pub opaque: bool,
    /// Effective membership, negation applied. Empty when `opaque`.
    pub set: CodePointSet,
}

impl ResolvedClass {
    /// A plain (non-negated) class with the resolved membership.
    pub fn to_class(&self) -> CharacterClass {
        let member = |kind| ClassMember {
            kind,
            span: Span::default(),
        };
        let members = self
            .singles
            .iter()
            .map(|&ch| member(ClassMemberKind::SingleChar { ch, escaped: true }))
            .chain(
                self.ranges
                    .iter()
                    .map(|&(lo, hi)| member(ClassMemberKind::Range(lo, hi))),
            )
            .collect();
        CharacterClass {
            negated: false,
            members,
        }
    }
}

/// Resolves a class under `flags`.
pub fn resolve(class: &CharacterClass, flags: FlagSet) -> ResolvedClass {
    let mut shorthands = Vec::new();
    collect_shorthands(&class.members, &mut shorthands);
    let clusters = find_clusters(&class.members);

    let Some(set) = class_set(class, flags) else {
        return ResolvedClass {
            singles: Vec::new(),
            ranges: Vec::new(),
            shorthands,
            clusters,
            opaque: true,
            set: CodePointSet::new(),
        };
    };

    let mut singles = Vec::new();
    let mut ranges = Vec::new();
    for (lo, hi) in set.iter() {
        let (Some(lo_ch), Some(hi_ch)) = (char::from_u32(lo), char::from_u32(hi)) else {
            continue;
        };
        if lo == hi {
            singles.push(lo_ch);
        } else {
            ranges.push((lo_ch, hi_ch));
        }
    }
    ResolvedClass {
        singles,
        ranges,
        shorthands,
        clusters,
        opaque: false,
        set,
    }
}

fn class_set(class: &CharacterClass, flags: FlagSet) -> Option<CodePointSet> {
    let set = positive_set(&class.members, flags)?;
    Some(if class.negated { set.complement() } else { set })
}

/// Union of `members`, negation of the class itself not applied.
///
/// A nested negated class is only resolved when every sibling lies inside
/// its un-negated contents, so siblings cannot overlap it whatever the
/// negation covers. Otherwise the whole class is opaque.
fn positive_set(members: &[ClassMember], flags: FlagSet) -> Option<CodePointSet> {
    let mut set = CodePointSet::new();
    for (i, member) in members.iter().enumerate() {
        let part = match &member.kind {
            ClassMemberKind::NestedClass(nested) if nested.negated => {
                let contents = positive_set(&nested.members, flags)?;
                let siblings_inside = members
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .all(|(_, sibling)| {
                        plain_member_set(sibling, flags)
                            .is_some_and(|s| s.intersection(&contents) == s)
                    });
                if !siblings_inside {
                    return None;
                }
                contents.complement()
            }
            _ => member_set(member, flags)?,
        };
        set = set.union(&part);
    }
    Some(set)
}

/// Like [`member_set`], but refuses nested negated classes.
fn plain_member_set(member: &ClassMember, flags: FlagSet) -> Option<CodePointSet> {
    match &member.kind {
        ClassMemberKind::NestedClass(nested) if nested.negated => None,
        _ => member_set(member, flags),
    }
}

/// Effective membership of one class member (case folding applied), or
/// `None` when it cannot be resolved.
pub fn member_set(member: &ClassMember, flags: FlagSet) -> Option<CodePointSet> {
    let raw = match &member.kind {
        ClassMemberKind::SingleChar { ch, .. } => CodePointSet::single(*ch),
        ClassMemberKind::Range(lo, hi) => CodePointSet::range(*lo, *hi),
        ClassMemberKind::Shorthand(shorthand) => shorthand_set(shorthand, flags)?,
        // Folding already happened inside.
        ClassMemberKind::NestedClass(nested) => return class_set(nested, flags),
        ClassMemberKind::Intersection(_) => return None,
    };
    Some(fold_for(raw, flags))
}

/// Membership of a single-character atom outside a class.
pub fn literal_set(ch: char, flags: FlagSet) -> CodePointSet {
    fold_for(CodePointSet::single(ch), flags)
}

/// Membership of a node that consumes exactly one character: a literal, a
/// shorthand or a class. `None` for anything else or when opaque.
pub fn atom_set(node: &Node) -> Option<CodePointSet> {
    match &node.kind {
        NodeKind::Literal(ch) => Some(literal_set(*ch, node.flags)),
        NodeKind::Shorthand(shorthand) => {
            shorthand_set(shorthand, node.flags).map(|set| fold_for(set, node.flags))
        }
        NodeKind::CharacterClass(class) => class_set(class, node.flags),
        _ => None,
    }
}

fn fold_for(set: CodePointSet, flags: FlagSet) -> CodePointSet {
    if flags.contains(FlagSet::CASE_INSENSITIVE) {
        set.case_fold(flags.unicode_case())
    } else {
        set
    }
}

/// Closed-form membership of a shorthand, or `None` when it depends on
/// Unicode tables.
pub fn shorthand_set(shorthand: &Shorthand, flags: FlagSet) -> Option<CodePointSet> {
    let unicode_classes = flags.contains(FlagSet::UNICODE_CHARACTER_CLASS);
    let ranges: &[(u32, u32)] = match &shorthand.kind {
        ShorthandKind::Digit | ShorthandKind::Word | ShorthandKind::Space if unicode_classes => {
            return None
        }
        ShorthandKind::Digit => &[(0x30, 0x39)],
        ShorthandKind::Word => &[(0x30, 0x39), (0x41, 0x5A), (0x5F, 0x5F), (0x61, 0x7A)],
        ShorthandKind::Space => &[(0x09, 0x0D), (0x20, 0x20)],
        ShorthandKind::HorizontalSpace => &[
            (0x09, 0x09),
            (0x20, 0x20),
            (0xA0, 0xA0),
            (0x1680, 0x1680),
            (0x180E, 0x180E),
            (0x2000, 0x200A),
            (0x202F, 0x202F),
            (0x205F, 0x205F),
            (0x3000, 0x3000),
        ],
        ShorthandKind::VerticalSpace => &[(0x0A, 0x0D), (0x85, 0x85), (0x2028, 0x2029)],
        ShorthandKind::Posix(_) if unicode_classes => return None,
        ShorthandKind::Posix(name) => posix_ranges(name)?,
        ShorthandKind::Property(_) => return None,
    };
    let set = CodePointSet::from_ranges(ranges.iter().copied());
    Some(if shorthand.negated { set.complement() } else { set })
}

fn posix_ranges(name: &str) -> Option<&'static [(u32, u32)]> {
    let ranges: &'static [(u32, u32)] = match name {
        "Lower" => &[(0x61, 0x7A)],
        "Upper" => &[(0x41, 0x5A)],
        "ASCII" => &[(0x00, 0x7F)],
        "Alpha" => &[(0x41, 0x5A), (0x61, 0x7A)],
        "Digit" => &[(0x30, 0x39)],
        "Alnum" => &[(0x30, 0x39), (0x41, 0x5A), (0x61, 0x7A)],
        "Punct" => &[(0x21, 0x2F), (0x3A, 0x40), (0x5B, 0x60), (0x7B, 0x7E)],
        "Graph" => &[(0x21, 0x7E)],
        "Print" => &[(0x20, 0x7E)],
        "Blank" => &[(0x09, 0x09), (0x20, 0x20)],
        "Cntrl" => &[(0x00, 0x1F), (0x7F, 0x7F)],
        "XDigit" => &[(0x30, 0x39), (0x41, 0x46), (0x61, 0x66)],
        "Space" => &[(0x09, 0x0D), (0x20, 0x20)],
        _ => return None,
    };
    Some(ranges)
}

fn collect_shorthands(members: &[ClassMember], out: &mut Vec<Shorthand>) {
    for member in members {
        match &member.kind {
            ClassMemberKind::Shorthand(shorthand) => out.push(shorthand.clone()),
            ClassMemberKind::NestedClass(nested) => collect_shorthands(&nested.members, out),
            ClassMemberKind::Intersection(operands) => {
                for operand in operands {
                    collect_shorthands(operand, out);
                }
            }
            _ => {}
        }
    }
}

/// Clusters are read off runs of adjacent, unescaped single characters.
/// Escaped code points never join a cluster.
fn find_clusters(members: &[ClassMember]) -> Vec<GraphemeCluster> {
    let mut clusters = Vec::new();
    let mut run: Vec<(char, Span)> = Vec::new();
    for member in members {
        match &member.kind {
            ClassMemberKind::SingleChar { ch, escaped: false } => {
                if run.last().is_some_and(|(_, span)| span.end != member.span.start) {
                    flush_run(&mut run, &mut clusters);
                }
                run.push((*ch, member.span));
            }
            ClassMemberKind::NestedClass(nested) => {
                flush_run(&mut run, &mut clusters);
                clusters.extend(find_clusters(&nested.members));
            }
            ClassMemberKind::Intersection(operands) => {
                flush_run(&mut run, &mut clusters);
                for operand in operands {
                    clusters.extend(find_clusters(operand));
                }
            }
            _ => flush_run(&mut run, &mut clusters),
        }
    }
    flush_run(&mut run, &mut clusters);
    clusters.sort_by_key(|cluster| cluster.span);
    clusters
}

fn flush_run(run: &mut Vec<(char, Span)>, clusters: &mut Vec<GraphemeCluster>) {
    if run.len() > 1 {
        let text: String = run.iter().map(|(c, _)| *c).collect();
        let mut index = 0;
        for grapheme in text.graphemes(true) {
            let count = grapheme.chars().count();
            // "\r\n" is a grapheme too, but not one anybody means to write.
            if count > 1 && !grapheme.is_ascii() {
                clusters.push(GraphemeCluster {
                    span: Span::new(run[index].1.start, run[index + count - 1].1.end),
                    text: grapheme.to_string(),
                });
            }
            index += count;
        }
    }
    run.clear();
}
