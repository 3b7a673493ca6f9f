//! ASCII-only letter ranges and predefined classes in a pattern that never
//! turns on Unicode character classes.

use crate::ast::{ClassMember, ClassMemberKind, NodeKind, Shorthand, ShorthandKind, Span};
use crate::flags::FlagSet;

use super::{AnalysisContext, RegexIssue, Rule};

const POSIX_ASCII_ONLY: [&str; 9] = [
    "Lower", "Upper", "Alpha", "Alnum", "Punct", "Graph", "Print", "Blank", "Space",
];

#[derive(Default)]
struct Occurrences {
    ranges: Vec<Span>,
    predefined: Vec<Span>,
}

pub fn check(ctx: &AnalysisContext<'_>) -> Vec<RegexIssue> {
    let mut found = Occurrences::default();
    ctx.tree.root.walk(&mut |node| {
        if node.flags.contains(FlagSet::UNICODE_CHARACTER_CLASS) {
            return;
        }
        match &node.kind {
            NodeKind::Shorthand(shorthand) if is_ascii_predefined(shorthand) => {
                found.predefined.push(node.span)
            }
            NodeKind::CharacterClass(class) => collect_members(&class.members, &mut found),
            _ => {}
        }
    });

    let mut issues = Vec::new();
    issues.extend(report(
        &found.ranges,
        "Replace this character range with a Unicode-aware character class.",
        "Replace these character ranges with Unicode-aware character classes.",
    ));
    issues.extend(report(
        &found.predefined,
        "Enable the \"(?U)\" flag or use a Unicode-aware alternative.",
        "Enable the \"(?U)\" flag or use Unicode-aware alternatives.",
    ));
    issues
}

fn collect_members(members: &[ClassMember], found: &mut Occurrences) {
    for member in members {
        match &member.kind {
            ClassMemberKind::Range(lo, hi) if is_alphabet(*lo, *hi) => {
                found.ranges.push(member.span)
            }
            ClassMemberKind::Shorthand(shorthand) if is_ascii_predefined(shorthand) => {
                found.predefined.push(member.span)
            }
            ClassMemberKind::NestedClass(nested) => collect_members(&nested.members, found),
            ClassMemberKind::Intersection(operands) => {
                for operand in operands {
                    collect_members(operand, found);
                }
            }
            _ => {}
        }
    }
}

fn is_alphabet(lo: char, hi: char) -> bool {
    matches!((lo, hi), ('a', 'z') | ('A', 'Z'))
}

fn is_ascii_predefined(shorthand: &Shorthand) -> bool {
    match &shorthand.kind {
        ShorthandKind::Word | ShorthandKind::Space => true,
        ShorthandKind::Posix(name) => POSIX_ASCII_ONLY.contains(&name.as_str()),
        _ => false,
    }
}

fn report(spans: &[Span], singular: &str, plural: &str) -> Option<RegexIssue> {
    let (first, rest) = spans.split_first()?;
    let message = if rest.is_empty() { singular } else { plural };
    Some(rest.iter().fold(
        RegexIssue::new(Rule::UnicodeAwareClass, message, *first),
        |issue, span| issue.with_secondary(*span, None),
    ))
}
