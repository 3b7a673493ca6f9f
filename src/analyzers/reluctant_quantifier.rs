//! Reluctant quantifiers that can be replaced by a possessive one because
//! what they repeat can never match what follows them.
//!
//! `<.+?>` backtracks on every character; `<[^>]++>` matches the same
//! strings without backtracking at all.

use crate::ast::{slice, Node, NodeKind, Quantifier, QuantifierMode, ShorthandKind};
use crate::class::{self, CodePointSet};

use super::{AnalysisContext, RegexIssue, Rule};

pub fn check(ctx: &AnalysisContext<'_>) -> Vec<RegexIssue> {
    let mut issues = Vec::new();
    ctx.tree.root.walk(&mut |node| {
        let NodeKind::Concatenation(items) = &node.kind else {
            return;
        };
        for pair in items.windows(2) {
            if let Some(replacement) = replacement(ctx.text, &pair[0], &pair[1]) {
                issues.push(RegexIssue::new(
                    Rule::ReluctantQuantifier,
                    format!("Replace this use of a reluctant quantifier with \"{replacement}\"."),
                    pair[0].span,
                ));
            }
        }
    });
    issues
}

fn replacement(text: &str, node: &Node, follower: &Node) -> Option<String> {
    let NodeKind::Quantifier { body, quantifier } = &node.kind else {
        return None;
    };
    if quantifier.mode != QuantifierMode::Reluctant {
        return None;
    }
    let (follower_set, follower_text) = follower_atom(text, follower)?;
    let repeated = match &body.kind {
        NodeKind::Dot => format!("[^{follower_text}]"),
        NodeKind::Literal(_) | NodeKind::Shorthand(_) | NodeKind::CharacterClass(_) => {
            let body_set = class::atom_set(body)?;
            if body_set.intersects(&follower_set) {
                return None;
            }
            slice(text, body.span).to_string()
        }
        _ => return None,
    };
    Some(format!("{repeated}{}", possessive(text, quantifier)))
}

/// The follower's membership and the text that denotes it inside `[^...]`.
fn follower_atom(text: &str, follower: &Node) -> Option<(CodePointSet, String)> {
    let source = slice(text, follower.span);
    let inner = match &follower.kind {
        NodeKind::Literal(_) if source.starts_with('\\') => source.to_string(),
        NodeKind::Literal(ch) => escape_in_class(*ch),
        NodeKind::CharacterClass(class) if !class.negated => {
            source.strip_prefix('[')?.strip_suffix(']')?.to_string()
        }
        NodeKind::Shorthand(shorthand)
            if !matches!(shorthand.kind, ShorthandKind::Property(_)) =>
        {
            source.to_string()
        }
        _ => return None,
    };
    Some((class::atom_set(follower)?, inner))
}

fn escape_in_class(ch: char) -> String {
    if matches!(ch, ']' | '\\' | '[' | '^' | '-' | '&') {
        format!("\\{ch}")
    } else {
        ch.to_string()
    }
}

/// `+?` becomes `++`, `{2,5}?` becomes `{2,5}+`.
fn possessive(text: &str, quantifier: &Quantifier) -> String {
    let operator = slice(text, quantifier.span);
    format!("{}+", operator.strip_suffix('?').unwrap_or(operator))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::FlagSet;
    use crate::parser::parse;
    use crate::source::ConsumptionMode;

    fn messages(pattern: &str) -> Vec<String> {
        let tree = parse(pattern, FlagSet::empty());
        let ctx = AnalysisContext {
            text: pattern,
            tree: &tree,
            consumption: ConsumptionMode::Unknown,
        };
        check(&ctx).into_iter().map(|issue| issue.message).collect()
    }

    #[test]
    fn dot_before_literal() {
        assert_eq!(
            messages("<.+?>"),
            vec!["Replace this use of a reluctant quantifier with \"[^>]++\"."]
        );
    }

    #[test]
    fn operator_forms() {
        assert_eq!(
            messages("\".*?\""),
            vec!["Replace this use of a reluctant quantifier with \"[^\"]*+\"."]
        );
        assert_eq!(
            messages("a.{2,5}?-"),
            vec!["Replace this use of a reluctant quantifier with \"[^\\-]{2,5}+\"."]
        );
        assert_eq!(
            messages("a??b"),
            vec!["Replace this use of a reluctant quantifier with \"a?+\"."]
        );
    }

    #[test]
    fn disjoint_body_keeps_its_text() {
        assert_eq!(
            messages("\\d+?x"),
            vec!["Replace this use of a reluctant quantifier with \"\\d++\"."]
        );
        assert_eq!(
            messages("[a-c]*?[x-z]"),
            vec!["Replace this use of a reluctant quantifier with \"[a-c]*+\"."]
        );
    }

    #[test]
    fn overlapping_or_unknown_follower() {
        assert!(messages("\\w+?a").is_empty());
        assert!(messages(".+?").is_empty());
        assert!(messages(".+?\\p{L}").is_empty());
        assert!(messages(".+?[^>]").is_empty());
        assert!(messages(".+>").is_empty());
    }
}
