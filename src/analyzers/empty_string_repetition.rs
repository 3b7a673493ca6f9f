//! Repeating something that can match the empty string: `(a*)*`, `(?:)+`,
//! `(a|)*`. Each extra iteration consumes nothing.

use crate::ast::{FlagGroupScope, Node, NodeKind};

use super::{AnalysisContext, RegexIssue, Rule};

const MESSAGE: &str = "Rework this part of the regex to not match the empty string.";

pub fn check(ctx: &AnalysisContext<'_>) -> Vec<RegexIssue> {
    let mut issues = Vec::new();
    ctx.tree.root.walk(&mut |node| {
        if let NodeKind::Quantifier { body, .. } = &node.kind {
            if can_match_empty(body) {
                issues.push(RegexIssue::new(Rule::EmptyStringRepetition, MESSAGE, node.span));
            }
        }
    });
    issues
}

fn can_match_empty(node: &Node) -> bool {
    match &node.kind {
        NodeKind::Empty | NodeKind::Anchor(_) => true,
        NodeKind::Concatenation(items) => items.iter().all(can_match_empty),
        NodeKind::Alternation(branches) => branches.iter().any(can_match_empty),
        NodeKind::Group { kind, body } => kind.is_lookaround() || can_match_empty(body),
        NodeKind::FlagGroup { scope, .. } => match scope {
            FlagGroupScope::Body(body) => can_match_empty(body),
            FlagGroupScope::WholeRemainder => true,
        },
        NodeKind::Quantifier { body, quantifier } => {
            quantifier.min == 0 || can_match_empty(body)
        }
        // Whether the referenced group can be empty is not tracked.
        NodeKind::Backreference(_) => false,
        NodeKind::CharacterClass(_)
        | NodeKind::Shorthand(_)
        | NodeKind::Dot
        | NodeKind::Literal(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::FlagSet;
    use crate::parser::parse;
    use crate::source::ConsumptionMode;

    fn spans(pattern: &str) -> Vec<(usize, usize)> {
        let tree = parse(pattern, FlagSet::empty());
        let ctx = AnalysisContext {
            text: pattern,
            tree: &tree,
            consumption: ConsumptionMode::Unknown,
        };
        check(&ctx)
            .iter()
            .map(|issue| (issue.primary.start, issue.primary.end))
            .collect()
    }

    #[test]
    fn empty_group_repeated() {
        assert_eq!(spans("(?:)*"), vec![(0, 5)]);
        assert_eq!(spans("x(a*)+"), vec![(1, 6)]);
        assert_eq!(spans("(a|)*"), vec![(0, 5)]);
        assert_eq!(spans("(?:^|\\b){2,}"), vec![(0, 12)]);
        assert_eq!(spans("(?=a)*"), vec![(0, 6)]);
    }

    #[test]
    fn nested_quantifiers_are_each_checked() {
        assert_eq!(spans("((?:)*)*"), vec![(0, 8), (1, 6)]);
    }

    #[test]
    fn optional_and_bounded_repetition_of_empty_bodies() {
        assert_eq!(spans("(a*)?"), vec![(0, 5)]);
        assert_eq!(spans("(?:)?"), vec![(0, 5)]);
        assert_eq!(spans("(a|)?"), vec![(0, 5)]);
        assert_eq!(spans("(a*){1}"), vec![(0, 7)]);
    }

    #[test]
    fn non_empty_bodies() {
        assert!(spans("(a)*").is_empty());
        assert!(spans("(a|b)+").is_empty());
        assert!(spans("a?b*").is_empty());
        assert!(spans("(a)\\1*").is_empty());
    }
}
