//! `(?m)^$` searched for with a first-match call finds the first empty line,
//! but also matches the empty input and the position after a final line
//! terminator, which is rarely what a caller checking for empty lines wants.

use crate::ast::{AnchorKind, FlagGroupScope, Node, NodeKind};
use crate::flags::FlagSet;
use crate::source::ConsumptionMode;

use super::{AnalysisContext, RegexIssue, Rule};

const MESSAGE: &str = "Remove MULTILINE mode or change the regex.";

pub fn check(ctx: &AnalysisContext<'_>) -> Vec<RegexIssue> {
    if ctx.consumption != ConsumptionMode::FirstMatch {
        return Vec::new();
    }
    let root = &ctx.tree.root;
    if is_empty_line(root) {
        vec![RegexIssue::new(Rule::EmptyLineMultiline, MESSAGE, root.span)]
    } else {
        Vec::new()
    }
}

fn is_empty_line(node: &Node) -> bool {
    let significant: Vec<&Node> = node
        .items()
        .iter()
        .filter(|item| !item.is_unscoped_flag_group())
        .collect();
    match significant.as_slice() {
        [only] => match &only.kind {
            NodeKind::Group { kind, body } if !kind.is_lookaround() => is_empty_line(body),
            NodeKind::FlagGroup {
                scope: FlagGroupScope::Body(body),
                ..
            } => is_empty_line(body),
            _ => false,
        },
        [start, end] => {
            matches!(start.kind, NodeKind::Anchor(AnchorKind::LineStart))
                && start.flags.contains(FlagSet::MULTILINE)
                && matches!(end.kind, NodeKind::Anchor(AnchorKind::LineEnd))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn reported(pattern: &str, flags: FlagSet, consumption: ConsumptionMode) -> bool {
        let tree = parse(pattern, flags);
        let ctx = AnalysisContext {
            text: pattern,
            tree: &tree,
            consumption,
        };
        !check(&ctx).is_empty()
    }

    #[test]
    fn multiline_empty_line_with_find() {
        let find = ConsumptionMode::FirstMatch;
        assert!(reported("^$", FlagSet::MULTILINE, find));
        assert!(reported("(?m)^$", FlagSet::empty(), find));
        assert!(reported("(^$)", FlagSet::MULTILINE, find));
        assert!(reported("(?m:^$)", FlagSet::empty(), find));
        assert!(reported("(?:(?m)^$)", FlagSet::empty(), find));
    }

    #[test]
    fn not_reported() {
        let find = ConsumptionMode::FirstMatch;
        assert!(!reported("^$", FlagSet::empty(), find));
        assert!(!reported("^$", FlagSet::MULTILINE, ConsumptionMode::FullMatch));
        assert!(!reported("^$", FlagSet::MULTILINE, ConsumptionMode::Unknown));
        assert!(!reported("^a$", FlagSet::MULTILINE, find));
        assert!(!reported("^$|x", FlagSet::MULTILINE, find));
        assert!(!reported("(?=^$)", FlagSet::MULTILINE, find));
    }
}
