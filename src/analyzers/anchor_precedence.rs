//! Anchors in a top-level alternation bind to one branch only: `^a|b` means
//! `(^a)|b`. Report the pattern when some branches are anchored and others
//! are not, or are anchored differently.

use crate::ast::{AnchorKind, Node, NodeKind};

use super::{AnalysisContext, RegexIssue, Rule};

const MESSAGE: &str =
    "Group parts of the regex together to make the intended operator precedence explicit.";

pub fn check(ctx: &AnalysisContext<'_>) -> Vec<RegexIssue> {
    let root = &ctx.tree.root;
    let NodeKind::Alternation(branches) = &root.kind else {
        return Vec::new();
    };
    let shapes: Vec<(bool, bool)> = branches.iter().map(anchoring).collect();
    let anchored = shapes.iter().any(|(start, end)| *start || *end);
    let uniform = shapes.windows(2).all(|pair| pair[0] == pair[1]);
    if anchored && !uniform {
        vec![RegexIssue::new(Rule::AnchorPrecedence, MESSAGE, root.span)]
    } else {
        Vec::new()
    }
}

/// Whether a branch starts with a start anchor and ends with an end anchor,
/// looking past `(?i)`-style directives.
fn anchoring(branch: &Node) -> (bool, bool) {
    let mut significant = branch
        .items()
        .iter()
        .filter(|node| !node.is_unscoped_flag_group());
    let first = significant.next();
    let last = significant.next_back().or(first);
    (
        is_anchor(first, AnchorKind::is_start),
        is_anchor(last, AnchorKind::is_end),
    )
}

fn is_anchor(node: Option<&Node>, test: fn(AnchorKind) -> bool) -> bool {
    matches!(node.map(|n| &n.kind), Some(NodeKind::Anchor(kind)) if test(*kind))
}
