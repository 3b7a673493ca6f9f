//! Classes match one code point at a time, so `[è]` written as `e` plus a
//! combining grave accent matches either half but never the whole letter.

use crate::ast::NodeKind;
use crate::class;

use super::{AnalysisContext, RegexIssue, Rule};

pub fn check(ctx: &AnalysisContext<'_>) -> Vec<RegexIssue> {
    let mut issues = Vec::new();
    ctx.tree.root.walk(&mut |node| {
        let NodeKind::CharacterClass(class) = &node.kind else {
            return;
        };
        let clusters = class::resolve(class, node.flags).clusters;
        if clusters.is_empty() {
            return;
        }
        let plural = if clusters.len() == 1 { "" } else { "s" };
        let message = format!(
            "Extract {} grapheme cluster{plural} from this character class.",
            clusters.len()
        );
        let issue = clusters.iter().fold(
            RegexIssue::new(Rule::GraphemeCluster, message, node.span),
            |issue, cluster| issue.with_secondary(cluster.span, None),
        );
        issues.push(issue);
    });
    issues
}
