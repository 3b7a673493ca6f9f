//! Surfaces parser diagnostics as issues.

use super::{AnalysisContext, RegexIssue, Rule};

pub fn check(ctx: &AnalysisContext<'_>) -> Vec<RegexIssue> {
    ctx.tree
        .diagnostics
        .iter()
        .map(|diagnostic| {
            RegexIssue::new(Rule::SyntaxValidity, diagnostic.message(), diagnostic.span)
        })
        .collect()
}
