//! Turns pattern-offset issues into findings located in source.

use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::analyzers::RegexIssue;
use crate::source::{ResolvedPattern, SourceSpan};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub rule_id: String,
    pub primary_message: String,
    pub primary_span: SourceSpan,
    pub secondary: Vec<SecondaryFinding>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecondaryFinding {
    pub span: SourceSpan,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Maps every issue onto the source of `pattern`, dropping repeated
/// (rule, location, message) triples. Order is preserved.
pub fn assemble(issues: Vec<RegexIssue>, pattern: &ResolvedPattern) -> Vec<Finding> {
    let mut seen = FxHashSet::default();
    let mut findings = Vec::with_capacity(issues.len());
    for issue in issues {
        let mut primary = pattern.map_span(issue.primary).into_iter();
        let Some(primary_span) = primary.next() else {
            tracing::warn!(
                rule = issue.rule.id(),
                start = issue.primary.start,
                end = issue.primary.end,
                "issue location is outside the mapped pattern text, dropped"
            );
            continue;
        };
        if !seen.insert((issue.rule, primary_span, issue.message.clone())) {
            continue;
        }

        let mut secondary: Vec<SecondaryFinding> = primary
            .map(|span| SecondaryFinding {
                span,
                message: None,
            })
            .collect();
        for location in issue.secondary {
            let spans = pattern.map_span(location.span);
            if spans.is_empty() {
                tracing::warn!(
                    rule = issue.rule.id(),
                    start = location.span.start,
                    end = location.span.end,
                    "secondary location could not be mapped"
                );
            }
            secondary.extend(spans.into_iter().map(|span| SecondaryFinding {
                span,
                message: location.message.clone(),
            }));
        }

        findings.push(Finding {
            rule_id: issue.rule.id().to_string(),
            primary_message: issue.message,
            primary_span,
            secondary,
        });
    }
    findings
}
