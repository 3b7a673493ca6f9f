//! Independent checks over one parsed pattern.
//!
//! Every analyzer is a pure function of an [`AnalysisContext`]: it walks the
//! immutable tree and returns issues in source order. None of them runs when
//! the pattern has syntax diagnostics, except [`Rule::SyntaxValidity`].

pub mod anchor_precedence;
pub mod duplicate_in_class;
pub mod empty_line_multiline;
pub mod empty_string_repetition;
pub mod grapheme_cluster;
pub mod reluctant_quantifier;
pub mod syntax_validity;
pub mod unicode_aware_class;

use crate::ast::Span;
use crate::parser::ParseResult;
use crate::source::ConsumptionMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rule {
    SyntaxValidity,
    AnchorPrecedence,
    DuplicateInClass,
    ReluctantQuantifier,
    EmptyStringRepetition,
    GraphemeCluster,
    UnicodeAwareClass,
    EmptyLineMultiline,
}

impl Rule {
    /// Every rule, in run order.
    pub const ALL: [Rule; 8] = [
        Rule::SyntaxValidity,
        Rule::AnchorPrecedence,
        Rule::DuplicateInClass,
        Rule::ReluctantQuantifier,
        Rule::EmptyStringRepetition,
        Rule::GraphemeCluster,
        Rule::UnicodeAwareClass,
        Rule::EmptyLineMultiline,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Rule::SyntaxValidity => "regex-syntax",
            Rule::AnchorPrecedence => "regex-anchor-precedence",
            Rule::DuplicateInClass => "regex-duplicate-in-class",
            Rule::ReluctantQuantifier => "regex-reluctant-quantifier",
            Rule::EmptyStringRepetition => "regex-empty-string-repetition",
            Rule::GraphemeCluster => "regex-grapheme-cluster",
            Rule::UnicodeAwareClass => "regex-unicode-aware-class",
            Rule::EmptyLineMultiline => "regex-empty-line-multiline",
        }
    }

    pub fn from_id(id: &str) -> Option<Rule> {
        Rule::ALL.into_iter().find(|rule| rule.id() == id)
    }

    pub fn check(self, ctx: &AnalysisContext<'_>) -> Vec<RegexIssue> {
        match self {
            Rule::SyntaxValidity => syntax_validity::check(ctx),
            Rule::AnchorPrecedence => anchor_precedence::check(ctx),
            Rule::DuplicateInClass => duplicate_in_class::check(ctx),
            Rule::ReluctantQuantifier => reluctant_quantifier::check(ctx),
            Rule::EmptyStringRepetition => empty_string_repetition::check(ctx),
            Rule::GraphemeCluster => grapheme_cluster::check(ctx),
            Rule::UnicodeAwareClass => unicode_aware_class::check(ctx),
            Rule::EmptyLineMultiline => empty_line_multiline::check(ctx),
        }
    }
}

/// A problem located in the decoded pattern text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegexIssue {
    pub rule: Rule,
    pub message: String,
    pub primary: Span,
    pub secondary: Vec<SecondaryLocation>,
}

impl RegexIssue {
    pub fn new(rule: Rule, message: impl Into<String>, primary: Span) -> Self {
        Self {
            rule,
            message: message.into(),
            primary,
            secondary: Vec::new(),
        }
    }

    pub fn with_secondary(mut self, span: Span, message: Option<&str>) -> Self {
        self.secondary.push(SecondaryLocation {
            span,
            message: message.map(str::to_string),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryLocation {
    pub span: Span,
    pub message: Option<String>,
}

pub struct AnalysisContext<'a> {
    pub text: &'a str,
    pub tree: &'a ParseResult,
    pub consumption: ConsumptionMode,
}

/// Runs `rules` in order. A pattern with syntax diagnostics only gets
/// [`Rule::SyntaxValidity`].
pub fn run(rules: &[Rule], ctx: &AnalysisContext<'_>) -> Vec<RegexIssue> {
    if !ctx.tree.is_valid() {
        tracing::debug!(
            diagnostics = ctx.tree.diagnostics.len(),
            "pattern has syntax errors, structural checks skipped"
        );
    }
    let mut issues = Vec::new();
    for &rule in rules {
        if !ctx.tree.is_valid() && rule != Rule::SyntaxValidity {
            continue;
        }
        let found = rule.check(ctx);
        tracing::trace!(rule = rule.id(), issues = found.len(), "analyzer finished");
        issues.extend(found);
    }
    issues
}
