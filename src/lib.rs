pub mod analyzers;
pub mod ast;
pub mod class;
pub mod config;
pub mod diagnostic;
pub mod errors;
pub mod flags;
pub mod logging;
pub mod parser;
pub mod source;

use rayon::prelude::*;

pub use analyzers::{RegexIssue, Rule};
pub use config::AnalysisConfig;
pub use diagnostic::Finding;
pub use errors::{ConfigError, SyntaxError};
pub use flags::FlagSet;
pub use source::{ConsumptionMode, PatternSite, PatternSource, ResolvedPattern};

/// Parses patterns and runs the configured rules over them.
#[derive(Debug, Clone)]
pub struct RegexChecker {
    rules: Vec<Rule>,
    max_depth: usize,
}

impl RegexChecker {
    pub fn new(config: &AnalysisConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            rules: config.active_rules()?,
            max_depth: config.effective_max_nesting_depth(),
        })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Issues for one pattern, located by byte offsets into `text`.
    pub fn check_pattern(
        &self,
        text: &str,
        flags: FlagSet,
        consumption: ConsumptionMode,
    ) -> Vec<RegexIssue> {
        let tree = parser::Parser::new(text, flags)
            .with_max_depth(self.max_depth)
            .parse();
        let ctx = analyzers::AnalysisContext {
            text,
            tree: &tree,
            consumption,
        };
        analyzers::run(&self.rules, &ctx)
    }

    /// Findings for one call site, located in its source.
    pub fn check_site(&self, site: &PatternSite) -> Vec<Finding> {
        let PatternSource::Known(pattern) = &site.source else {
            tracing::debug!("pattern not statically known, site skipped");
            return Vec::new();
        };
        let issues = self.check_pattern(&pattern.text, site.flags, site.consumption);
        diagnostic::assemble(issues, pattern)
    }

    /// Checks independent sites in parallel. One result per site, in input order.
    pub fn check_sites(&self, sites: &[PatternSite]) -> Vec<Vec<Finding>> {
        sites.par_iter().map(|site| self.check_site(site)).collect()
    }
}

impl Default for RegexChecker {
    fn default() -> Self {
        Self {
            rules: Rule::ALL.to_vec(),
            max_depth: parser::DEFAULT_MAX_DEPTH,
        }
    }
}

/// Runs every rule over `text` with the default configuration.
pub fn check_pattern(text: &str, flags: FlagSet, consumption: ConsumptionMode) -> Vec<RegexIssue> {
    RegexChecker::default().check_pattern(text, flags, consumption)
}
