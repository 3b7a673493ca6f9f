//! Analysis configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analyzers::Rule;
use crate::errors::ConfigError;
use crate::parser::DEFAULT_MAX_DEPTH;

/// Which rules run and how deep the parser may nest.
///
/// ```toml
/// max_nesting_depth = 64
/// disabled_rules = ["regex-unicode-aware-class"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Group and class nesting allowed before parsing halts. Default: 128.
    pub max_nesting_depth: Option<usize>,
    /// Rule ids to run. Empty means every rule.
    pub enabled_rules: Vec<String>,
    /// Rule ids to skip, applied after `enabled_rules`.
    pub disabled_rules: Vec<String>,
}

impl AnalysisConfig {
    pub fn effective_max_nesting_depth(&self) -> usize {
        self.max_nesting_depth.unwrap_or(DEFAULT_MAX_DEPTH)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// The rules to run, in run order.
    pub fn active_rules(&self) -> Result<Vec<Rule>, ConfigError> {
        let enabled = lookup(&self.enabled_rules)?;
        let disabled = lookup(&self.disabled_rules)?;
        Ok(Rule::ALL
            .into_iter()
            .filter(|rule| enabled.is_empty() || enabled.contains(rule))
            .filter(|rule| !disabled.contains(rule))
            .collect())
    }
}

fn lookup(ids: &[String]) -> Result<Vec<Rule>, ConfigError> {
    ids.iter()
        .map(|id| Rule::from_id(id).ok_or_else(|| ConfigError::UnknownRule(id.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_run_everything() {
        let config = AnalysisConfig::default();
        assert_eq!(config.effective_max_nesting_depth(), 128);
        assert_eq!(config.active_rules().unwrap(), Rule::ALL.to_vec());
    }

    #[test]
    fn enabled_and_disabled() {
        let config = AnalysisConfig::from_toml_str(
            r#"
            max_nesting_depth = 32
            enabled_rules = [
                "regex-empty-string-repetition",
                "regex-syntax",
                "regex-grapheme-cluster",
            ]
            disabled_rules = ["regex-grapheme-cluster"]
            "#,
        )
        .unwrap();
        assert_eq!(config.effective_max_nesting_depth(), 32);
        // Run order wins over the listed order.
        assert_eq!(
            config.active_rules().unwrap(),
            vec![Rule::SyntaxValidity, Rule::EmptyStringRepetition]
        );
    }

    #[test]
    fn unknown_rule_id() {
        let config = AnalysisConfig {
            disabled_rules: vec!["regex-nope".to_string()],
            ..Default::default()
        };
        match config.active_rules() {
            Err(ConfigError::UnknownRule(id)) => assert_eq!(id, "regex-nope"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn malformed_toml() {
        assert!(matches!(
            AnalysisConfig::from_toml_str("max_nesting_depth = \"deep\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
