//! Error types.
//!
//! A malformed pattern is not an error of this crate: the parser records a
//! [`SyntaxError`] per problem and analysis degrades to "no finding". Only
//! loading configuration can fail.

use std::fmt;
use std::path::PathBuf;

/// What the parser saw where it expected something else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Found {
    Char(char),
    End,
}

impl fmt::Display for Found {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Found::Char(c) => write!(f, "'{c}'"),
            Found::End => write!(f, "the end of the regex"),
        }
    }
}

/// Kinds of syntax problems. `Display` is the user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxError {
    #[error("Expected {expected}, but found {found}")]
    Expected { expected: &'static str, found: Found },

    #[error("Unmatched closing ')'")]
    UnmatchedClosingParen,

    #[error("Unexpected quantifier '{0}'")]
    UnexpectedQuantifier(char),

    #[error("Illegal character range")]
    IllegalCharacterRange,

    #[error("Illegal repetition range")]
    IllegalRepetitionRange,

    #[error("Invalid code point")]
    InvalidCodePoint,

    #[error("Nesting depth exceeds the limit of {0}")]
    NestingTooDeep(usize),
}

/// Errors that can occur while loading an [`AnalysisConfig`](crate::config::AnalysisConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Unknown rule id: {0}")]
    UnknownRule(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_messages() {
        let err = SyntaxError::Expected {
            expected: "')'",
            found: Found::End,
        };
        assert_eq!(err.to_string(), "Expected ')', but found the end of the regex");

        let err = SyntaxError::Expected {
            expected: "'}'",
            found: Found::Char(','),
        };
        assert_eq!(err.to_string(), "Expected '}', but found ','");
    }
}
