//! Error types for selector parsing

use thiserror::Error;

/// Result type for selector operations
pub type SelectorResult<T> = Result<T, SelectorError>;

/// Errors raised while parsing a selector expression
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    /// Blank selector
    #[error("Selector is empty")]
    Empty,

    /// Character outside the selector alphabet
    #[error("Unexpected character '{character}' at position {position}")]
    UnexpectedCharacter {
        /// The offending character
        character: char,
        /// Byte offset in the input
        position: usize,
    },

    /// Quoted value without closing quote
    #[error("Unterminated string starting at position {position}")]
    UnterminatedString {
        /// Byte offset of the opening quote
        position: usize,
    },

    /// Token did not fit the grammar
    #[error("Expected {expected}, found {found} at position {position}")]
    UnexpectedToken {
        /// What the grammar wanted
        expected: String,
        /// What was found
        found: String,
        /// Byte offset in the input
        position: usize,
    },

    /// Input ended early
    #[error("Expected {expected}, found end of selector")]
    UnexpectedEnd {
        /// What the grammar wanted
        expected: String,
    },

    /// More than one `[...]` predicate
    #[error("Only a single predicate is supported (second predicate at position {position})")]
    MultiplePredicates {
        /// Byte offset of the second predicate
        position: usize,
    },

    /// Multi-step path such as `group/field`
    #[error("Path steps are not supported (at position {position})")]
    UnsupportedPathStep {
        /// Byte offset of the step separator
        position: usize,
    },
}

impl SelectorError {
    /// Create an unexpected token error
    pub fn unexpected_token(
        expected: impl Into<String>,
        found: impl Into<String>,
        position: usize,
    ) -> Self {
        Self::UnexpectedToken {
            expected: expected.into(),
            found: found.into(),
            position,
        }
    }

    /// Create an unexpected end error
    pub fn unexpected_end(expected: impl Into<String>) -> Self {
        Self::UnexpectedEnd {
            expected: expected.into(),
        }
    }
}
