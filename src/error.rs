//! Error types for the view composition engine

use crate::model::Operation;
use crate::selector::SelectorError;
use thiserror::Error;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Hard failures that block rendering of a view.
///
/// Per-patch problems are not errors at this level; they land in the
/// artifact's compile log instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// No active view source with this name
    #[error("View '{name}' not found")]
    ViewNotFound {
        /// The missing view
        name: String,
    },

    /// The parent chain revisits a name
    #[error("Circular inheritance: {}", .cycle.join(" -> "))]
    CircularInheritance {
        /// Cycle members in visit order, closing name repeated at the end
        cycle: Vec<String>,
    },

    /// The root of the chain carries inheritance directives instead of a tree
    #[error("View '{view}' has no base content to inherit from")]
    MissingBaseContent {
        /// Root view of the chain
        view: String,
    },

    /// The chain is longer than the configured limit
    #[error("Inheritance chain of '{view}' exceeds {limit} levels")]
    InheritanceTooDeep {
        /// View being resolved
        view: String,
        /// Configured limit
        limit: usize,
    },

    /// Canonical serialization failed while fingerprinting
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Source or artifact store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl EngineError {
    /// Create a view not found error
    pub fn view_not_found(name: impl Into<String>) -> Self {
        Self::ViewNotFound { name: name.into() }
    }

    /// Create a missing base content error
    pub fn missing_base_content(view: impl Into<String>) -> Self {
        Self::MissingBaseContent { view: view.into() }
    }
}

/// Persistence failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A stored artifact row could not be decoded
    #[error("Artifact for '{view}' is corrupted: {reason}")]
    Corrupted {
        /// View whose row is unreadable
        view: String,
        /// Decoder message
        reason: String,
    },

    /// Any other backend failure
    #[error("{0}")]
    Backend(String),
}

impl StoreError {
    /// Create a corrupted-row error
    pub fn corrupted(view: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Corrupted {
            view: view.into(),
            reason: reason.into(),
        }
    }
}

/// Write-time problems with an extension or view source
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Selector does not parse
    #[error("Malformed selector '{selector}': {error}")]
    MalformedSelector {
        /// The selector text
        selector: String,
        /// Parser error
        #[source]
        error: SelectorError,
    },

    /// Structural operation without a payload
    #[error("Operation '{operation}' requires a payload")]
    MissingPayload {
        /// The operation
        operation: Operation,
    },

    /// `attributes` operation without (or with an empty) edit descriptor
    #[error("Operation 'attributes' requires an attribute-edit descriptor")]
    MissingAttributeEdits,

    /// `wrap` payload that can never be applied
    #[error("Wrap payload must be a single container node: {reason}")]
    InvalidWrapPayload {
        /// What was wrong
        reason: String,
    },

    /// Extension without a target view
    #[error("Extension target name is empty")]
    EmptyTargetName,

    /// `matches` condition with an invalid regular expression
    #[error("Condition on '{field}' has an invalid pattern '{pattern}': {reason}")]
    InvalidConditionPattern {
        /// Context field
        field: String,
        /// Offending pattern
        pattern: String,
        /// Regex compiler message
        reason: String,
    },

    /// View naming itself as parent
    #[error("View '{view}' inherits from itself")]
    SelfInheritance {
        /// The view
        view: String,
    },

    /// Parentless view carrying inheritance directives
    #[error("View '{view}' has inheritance directives but no parent")]
    MissingBaseContent {
        /// The view
        view: String,
    },

    /// Problem inside one inheritance directive of a view
    #[error("Directive #{index}: {error}")]
    Directive {
        /// Position of the directive
        index: usize,
        /// The underlying problem
        error: Box<ValidationError>,
    },
}
