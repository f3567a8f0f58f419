//! Error types for patch application

use crate::model::Operation;
use thiserror::Error;

/// Result type for patch operations
pub type PatchResult<T> = Result<T, PatchError>;

/// Reasons a single patch cannot be applied.
///
/// These never abort a compilation; the patch is skipped and the error is
/// recorded in the compile log.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// Structural operation without a payload
    #[error("Operation '{operation}' requires a payload")]
    MissingPayload {
        /// The operation
        operation: Operation,
    },

    /// `attributes` operation without an edit descriptor
    #[error("Operation 'attributes' requires an attribute-edit descriptor")]
    MissingAttributeEdits,

    /// Sibling operation aimed at the root
    #[error("Operation '{operation}' cannot target the root node")]
    RootSibling {
        /// The operation
        operation: Operation,
    },

    /// Replacing the root with anything other than exactly one node
    #[error("Replacing the root requires exactly one payload node, got {count}")]
    ReplaceRootArity {
        /// Payload node count
        count: usize,
    },

    /// `insideFirst`/`insideLast` aimed at a leaf
    #[error("Node '{node}' cannot hold children")]
    NotAContainer {
        /// Display form of the target node
        node: String,
    },

    /// `wrap` payload is not a single container node
    #[error("Wrap payload must be a single container node: {reason}")]
    InvalidWrapPayload {
        /// What was wrong
        reason: String,
    },

    /// Reference no longer resolves in the tree
    #[error("Node reference {path} does not resolve")]
    InvalidReference {
        /// Display form of the reference
        path: String,
    },
}

impl PatchError {
    /// Create an invalid wrap payload error
    pub fn invalid_wrap_payload(reason: impl Into<String>) -> Self {
        Self::InvalidWrapPayload {
            reason: reason.into(),
        }
    }
}
