//! Data model for view composition
//!
//! Views, extensions, the tree node type they share, and the compiled
//! artifacts produced from them.

#![warn(missing_docs)]

pub mod artifact;
pub mod extension;
pub mod node;
pub mod view;

pub use artifact::{CompileLog, CompiledArtifact, LogEntry, LogLevel};
pub use extension::{
    AttributeEdits, Condition, ConditionOperator, Extension, Operation, Patch, TokenEdit,
};
pub use node::{Attributes, Node};
pub use view::{ViewContent, ViewSource};

/// Evaluation context consulted by extension conditions
pub type Context = serde_json::Map<String, serde_json::Value>;
