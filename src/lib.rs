//! View composition engine
//!
//! Compiles named UI view trees from a base definition, single-inheritance
//! child views and independently authored extensions that patch the tree
//! through restricted path selectors. Results are cached by a fingerprint of
//! every input and invalidated per view, per plugin scope or globally.

pub mod cache;
pub mod compiler;
pub mod engine;
pub mod error;
pub mod model;
pub mod patch;
pub mod resolver;
pub mod selector;
pub mod store;
pub mod validation;

// Re-export main types
pub use cache::{CacheConfig, CacheStats, Fingerprint};
pub use compiler::Compiler;
pub use engine::ViewEngine;
pub use error::{EngineError, EngineResult, StoreError, ValidationError};
pub use model::{
    CompileLog, CompiledArtifact, Condition, ConditionOperator, Context, Extension, LogLevel,
    Node, Operation, Patch, TokenEdit, ViewContent, ViewSource,
};
pub use selector::{NodeRef, Selector, SelectorError};
pub use store::{MemorySourceStore, SourceBundle, SourceProvider};
