//! View source records

use super::extension::Patch;
use super::node::Node;
use serde::{Deserialize, Serialize};

/// Content carried by a view source
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewContent {
    /// A complete tree; required for the root of an inheritance chain
    Tree(Node),
    /// Patches against the parent's compiled output
    Inherit(Vec<Patch>),
}

fn default_active() -> bool {
    true
}

/// Named, versioned UI description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSource {
    /// Unique, stable key
    pub name: String,
    /// Tree or inheritance directives
    pub content: ViewContent,
    /// Single-inheritance parent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
    /// Inactive sources are invisible to compilation
    #[serde(default = "default_active")]
    pub active: bool,
    /// Revision marker
    #[serde(default)]
    pub updated_at: u64,
    /// Owning plugin, used for invalidation grouping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_scope: Option<String>,
}

impl ViewSource {
    /// Create a root view from a tree
    pub fn root(name: impl Into<String>, tree: Node) -> Self {
        Self {
            name: name.into(),
            content: ViewContent::Tree(tree),
            parent_name: None,
            active: true,
            updated_at: 0,
            plugin_scope: None,
        }
    }

    /// Create a child view whose content patches the parent's output
    pub fn inheriting(
        name: impl Into<String>,
        parent: impl Into<String>,
        patches: Vec<Patch>,
    ) -> Self {
        Self {
            name: name.into(),
            content: ViewContent::Inherit(patches),
            parent_name: Some(parent.into()),
            active: true,
            updated_at: 0,
            plugin_scope: None,
        }
    }

    /// Set the owning plugin scope
    pub fn in_scope(mut self, scope: impl Into<String>) -> Self {
        self.plugin_scope = Some(scope.into());
        self
    }

    /// Set the revision marker
    pub fn at_revision(mut self, updated_at: u64) -> Self {
        self.updated_at = updated_at;
        self
    }

    /// Mark inactive
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}
