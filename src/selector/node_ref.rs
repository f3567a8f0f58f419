//! Addressable locations inside a view tree

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Child-index path from the root to a node.
///
/// The empty path addresses the root itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeRef {
    path: SmallVec<[usize; 8]>,
}

impl NodeRef {
    /// Reference to the root
    pub fn root() -> Self {
        Self::default()
    }

    /// Reference built from explicit indices
    pub fn from_indices(indices: &[usize]) -> Self {
        Self {
            path: SmallVec::from_slice(indices),
        }
    }

    /// Reference to the `index`-th child of this node
    pub fn child(&self, index: usize) -> Self {
        let mut path = self.path.clone();
        path.push(index);
        Self { path }
    }

    /// Parent reference and this node's index within it; `None` for the root
    pub fn parent(&self) -> Option<(NodeRef, usize)> {
        let (&index, rest) = self.path.split_last()?;
        Some((NodeRef::from_indices(rest), index))
    }

    /// Whether this references the root
    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Distance from the root
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Raw child indices
    pub fn indices(&self) -> &[usize] {
        &self.path
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/")?;
        let parts: Vec<String> = self.path.iter().map(usize::to_string).collect();
        write!(f, "{}", parts.join("/"))
    }
}
