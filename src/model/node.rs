// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! View tree node types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Attribute map carried by every node.
///
/// Ordered so that serialized trees (and therefore fingerprints) are stable.
pub type Attributes = BTreeMap<String, String>;

/// Element of a view description tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    /// Input field (leaf)
    Field {
        /// Selector match key
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        /// Presentation attributes
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        attrs: Attributes,
    },

    /// List or table column (leaf)
    Column {
        /// Selector match key
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        /// Presentation attributes
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        attrs: Attributes,
    },

    /// Generic grouping container
    Group {
        /// Selector match key
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        /// Presentation attributes
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        attrs: Attributes,
        /// Ordered child nodes
        #[serde(default)]
        children: Vec<Node>,
    },

    /// Host-defined container kind (kanban card, search filter, notebook page, ...)
    Container {
        /// Container kind, used as the selector element type
        kind: String,
        /// Selector match key
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        /// Presentation attributes
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        attrs: Attributes,
        /// Ordered child nodes
        #[serde(default)]
        children: Vec<Node>,
    },
}

impl Node {
    /// Create a named field
    pub fn field(name: impl Into<String>) -> Self {
        Node::Field {
            name: Some(name.into()),
            attrs: Attributes::new(),
        }
    }

    /// Create a named column
    pub fn column(name: impl Into<String>) -> Self {
        Node::Column {
            name: Some(name.into()),
            attrs: Attributes::new(),
        }
    }

    /// Create a named group with children
    pub fn group(name: impl Into<String>, children: Vec<Node>) -> Self {
        Node::Group {
            name: Some(name.into()),
            attrs: Attributes::new(),
            children,
        }
    }

    /// Create a host-defined container
    pub fn container(
        kind: impl Into<String>,
        name: impl Into<String>,
        children: Vec<Node>,
    ) -> Self {
        Node::Container {
            kind: kind.into(),
            name: Some(name.into()),
            attrs: Attributes::new(),
            children,
        }
    }

    /// Builder-style attribute setter
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs_mut().insert(key.into(), value.into());
        self
    }

    /// Element type name used by selectors
    pub fn kind(&self) -> &str {
        match self {
            Node::Field { .. } => "field",
            Node::Column { .. } => "column",
            Node::Group { .. } => "group",
            Node::Container { kind, .. } => kind,
        }
    }

    /// Selector match key, if any
    pub fn name(&self) -> Option<&str> {
        match self {
            Node::Field { name, .. }
            | Node::Column { name, .. }
            | Node::Group { name, .. }
            | Node::Container { name, .. } => name.as_deref(),
        }
    }

    /// Node attributes
    pub fn attrs(&self) -> &Attributes {
        match self {
            Node::Field { attrs, .. }
            | Node::Column { attrs, .. }
            | Node::Group { attrs, .. }
            | Node::Container { attrs, .. } => attrs,
        }
    }

    /// Mutable node attributes
    pub fn attrs_mut(&mut self) -> &mut Attributes {
        match self {
            Node::Field { attrs, .. }
            | Node::Column { attrs, .. }
            | Node::Group { attrs, .. }
            | Node::Container { attrs, .. } => attrs,
        }
    }

    /// Look up a single attribute
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs().get(key).map(String::as_str)
    }

    /// Whether this node can hold children
    pub fn is_container(&self) -> bool {
        matches!(self, Node::Group { .. } | Node::Container { .. })
    }

    /// Children of a container node; `None` for leaves
    pub fn children(&self) -> Option<&[Node]> {
        match self {
            Node::Group { children, .. } | Node::Container { children, .. } => Some(children),
            Node::Field { .. } | Node::Column { .. } => None,
        }
    }

    /// Mutable children of a container node; `None` for leaves
    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Group { children, .. } | Node::Container { children, .. } => Some(children),
            Node::Field { .. } | Node::Column { .. } => None,
        }
    }

    /// Follow a child-index path from this node
    pub fn descendant(&self, path: &[usize]) -> Option<&Node> {
        let mut current = self;
        for &index in path {
            current = current.children()?.get(index)?;
        }
        Some(current)
    }

    /// Follow a child-index path from this node, mutably
    pub fn descendant_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        let mut current = self;
        for &index in path {
            current = current.children_mut()?.get_mut(index)?;
        }
        Some(current)
    }

    /// Total number of nodes in this subtree, including itself
    pub fn node_count(&self) -> usize {
        1 + self
            .children()
            .map(|children| children.iter().map(Node::node_count).sum::<usize>())
            .unwrap_or(0)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}({})", self.kind(), name),
            None => write!(f, "{}", self.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_and_name() {
        assert_eq!(Node::field("amount").kind(), "field");
        assert_eq!(Node::column("qty").kind(), "column");
        assert_eq!(Node::group("totals", vec![]).kind(), "group");
        let card = Node::container("kanban_card", "card", vec![]);
        assert_eq!(card.kind(), "kanban_card");
        assert_eq!(card.name(), Some("card"));
        assert_eq!(card.to_string(), "kanban_card(card)");
    }

    #[test]
    fn test_leaves_have_no_children() {
        let mut field = Node::field("amount");
        assert!(!field.is_container());
        assert!(field.children().is_none());
        assert!(field.children_mut().is_none());
    }

    #[test]
    fn test_descendant_paths() {
        let tree = Node::group(
            "root",
            vec![
                Node::field("a"),
                Node::group("inner", vec![Node::field("b"), Node::field("c")]),
            ],
        );

        assert_eq!(tree.descendant(&[]), Some(&tree));
        assert_eq!(tree.descendant(&[1, 1]).and_then(Node::name), Some("c"));
        assert!(tree.descendant(&[0, 0]).is_none());
        assert!(tree.descendant(&[5]).is_none());
        assert_eq!(tree.node_count(), 5);
    }

    #[test]
    fn test_serde_shape() {
        let node = Node::group(
            "totals",
            vec![Node::field("subtotal").with_attr("widget", "monetary")],
        );
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "group",
                "name": "totals",
                "children": [
                    {"type": "field", "name": "subtotal", "attrs": {"widget": "monetary"}}
                ]
            })
        );

        let back: Node = serde_json::from_value(value).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_container_deserializes_with_kind() {
        let node: Node = serde_json::from_value(json!({
            "type": "container",
            "kind": "search_filter",
            "name": "draft"
        }))
        .unwrap();
        assert_eq!(node.kind(), "search_filter");
        assert_eq!(node.children(), Some(&[][..]));
    }
}
