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

//! Extension (patch) records

use super::node::Node;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The eight patch primitives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    /// Insert payload as siblings before the match
    Before,
    /// Insert payload as siblings after the match
    After,
    /// Replace the match with the payload
    Replace,
    /// Delete the match
    Remove,
    /// Prepend payload to the match's children
    InsideFirst,
    /// Append payload to the match's children
    InsideLast,
    /// Wrap the match in the payload container
    Wrap,
    /// Token-level attribute edits on the match
    Attributes,
}

impl Operation {
    /// All operations in declaration order
    pub const ALL: [Operation; 8] = [
        Operation::Before,
        Operation::After,
        Operation::Replace,
        Operation::Remove,
        Operation::InsideFirst,
        Operation::InsideLast,
        Operation::Wrap,
        Operation::Attributes,
    ];

    /// Wire name of the operation
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Before => "before",
            Operation::After => "after",
            Operation::Replace => "replace",
            Operation::Remove => "remove",
            Operation::InsideFirst => "insideFirst",
            Operation::InsideLast => "insideLast",
            Operation::Wrap => "wrap",
            Operation::Attributes => "attributes",
        }
    }

    /// Whether the operation needs a content payload
    pub fn requires_payload(&self) -> bool {
        !matches!(self, Operation::Remove | Operation::Attributes)
    }

    /// Whether the operation needs an attribute-edit descriptor
    pub fn requires_attribute_edits(&self) -> bool {
        matches!(self, Operation::Attributes)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| format!("unknown operation '{s}'"))
    }
}

/// Tokens to add to and remove from one attribute
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenEdit {
    /// Tokens union-added first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub add: Vec<String>,
    /// Tokens removed afterwards
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove: Vec<String>,
}

impl TokenEdit {
    /// Create an edit from add/remove token lists
    pub fn new<A, R>(add: A, remove: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            add: add.into_iter().map(Into::into).collect(),
            remove: remove.into_iter().map(Into::into).collect(),
        }
    }
}

/// Attribute-edit descriptor, keyed by attribute name
pub type AttributeEdits = BTreeMap<String, TokenEdit>;

/// A single selector-targeted edit.
///
/// Shared by extensions and by inheritance directives of child views.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patch {
    /// Path selector expression
    pub selector: String,
    /// Edit primitive
    pub operation: Operation,
    /// Content forest for structural operations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Vec<Node>>,
    /// Descriptor for the `attributes` operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_edits: Option<AttributeEdits>,
}

impl Patch {
    /// Create a patch without payload
    pub fn new(selector: impl Into<String>, operation: Operation) -> Self {
        Self {
            selector: selector.into(),
            operation,
            payload: None,
            attribute_edits: None,
        }
    }

    /// Attach a content payload
    pub fn with_payload(mut self, payload: Vec<Node>) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Add one attribute edit
    pub fn with_attribute_edit(mut self, attribute: impl Into<String>, edit: TokenEdit) -> Self {
        self.attribute_edits
            .get_or_insert_with(AttributeEdits::new)
            .insert(attribute.into(), edit);
        self
    }
}

/// Comparison applied by a [`Condition`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConditionOperator {
    /// Equal
    Eq,
    /// Not equal
    Ne,
    /// Context value is a member of the given array
    In,
    /// Context value is not a member of the given array
    NotIn,
    /// Greater than
    Gt,
    /// Greater than or equal
    Gte,
    /// Less than
    Lt,
    /// Less than or equal
    Lte,
    /// Field presence (`value` is the expected boolean, default `true`)
    Exists,
    /// Array membership or substring
    Contains,
    /// Regular expression match
    Matches,
    /// Plugin-defined operator this engine does not know; always passes
    Other(String),
}

impl ConditionOperator {
    /// Wire name of the operator
    pub fn as_str(&self) -> &str {
        match self {
            ConditionOperator::Eq => "eq",
            ConditionOperator::Ne => "ne",
            ConditionOperator::In => "in",
            ConditionOperator::NotIn => "not_in",
            ConditionOperator::Gt => "gt",
            ConditionOperator::Gte => "gte",
            ConditionOperator::Lt => "lt",
            ConditionOperator::Lte => "lte",
            ConditionOperator::Exists => "exists",
            ConditionOperator::Contains => "contains",
            ConditionOperator::Matches => "matches",
            ConditionOperator::Other(name) => name,
        }
    }
}

impl From<String> for ConditionOperator {
    fn from(value: String) -> Self {
        match value.as_str() {
            "eq" | "=" | "==" => ConditionOperator::Eq,
            "ne" | "!=" => ConditionOperator::Ne,
            "in" => ConditionOperator::In,
            "not_in" | "not in" => ConditionOperator::NotIn,
            "gt" | ">" => ConditionOperator::Gt,
            "gte" | ">=" => ConditionOperator::Gte,
            "lt" | "<" => ConditionOperator::Lt,
            "lte" | "<=" => ConditionOperator::Lte,
            "exists" => ConditionOperator::Exists,
            "contains" => ConditionOperator::Contains,
            "matches" => ConditionOperator::Matches,
            _ => ConditionOperator::Other(value),
        }
    }
}

impl From<ConditionOperator> for String {
    fn from(value: ConditionOperator) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Predicate over the evaluation context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Dotted path into the context (`user.company`)
    pub field: String,
    /// Comparison to perform
    pub operator: ConditionOperator,
    /// Right-hand operand
    #[serde(default)]
    pub value: Value,
}

impl Condition {
    /// Create a condition
    pub fn new(
        field: impl Into<String>,
        operator: ConditionOperator,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }
}

fn default_active() -> bool {
    true
}

/// Ordered, conditionally-active patch against one view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    /// Insertion id; final ordering tie-breaker
    pub id: u64,
    /// Name of the view this extension patches
    pub target_name: String,
    /// The edit itself
    #[serde(flatten)]
    pub patch: Patch,
    /// Primary ordering key (ascending)
    #[serde(default)]
    pub priority: i32,
    /// Secondary ordering key (ascending)
    #[serde(default)]
    pub sequence: i32,
    /// Predicates, all of which must pass
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    /// Inactive extensions never apply
    #[serde(default = "default_active")]
    pub active: bool,
    /// Revision marker
    #[serde(default)]
    pub updated_at: u64,
    /// Owning plugin, used for invalidation grouping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_scope: Option<String>,
}

impl Extension {
    /// Create an active extension with default ordering
    pub fn new(
        id: u64,
        target_name: impl Into<String>,
        selector: impl Into<String>,
        operation: Operation,
    ) -> Self {
        Self {
            id,
            target_name: target_name.into(),
            patch: Patch::new(selector, operation),
            priority: 0,
            sequence: 0,
            conditions: Vec::new(),
            active: true,
            updated_at: 0,
            plugin_scope: None,
        }
    }

    /// Attach a content payload
    pub fn with_payload(mut self, payload: Vec<Node>) -> Self {
        self.patch.payload = Some(payload);
        self
    }

    /// Add one attribute edit
    pub fn with_attribute_edit(mut self, attribute: impl Into<String>, edit: TokenEdit) -> Self {
        self.patch = self.patch.with_attribute_edit(attribute, edit);
        self
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the sequence
    pub fn with_sequence(mut self, sequence: i32) -> Self {
        self.sequence = sequence;
        self
    }

    /// Add a condition
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
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

    /// Total ordering key `(priority, sequence, id)`
    pub fn ordering_key(&self) -> (i32, i32, u64) {
        (self.priority, self.sequence, self.id)
    }
}
