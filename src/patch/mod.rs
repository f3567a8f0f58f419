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

//! Patch primitives
//!
//! Each operation is validated completely before the tree is touched, so a
//! failed patch leaves its input unchanged.

pub mod attributes;
pub mod error;

pub use attributes::{apply_attribute_edits, edit_tokens};
pub use error::{PatchError, PatchResult};

use crate::model::{Node, Operation, Patch};
use crate::selector::NodeRef;

/// Apply `patch` at `at`, returning the edited copy of `tree`
pub fn apply(tree: &Node, at: &NodeRef, patch: &Patch) -> PatchResult<Node> {
    let mut edited = tree.clone();
    apply_in_place(&mut edited, at, patch)?;
    Ok(edited)
}

/// Apply `patch` at `at` directly on `tree`.
///
/// On error `tree` is left exactly as it was.
pub fn apply_in_place(tree: &mut Node, at: &NodeRef, patch: &Patch) -> PatchResult<()> {
    let target = tree
        .descendant(at.indices())
        .ok_or_else(|| invalid_reference(at))?;

    match patch.operation {
        Operation::Attributes => {
            let edits = patch
                .attribute_edits
                .as_ref()
                .ok_or(PatchError::MissingAttributeEdits)?;
            let target = target_mut(tree, at)?;
            apply_attribute_edits(target.attrs_mut(), edits);
        }

        Operation::Remove => {
            let (parent, index) = at.parent().ok_or(PatchError::RootSibling {
                operation: Operation::Remove,
            })?;
            siblings_mut(tree, &parent, at)?.remove(index);
        }

        op @ (Operation::Before | Operation::After) => {
            let payload = require_payload(patch)?;
            let (parent, index) = at.parent().ok_or(PatchError::RootSibling { operation: op })?;
            let position = if op == Operation::Before { index } else { index + 1 };
            siblings_mut(tree, &parent, at)?.splice(position..position, payload.iter().cloned());
        }

        Operation::Replace => {
            let payload = require_payload(patch)?;
            match at.parent() {
                None => match payload {
                    [single] => *tree = single.clone(),
                    _ => {
                        return Err(PatchError::ReplaceRootArity {
                            count: payload.len(),
                        });
                    }
                },
                Some((parent, index)) => {
                    siblings_mut(tree, &parent, at)?.splice(index..=index, payload.iter().cloned());
                }
            }
        }

        op @ (Operation::InsideFirst | Operation::InsideLast) => {
            let payload = require_payload(patch)?;
            if !target.is_container() {
                return Err(PatchError::NotAContainer {
                    node: target.to_string(),
                });
            }
            let target = target_mut(tree, at)?;
            if let Some(children) = target.children_mut() {
                if op == Operation::InsideFirst {
                    children.splice(0..0, payload.iter().cloned());
                } else {
                    children.extend(payload.iter().cloned());
                }
            }
        }

        Operation::Wrap => {
            let payload = require_payload(patch)?;
            let wrapper = match payload {
                [single] if single.is_container() => single.clone(),
                [single] => {
                    return Err(PatchError::invalid_wrap_payload(format!(
                        "'{single}' cannot hold children"
                    )));
                }
                _ => {
                    return Err(PatchError::invalid_wrap_payload(format!(
                        "expected one node, got {}",
                        payload.len()
                    )));
                }
            };
            let slot = target_mut(tree, at)?;
            let original = std::mem::replace(slot, wrapper);
            if let Some(children) = slot.children_mut() {
                children.clear();
                children.push(original);
            }
        }
    }

    Ok(())
}

fn require_payload(patch: &Patch) -> PatchResult<&[Node]> {
    patch
        .payload
        .as_deref()
        .ok_or(PatchError::MissingPayload {
            operation: patch.operation,
        })
}

fn invalid_reference(at: &NodeRef) -> PatchError {
    PatchError::InvalidReference {
        path: at.to_string(),
    }
}

fn target_mut<'a>(tree: &'a mut Node, at: &NodeRef) -> PatchResult<&'a mut Node> {
    tree.descendant_mut(at.indices())
        .ok_or_else(|| invalid_reference(at))
}

fn siblings_mut<'a>(
    tree: &'a mut Node,
    parent: &NodeRef,
    at: &NodeRef,
) -> PatchResult<&'a mut Vec<Node>> {
    tree.descendant_mut(parent.indices())
        .and_then(Node::children_mut)
        .ok_or_else(|| invalid_reference(at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TokenEdit;
    use pretty_assertions::assert_eq;

    fn totals() -> Node {
        Node::group(
            "form",
            vec![Node::group(
                "totals",
                vec![Node::field("subtotal"), Node::field("total")],
            )],
        )
    }

    fn subtotal() -> NodeRef {
        NodeRef::from_indices(&[0, 0])
    }

    fn totals_ref() -> NodeRef {
        NodeRef::from_indices(&[0])
    }

    fn patch(op: Operation, payload: Vec<Node>) -> Patch {
        Patch::new("unused", op).with_payload(payload)
    }

    fn names(tree: &Node, at: &[usize]) -> Vec<String> {
        tree.descendant(at)
            .and_then(Node::children)
            .unwrap_or_default()
            .iter()
            .map(|n| n.name().unwrap_or("?").to_string())
            .collect()
    }

    #[test]
    fn test_before_and_after_preserve_payload_order() {
        let tree = totals();
        let payload = vec![Node::field("a"), Node::field("b")];

        let before = apply(&tree, &subtotal(), &patch(Operation::Before, payload.clone())).unwrap();
        assert_eq!(names(&before, &[0]), vec!["a", "b", "subtotal", "total"]);

        let after = apply(&tree, &subtotal(), &patch(Operation::After, payload)).unwrap();
        assert_eq!(names(&after, &[0]), vec!["subtotal", "a", "b", "total"]);
    }

    #[test]
    fn test_replace_and_remove() {
        let tree = totals();
        let replaced = apply(
            &tree,
            &subtotal(),
            &patch(Operation::Replace, vec![Node::field("x"), Node::field("y")]),
        )
        .unwrap();
        assert_eq!(names(&replaced, &[0]), vec!["x", "y", "total"]);

        let removed = apply(&tree, &subtotal(), &Patch::new("unused", Operation::Remove)).unwrap();
        assert_eq!(names(&removed, &[0]), vec!["total"]);
    }

    #[test]
    fn test_inside_first_and_last() {
        let tree = totals();
        let first = apply(
            &tree,
            &totals_ref(),
            &patch(Operation::InsideFirst, vec![Node::field("a")]),
        )
        .unwrap();
        assert_eq!(names(&first, &[0]), vec!["a", "subtotal", "total"]);

        let last = apply(
            &tree,
            &totals_ref(),
            &patch(Operation::InsideLast, vec![Node::field("z")]),
        )
        .unwrap();
        assert_eq!(names(&last, &[0]), vec!["subtotal", "total", "z"]);
    }

    #[test]
    fn test_inside_on_leaf_fails() {
        let tree = totals();
        let err = apply(
            &tree,
            &subtotal(),
            &patch(Operation::InsideLast, vec![Node::field("a")]),
        )
        .unwrap_err();
        assert_eq!(
            err,
            PatchError::NotAContainer {
                node: "field(subtotal)".to_string()
            }
        );
    }

    #[test]
    fn test_wrap_makes_match_the_sole_child() {
        let tree = totals();
        let wrapper =
            Node::group("boxed", vec![Node::field("discarded")]).with_attr("class", "card");
        let wrapped = apply(&tree, &subtotal(), &patch(Operation::Wrap, vec![wrapper])).unwrap();

        assert_eq!(names(&wrapped, &[0]), vec!["boxed", "total"]);
        assert_eq!(names(&wrapped, &[0, 0]), vec!["subtotal"]);
        assert_eq!(
            wrapped.descendant(&[0, 0]).and_then(|n| n.attr("class")),
            Some("card")
        );
    }

    #[test]
    fn test_wrap_rejects_leaf_and_forest_payloads() {
        let tree = totals();
        assert!(matches!(
            apply(&tree, &subtotal(), &patch(Operation::Wrap, vec![Node::field("f")])),
            Err(PatchError::InvalidWrapPayload { .. })
        ));
        assert!(matches!(
            apply(
                &tree,
                &subtotal(),
                &patch(
                    Operation::Wrap,
                    vec![Node::group("a", vec![]), Node::group("b", vec![])]
                )
            ),
            Err(PatchError::InvalidWrapPayload { .. })
        ));
    }

    #[test]
    fn test_wrap_root() {
        let tree = totals();
        let wrapped = apply(
            &tree,
            &NodeRef::root(),
            &patch(Operation::Wrap, vec![Node::group("outer", vec![])]),
        )
        .unwrap();
        assert_eq!(wrapped.name(), Some("outer"));
        assert_eq!(names(&wrapped, &[]), vec!["form"]);
    }

    #[test]
    fn test_root_sibling_operations_fail() {
        let tree = totals();
        let root = NodeRef::root();
        assert_eq!(
            apply(&tree, &root, &Patch::new("unused", Operation::Remove)),
            Err(PatchError::RootSibling {
                operation: Operation::Remove
            })
        );
        assert_eq!(
            apply(&tree, &root, &patch(Operation::After, vec![Node::field("x")])),
            Err(PatchError::RootSibling {
                operation: Operation::After
            })
        );
        assert_eq!(
            apply(&tree, &root, &patch(Operation::Replace, vec![])),
            Err(PatchError::ReplaceRootArity { count: 0 })
        );

        let replaced = apply(
            &tree,
            &root,
            &patch(Operation::Replace, vec![Node::group("new", vec![])]),
        )
        .unwrap();
        assert_eq!(replaced.name(), Some("new"));
    }

    #[test]
    fn test_attribute_edit() {
        let tree = totals();
        let edit = Patch::new("unused", Operation::Attributes)
            .with_attribute_edit("class", TokenEdit::new(["highlight"], Vec::<String>::new()));
        let edited = apply(&tree, &totals_ref(), &edit).unwrap();
        assert_eq!(edited.descendant(&[0]).and_then(|n| n.attr("class")), Some("highlight"));
    }

    #[test]
    fn test_missing_inputs() {
        let tree = totals();
        assert_eq!(
            apply(&tree, &subtotal(), &Patch::new("unused", Operation::After)),
            Err(PatchError::MissingPayload {
                operation: Operation::After
            })
        );
        assert_eq!(
            apply(&tree, &subtotal(), &Patch::new("unused", Operation::Attributes)),
            Err(PatchError::MissingAttributeEdits)
        );
    }

    #[test]
    fn test_stale_reference_leaves_tree_untouched() {
        let mut tree = totals();
        let original = tree.clone();
        let err = apply_in_place(
            &mut tree,
            &NodeRef::from_indices(&[0, 9]),
            &Patch::new("unused", Operation::Remove),
        )
        .unwrap_err();
        assert_eq!(
            err,
            PatchError::InvalidReference {
                path: "/0/9".to_string()
            }
        );
        assert_eq!(tree, original);
    }
}
