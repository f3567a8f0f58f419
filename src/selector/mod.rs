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

//! Path selectors
//!
//! A deliberately small grammar: one element type and at most one
//! attribute-equality predicate.
//!
//! ```text
//! selector := ["//"] type [ "[" ["@"] attr "=" value "]" ]
//! type     := word | "*"
//! value    := word | quoted string
//! ```
//!
//! Both `field[name=amount]` and `//field[@name="amount"]` are accepted and
//! mean the same thing. Matching walks the tree depth-first in document
//! order, root included.

#![warn(missing_docs)]

pub mod error;
pub mod node_ref;
pub mod span;
pub mod tokenizer;

pub use error::{SelectorError, SelectorResult};
pub use node_ref::NodeRef;
pub use span::Spanned;
pub use tokenizer::{Token, Tokenizer, tokenize};

use crate::model::Node;
use std::fmt;
use std::str::FromStr;

/// Element-type test of a selector
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeTest {
    /// `*`: any node
    Any,
    /// A node kind (`field`, `group`, `column` or a container kind)
    Kind(String),
}

/// Attribute-equality predicate
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Predicate {
    /// Attribute name; `name` compares against the node's own name
    pub attribute: String,
    /// Required value
    pub value: String,
}

/// Parsed selector
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selector {
    /// Element-type test
    pub node_type: TypeTest,
    /// Optional predicate
    pub predicate: Option<Predicate>,
}

impl Selector {
    /// Parse a selector expression
    pub fn parse(input: &str) -> SelectorResult<Self> {
        if input.trim().is_empty() {
            return Err(SelectorError::Empty);
        }
        let tokens = tokenize(input)?;
        SelectorParser::new(tokens).parse()
    }

    /// Whether `node` satisfies this selector
    pub fn matches(&self, node: &Node) -> bool {
        if let TypeTest::Kind(kind) = &self.node_type {
            if node.kind() != kind {
                return false;
            }
        }

        match &self.predicate {
            None => true,
            Some(Predicate { attribute, value }) if attribute == "name" => {
                node.name() == Some(value.as_str())
            }
            Some(Predicate { attribute, value }) => node.attr(attribute) == Some(value.as_str()),
        }
    }

    /// All matching locations, in document order
    pub fn select(&self, root: &Node) -> Vec<NodeRef> {
        let mut matches = Vec::new();
        self.walk(root, |node_ref| {
            matches.push(node_ref);
            true
        });
        matches
    }

    /// The first matching location in document order
    pub fn select_first(&self, root: &Node) -> Option<NodeRef> {
        let mut found = None;
        self.walk(root, |node_ref| {
            found = Some(node_ref);
            false
        });
        found
    }

    /// Pre-order traversal; `visit` returns `false` to stop
    fn walk<F>(&self, root: &Node, mut visit: F)
    where
        F: FnMut(NodeRef) -> bool,
    {
        let mut stack = vec![(root, NodeRef::root())];
        while let Some((node, node_ref)) = stack.pop() {
            if self.matches(node) && !visit(node_ref.clone()) {
                return;
            }
            if let Some(children) = node.children() {
                for (index, child) in children.iter().enumerate().rev() {
                    stack.push((child, node_ref.child(index)));
                }
            }
        }
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "//")?;
        match &self.node_type {
            TypeTest::Any => write!(f, "*")?,
            TypeTest::Kind(kind) => write!(f, "{kind}")?,
        }
        if let Some(predicate) = &self.predicate {
            let escaped = predicate.value.replace('\\', "\\\\").replace('"', "\\\"");
            write!(f, "[@{}=\"{}\"]", predicate.attribute, escaped)?;
        }
        Ok(())
    }
}

/// Recursive-descent parser over selector tokens
struct SelectorParser<'input> {
    tokens: Vec<Spanned<Token<'input>>>,
    position: usize,
}

impl<'input> SelectorParser<'input> {
    fn new(tokens: Vec<Spanned<Token<'input>>>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    fn peek(&self) -> Option<&Spanned<Token<'input>>> {
        self.tokens.get(self.position)
    }

    fn next(&mut self, expected: &str) -> SelectorResult<Spanned<Token<'input>>> {
        let token = self
            .tokens
            .get(self.position)
            .cloned()
            .ok_or_else(|| SelectorError::unexpected_end(expected))?;
        self.position += 1;
        Ok(token)
    }

    fn parse(mut self) -> SelectorResult<Selector> {
        if matches!(self.peek().map(|t| &t.value), Some(Token::DoubleSlash)) {
            self.position += 1;
        }

        let type_token = self.next("element type")?;
        let node_type = match type_token.value {
            Token::Star => TypeTest::Any,
            Token::Word(kind) => TypeTest::Kind(kind.to_string()),
            Token::Slash | Token::DoubleSlash => {
                return Err(SelectorError::UnsupportedPathStep {
                    position: type_token.start,
                });
            }
            other => {
                return Err(SelectorError::unexpected_token(
                    "element type",
                    other.to_string(),
                    type_token.start,
                ));
            }
        };

        let predicate = match self.peek().map(|t| &t.value) {
            Some(Token::LeftBracket) => {
                self.position += 1;
                Some(self.parse_predicate()?)
            }
            _ => None,
        };

        if let Some(trailing) = self.peek() {
            return Err(match trailing.value {
                Token::LeftBracket => SelectorError::MultiplePredicates {
                    position: trailing.start,
                },
                Token::Slash | Token::DoubleSlash => SelectorError::UnsupportedPathStep {
                    position: trailing.start,
                },
                ref other => SelectorError::unexpected_token(
                    "end of selector",
                    other.to_string(),
                    trailing.start,
                ),
            });
        }

        Ok(Selector {
            node_type,
            predicate,
        })
    }

    fn parse_predicate(&mut self) -> SelectorResult<Predicate> {
        if matches!(self.peek().map(|t| &t.value), Some(Token::At)) {
            self.position += 1;
        }

        let attr_token = self.next("attribute name")?;
        let attribute = match attr_token.value {
            Token::Word(word) => word.to_string(),
            other => {
                return Err(SelectorError::unexpected_token(
                    "attribute name",
                    other.to_string(),
                    attr_token.start,
                ));
            }
        };

        let equal = self.next("'='")?;
        if equal.value != Token::Equal {
            return Err(SelectorError::unexpected_token(
                "'='",
                equal.value.to_string(),
                equal.start,
            ));
        }

        let value_token = self.next("attribute value")?;
        let value = match value_token.value {
            Token::Word(word) => word.to_string(),
            Token::String(value) => value.into_owned(),
            other => {
                return Err(SelectorError::unexpected_token(
                    "attribute value",
                    other.to_string(),
                    value_token.start,
                ));
            }
        };

        let close = self.next("']'")?;
        if close.value != Token::RightBracket {
            return Err(SelectorError::unexpected_token(
                "']'",
                close.value.to_string(),
                close.start,
            ));
        }

        Ok(Predicate { attribute, value })
    }
}

/// Parse `selector` and return every match in `tree`, in document order
pub fn select(tree: &Node, selector: &str) -> SelectorResult<Vec<NodeRef>> {
    Ok(Selector::parse(selector)?.select(tree))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn order_form() -> Node {
        Node::group(
            "order",
            vec![
                Node::field("partner").with_attr("widget", "many2one"),
                Node::group(
                    "totals",
                    vec![
                        Node::field("subtotal").with_attr("widget", "monetary"),
                        Node::field("tax").with_attr("widget", "monetary"),
                    ],
                ),
                Node::container("notebook_page", "notes", vec![Node::field("note")]),
            ],
        )
    }

    #[rstest]
    #[case("field[name=subtotal]")]
    #[case("//field[@name=\"subtotal\"]")]
    #[case("//field[@name='subtotal']")]
    #[case("  field [ name = subtotal ] ")]
    fn test_equivalent_forms(#[case] input: &str) {
        let selector = Selector::parse(input).unwrap();
        assert_eq!(selector.node_type, TypeTest::Kind("field".to_string()));
        assert_eq!(
            selector.predicate,
            Some(Predicate {
                attribute: "name".to_string(),
                value: "subtotal".to_string()
            })
        );
        assert_eq!(selector.to_string(), "//field[@name=\"subtotal\"]");
    }

    #[test]
    fn test_first_match_in_document_order() {
        let tree = order_form();
        let selector = Selector::parse("field[widget=monetary]").unwrap();

        let all = selector.select(&tree);
        assert_eq!(
            all,
            vec![NodeRef::from_indices(&[1, 0]), NodeRef::from_indices(&[1, 1])]
        );
        assert_eq!(selector.select_first(&tree), Some(NodeRef::from_indices(&[1, 0])));
    }

    #[test]
    fn test_root_is_a_candidate() {
        let tree = order_form();
        assert_eq!(
            select(&tree, "group[name=order]").unwrap(),
            vec![NodeRef::root()]
        );
    }

    #[test]
    fn test_container_kind_and_wildcard() {
        let tree = order_form();
        assert_eq!(
            select(&tree, "notebook_page").unwrap(),
            vec![NodeRef::from_indices(&[2])]
        );
        assert_eq!(
            select(&tree, "*[name=note]").unwrap(),
            vec![NodeRef::from_indices(&[2, 0])]
        );
        assert_eq!(select(&tree, "*").unwrap().len(), tree.node_count());
    }

    #[test]
    fn test_no_match() {
        let tree = order_form();
        assert!(select(&tree, "field[name=discount]").unwrap().is_empty());
        assert!(select(&tree, "column").unwrap().is_empty());
    }

    #[rstest]
    #[case("", SelectorError::Empty)]
    #[case("   ", SelectorError::Empty)]
    #[case("group/field", SelectorError::UnsupportedPathStep { position: 5 })]
    #[case("/group", SelectorError::UnsupportedPathStep { position: 0 })]
    #[case("field[name=a][widget=b]", SelectorError::MultiplePredicates { position: 13 })]
    #[case("field[name]", SelectorError::unexpected_token("'='", "']'", 10))]
    #[case("field[name=", SelectorError::unexpected_end("attribute value"))]
    #[case("field[name=a", SelectorError::unexpected_end("']'"))]
    #[case("[name=a]", SelectorError::unexpected_token("element type", "'['", 0))]
    #[case("field name", SelectorError::unexpected_token("end of selector", "'name'", 6))]
    fn test_rejected_selectors(#[case] input: &str, #[case] expected: SelectorError) {
        assert_eq!(Selector::parse(input), Err(expected));
    }
}
