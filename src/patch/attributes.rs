//! Token-level attribute edits

use crate::model::{AttributeEdits, Attributes, TokenEdit};

/// Apply one add/remove edit to a whitespace-separated token list.
///
/// Existing order is kept, added tokens are appended in listed order, then
/// removals run. A token present in both lists ends up removed. Returns
/// `None` when no token remains.
pub fn edit_tokens(current: Option<&str>, edit: &TokenEdit) -> Option<String> {
    let mut tokens: Vec<&str> = Vec::new();
    for token in current.unwrap_or_default().split_whitespace() {
        if !tokens.contains(&token) {
            tokens.push(token);
        }
    }

    for token in edit.add.iter().flat_map(|t| t.split_whitespace()) {
        if !tokens.contains(&token) {
            tokens.push(token);
        }
    }

    let removed: Vec<&str> = edit.remove.iter().flat_map(|t| t.split_whitespace()).collect();
    tokens.retain(|token| !removed.contains(token));

    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" "))
    }
}

/// Apply every edit of a descriptor to an attribute map
pub fn apply_attribute_edits(attrs: &mut Attributes, edits: &AttributeEdits) {
    for (attribute, edit) in edits {
        match edit_tokens(attrs.get(attribute).map(String::as_str), edit) {
            Some(value) => {
                attrs.insert(attribute.clone(), value);
            }
            None => {
                attrs.remove(attribute);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_then_remove() {
        let edit = TokenEdit::new(["x", "y"], ["y"]);
        assert_eq!(edit_tokens(Some("x"), &edit), Some("x".to_string()));
    }

    #[test]
    fn test_union_keeps_existing_order() {
        let edit = TokenEdit::new(["c", "a", "d"], Vec::<String>::new());
        assert_eq!(edit_tokens(Some("a b"), &edit), Some("a b c d".to_string()));
    }

    #[test]
    fn test_removing_last_token_drops_attribute() {
        let mut attrs = Attributes::new();
        attrs.insert("class".to_string(), "hidden".to_string());

        let mut edits = AttributeEdits::new();
        edits.insert("class".to_string(), TokenEdit::new(Vec::<String>::new(), ["hidden"]));
        edits.insert("style".to_string(), TokenEdit::new(["bold"], Vec::<String>::new()));

        apply_attribute_edits(&mut attrs, &edits);
        assert!(!attrs.contains_key("class"));
        assert_eq!(attrs.get("style").map(String::as_str), Some("bold"));
    }

    #[test]
    fn test_duplicate_tokens_collapse() {
        let edit = TokenEdit::new(["a"], Vec::<String>::new());
        assert_eq!(edit_tokens(Some("a  a b"), &edit), Some("a b".to_string()));
    }
}
