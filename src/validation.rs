//! Write-time validation of extensions and view sources

use crate::error::ValidationError;
use crate::model::{ConditionOperator, Extension, Operation, Patch, ViewContent, ViewSource};
use crate::selector::Selector;

/// Check an extension before it is persisted as active.
///
/// Returns every problem found; an empty list means the extension is valid.
pub fn validate_extension(extension: &Extension) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if extension.target_name.trim().is_empty() {
        errors.push(ValidationError::EmptyTargetName);
    }

    validate_patch(&extension.patch, &mut errors);

    for condition in &extension.conditions {
        if condition.operator != ConditionOperator::Matches {
            continue;
        }
        let pattern = condition.value.as_str().unwrap_or_default();
        if let Err(err) = regex::Regex::new(pattern) {
            errors.push(ValidationError::InvalidConditionPattern {
                field: condition.field.clone(),
                pattern: pattern.to_string(),
                reason: err.to_string(),
            });
        }
    }

    errors
}

/// Check a view source before it is persisted
pub fn validate_view(view: &ViewSource) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if view.parent_name.as_deref() == Some(view.name.as_str()) {
        errors.push(ValidationError::SelfInheritance {
            view: view.name.clone(),
        });
    }

    if let ViewContent::Inherit(patches) = &view.content {
        if view.parent_name.is_none() {
            errors.push(ValidationError::MissingBaseContent {
                view: view.name.clone(),
            });
        }

        for (index, patch) in patches.iter().enumerate() {
            let mut patch_errors = Vec::new();
            validate_patch(patch, &mut patch_errors);
            errors.extend(patch_errors.into_iter().map(|error| ValidationError::Directive {
                index,
                error: Box::new(error),
            }));
        }
    }

    errors
}

/// Selector syntax and payload requirements of a single patch
pub fn validate_patch(patch: &Patch, errors: &mut Vec<ValidationError>) {
    if let Err(error) = Selector::parse(&patch.selector) {
        errors.push(ValidationError::MalformedSelector {
            selector: patch.selector.clone(),
            error,
        });
    }

    let operation = patch.operation;
    if operation.requires_payload() && patch.payload.is_none() {
        errors.push(ValidationError::MissingPayload { operation });
    }

    if operation.requires_attribute_edits()
        && patch
            .attribute_edits
            .as_ref()
            .is_none_or(|edits| edits.is_empty())
    {
        errors.push(ValidationError::MissingAttributeEdits);
    }

    if operation == Operation::Wrap {
        if let Some(payload) = &patch.payload {
            match payload.as_slice() {
                [single] if single.is_container() => {}
                [single] => errors.push(ValidationError::InvalidWrapPayload {
                    reason: format!("'{single}' cannot hold children"),
                }),
                other => errors.push(ValidationError::InvalidWrapPayload {
                    reason: format!("expected one node, got {}", other.len()),
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Condition, Node, TokenEdit};
    use rstest::rstest;

    #[rstest]
    #[case(Operation::Before)]
    #[case(Operation::After)]
    #[case(Operation::Replace)]
    #[case(Operation::InsideFirst)]
    #[case(Operation::InsideLast)]
    #[case(Operation::Wrap)]
    fn test_structural_operations_need_payload(#[case] operation: Operation) {
        let ext = Extension::new(1, "v", "field[name=a]", operation);
        assert_eq!(
            validate_extension(&ext),
            vec![ValidationError::MissingPayload { operation }]
        );
    }

    #[test]
    fn test_remove_needs_nothing() {
        let ext = Extension::new(1, "v", "field[name=a]", Operation::Remove);
        assert!(validate_extension(&ext).is_empty());
    }

    #[test]
    fn test_attributes_need_descriptor() {
        let ext = Extension::new(1, "v", "group", Operation::Attributes);
        assert_eq!(
            validate_extension(&ext),
            vec![ValidationError::MissingAttributeEdits]
        );

        let ext = ext.with_attribute_edit("class", TokenEdit::new(["a"], Vec::<String>::new()));
        assert!(validate_extension(&ext).is_empty());
    }

    #[test]
    fn test_malformed_selector() {
        let ext = Extension::new(1, "v", "group/field", Operation::Remove);
        let errors = validate_extension(&ext);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ValidationError::MalformedSelector { .. }));
    }

    #[test]
    fn test_wrap_payload_shape() {
        let ext =
            Extension::new(1, "v", "field", Operation::Wrap).with_payload(vec![Node::field("x")]);
        assert!(matches!(
            validate_extension(&ext).as_slice(),
            [ValidationError::InvalidWrapPayload { .. }]
        ));
    }

    #[test]
    fn test_condition_pattern() {
        let ext = Extension::new(1, "v", "field", Operation::Remove).with_condition(Condition::new(
            "user.login",
            ConditionOperator::Matches,
            "(unclosed",
        ));
        assert!(matches!(
            validate_extension(&ext).as_slice(),
            [ValidationError::InvalidConditionPattern { .. }]
        ));
    }

    #[test]
    fn test_view_validation() {
        let orphan = ViewSource {
            parent_name: None,
            ..ViewSource::inheriting("child", "base", vec![Patch::new("field[", Operation::Remove)])
        };
        let errors = validate_view(&orphan);
        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors[0],
            ValidationError::MissingBaseContent {
                view: "child".to_string()
            }
        );
        assert!(matches!(errors[1], ValidationError::Directive { index: 0, .. }));

        let selfish = ViewSource::inheriting("loop", "loop", vec![]);
        assert_eq!(
            validate_view(&selfish),
            vec![ValidationError::SelfInheritance {
                view: "loop".to_string()
            }]
        );

        assert!(validate_view(&ViewSource::root("base", Node::group("root", vec![]))).is_empty());
    }
}
