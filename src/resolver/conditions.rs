//! Evaluation of extension conditions against a context

use crate::model::{Condition, ConditionOperator, Context};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;

/// Compiled `matches` patterns, shared across evaluations
static PATTERN_CACHE: Lazy<DashMap<String, Option<Regex>>> = Lazy::new(DashMap::new);

/// Resolve a dotted path (`user.company.country`) inside the context
pub fn lookup<'a>(context: &'a Context, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = context.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Whether every condition passes (AND semantics; empty list passes)
pub fn all_pass(conditions: &[Condition], context: &Context) -> bool {
    conditions.iter().all(|condition| evaluate(condition, context))
}

/// Evaluate one condition.
///
/// Operators this engine does not know always pass.
pub fn evaluate(condition: &Condition, context: &Context) -> bool {
    let actual = lookup(context, &condition.field).filter(|value| !value.is_null());
    let expected = &condition.value;

    match &condition.operator {
        ConditionOperator::Other(_) => true,
        ConditionOperator::Exists => actual.is_some() == expected.as_bool().unwrap_or(true),
        ConditionOperator::Eq => actual.is_some_and(|value| loosely_equal(value, expected)),
        ConditionOperator::Ne => !actual.is_some_and(|value| loosely_equal(value, expected)),
        ConditionOperator::In => actual.is_some_and(|value| member_of(value, expected)),
        ConditionOperator::NotIn => !actual.is_some_and(|value| member_of(value, expected)),
        ConditionOperator::Gt => compare(actual, expected) == Some(Ordering::Greater),
        ConditionOperator::Gte => matches!(
            compare(actual, expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        ConditionOperator::Lt => compare(actual, expected) == Some(Ordering::Less),
        ConditionOperator::Lte => {
            matches!(compare(actual, expected), Some(Ordering::Less | Ordering::Equal))
        }
        ConditionOperator::Contains => actual.is_some_and(|value| contains(value, expected)),
        ConditionOperator::Matches => actual.is_some_and(|value| pattern_matches(value, expected)),
    }
}

fn loosely_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn member_of(value: &Value, set: &Value) -> bool {
    match set {
        Value::Array(items) => items.iter().any(|item| loosely_equal(value, item)),
        single => loosely_equal(value, single),
    }
}

fn compare(actual: Option<&Value>, expected: &Value) -> Option<Ordering> {
    match (actual?, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn contains(haystack: &Value, needle: &Value) -> bool {
    match (haystack, needle) {
        (Value::Array(items), needle) => items.iter().any(|item| loosely_equal(item, needle)),
        (Value::String(text), Value::String(part)) => text.contains(part.as_str()),
        (Value::Object(map), Value::String(key)) => map.contains_key(key),
        _ => false,
    }
}

fn pattern_matches(value: &Value, pattern: &Value) -> bool {
    let (Some(text), Some(pattern)) = (value.as_str(), pattern.as_str()) else {
        return false;
    };

    if let Some(cached) = PATTERN_CACHE.get(pattern) {
        return cached.as_ref().is_some_and(|regex| regex.is_match(text));
    }

    let compiled = Regex::new(pattern).ok();
    if compiled.is_none() {
        log::warn!("condition pattern '{pattern}' does not compile; treating as no match");
    }
    let matched = compiled.as_ref().is_some_and(|regex| regex.is_match(text));
    PATTERN_CACHE.insert(pattern.to_string(), compiled);
    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn context() -> Context {
        match json!({
            "user": {"login": "alice", "groups": ["sales", "admin"], "level": 3},
            "company": {"country": "DE", "currency": "EUR"},
            "mode": "edit",
            "archived": null
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn check(field: &str, op: &str, value: Value) -> bool {
        evaluate(
            &Condition::new(field, ConditionOperator::from(op.to_string()), value),
            &context(),
        )
    }

    #[test]
    fn test_lookup_paths() {
        let ctx = context();
        assert_eq!(lookup(&ctx, "user.login"), Some(&json!("alice")));
        assert_eq!(lookup(&ctx, "user.groups.1"), Some(&json!("admin")));
        assert_eq!(lookup(&ctx, "user.missing"), None);
        assert_eq!(lookup(&ctx, "mode.deeper"), None);
    }

    #[rstest]
    #[case("mode", "eq", json!("edit"), true)]
    #[case("mode", "eq", json!("view"), false)]
    #[case("user.level", "eq", json!(3.0), true)]
    #[case("mode", "ne", json!("view"), true)]
    #[case("missing", "ne", json!("x"), true)]
    #[case("missing", "eq", json!("x"), false)]
    #[case("company.country", "in", json!(["DE", "AT"]), true)]
    #[case("company.country", "not_in", json!(["DE", "AT"]), false)]
    #[case("missing", "not_in", json!(["DE"]), true)]
    #[case("user.level", "gt", json!(2), true)]
    #[case("user.level", "gte", json!(3), true)]
    #[case("user.level", "lt", json!(3), false)]
    #[case("user.level", "lte", json!(3), true)]
    #[case("missing", "gt", json!(0), false)]
    #[case("user.groups", "contains", json!("sales"), true)]
    #[case("user.login", "contains", json!("lic"), true)]
    #[case("user", "contains", json!("login"), true)]
    #[case("user.login", "matches", json!("^al"), true)]
    #[case("user.login", "matches", json!("^bob"), false)]
    #[case("user.login", "exists", json!(true), true)]
    #[case("missing", "exists", json!(false), true)]
    #[case("archived", "exists", Value::Null, false)]
    #[case("anything", "within_region", json!("EU"), true)]
    fn test_operators(
        #[case] field: &str,
        #[case] op: &str,
        #[case] value: Value,
        #[case] expected: bool,
    ) {
        assert_eq!(check(field, op, value), expected);
    }

    #[test]
    fn test_all_pass_is_conjunction() {
        let ctx = context();
        let pass = Condition::new("mode", ConditionOperator::Eq, "edit");
        let fail = Condition::new("mode", ConditionOperator::Eq, "view");
        assert!(all_pass(&[], &ctx));
        assert!(all_pass(&[pass.clone()], &ctx));
        assert!(!all_pass(&[pass, fail], &ctx));
    }

    #[test]
    fn test_invalid_pattern_fails_closed() {
        assert!(!check("user.login", "matches", json!("(unclosed")));
    }
}
