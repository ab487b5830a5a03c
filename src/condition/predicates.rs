//! Built-in leaf predicates and context path extraction
//!
//! Predicates receive their args and the optional request context and return
//! a boolean. A missing context path is treated as absent, never as an
//! error: comparisons and membership tests against an absent value are
//! false (so their negated duals are true) and `EXISTS` is false.
//!
//! Paths are dotted (`user.profile.age`); a leading `$.` or `context.`
//! prefix is accepted as an alias for the context root. Array elements can
//! be addressed by numeric segments.

use serde_json::Value;

use crate::error::{AccessError, Result};

/// Resolves a dotted path against the context
///
/// Tries the literal path first, then retries with a `$.`/`context.` prefix
/// stripped, so `"context.status"` addresses `{"status": ...}` while a
/// genuine top-level `context` key still wins.
pub fn extract_path<'a>(context: Option<&'a Value>, path: &str) -> Option<&'a Value> {
    let ctx = context?;
    lookup(ctx, path).or_else(|| {
        let stripped = path
            .strip_prefix("$.")
            .or_else(|| path.strip_prefix("context."))?;
        lookup(ctx, stripped)
    })
}

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Extracts `{path, value}` args common to the comparison predicates
fn path_value_args<'a>(name: &str, args: &'a Value) -> Result<(&'a str, &'a Value)> {
    let map = args.as_object().ok_or_else(|| {
        AccessError::InvalidConditionArgs(format!("{} args must be an object", name))
    })?;
    let path = map
        .get("path")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            AccessError::InvalidConditionArgs(format!("{} args require a 'path' string", name))
        })?;
    let value = map.get("value").ok_or_else(|| {
        AccessError::InvalidConditionArgs(format!("{} args require a 'value'", name))
    })?;
    Ok((path, value))
}

/// Extracts the path list accepted by `EXISTS`/`NOT_EXISTS`: a path string,
/// `{path}`, or an array of path strings
fn path_list_args(name: &str, args: &Value) -> Result<Vec<String>> {
    match args {
        Value::String(path) => Ok(vec![path.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    AccessError::InvalidConditionArgs(format!(
                        "{} path list entries must be strings",
                        name
                    ))
                })
            })
            .collect(),
        Value::Object(map) => map
            .get("path")
            .and_then(Value::as_str)
            .map(|p| vec![p.to_string()])
            .ok_or_else(|| {
                AccessError::InvalidConditionArgs(format!(
                    "{} args require a 'path' string",
                    name
                ))
            }),
        other => Err(AccessError::InvalidConditionArgs(format!(
            "{} args must be a path, an object with 'path', or a list of paths, got {}",
            name, other
        ))),
    }
}

pub fn equals(args: &Value, context: Option<&Value>) -> Result<bool> {
    let (path, expected) = path_value_args("EQUALS", args)?;
    Ok(extract_path(context, path).is_some_and(|actual| actual == expected))
}

pub fn not_equals(args: &Value, context: Option<&Value>) -> Result<bool> {
    let (path, expected) = path_value_args("NOT_EQUALS", args)?;
    Ok(!extract_path(context, path).is_some_and(|actual| actual == expected))
}

/// Three-way comparison shared by the ordering predicates: numeric when both
/// sides are numbers, lexicographic when both are strings, absent otherwise
fn compare(
    name: &str,
    args: &Value,
    context: Option<&Value>,
) -> Result<Option<std::cmp::Ordering>> {
    let (path, expected) = path_value_args(name, args)?;
    let Some(actual) = extract_path(context, path) else {
        return Ok(None);
    };

    let ordering = match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => {
            let (a, b) = (a.as_f64(), b.as_f64());
            match (a, b) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            }
        }
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    };
    Ok(ordering)
}

pub fn greater_than(args: &Value, context: Option<&Value>) -> Result<bool> {
    Ok(compare("GREATER_THAN", args, context)?.is_some_and(std::cmp::Ordering::is_gt))
}

pub fn greater_than_equals(args: &Value, context: Option<&Value>) -> Result<bool> {
    Ok(compare("GREATER_THAN_EQUALS", args, context)?.is_some_and(std::cmp::Ordering::is_ge))
}

pub fn less_than(args: &Value, context: Option<&Value>) -> Result<bool> {
    Ok(compare("LESS_THAN", args, context)?.is_some_and(std::cmp::Ordering::is_lt))
}

pub fn less_than_equals(args: &Value, context: Option<&Value>) -> Result<bool> {
    Ok(compare("LESS_THAN_EQUALS", args, context)?.is_some_and(std::cmp::Ordering::is_le))
}

pub fn list_contains(args: &Value, context: Option<&Value>) -> Result<bool> {
    let (path, expected) = path_value_args("LIST_CONTAINS", args)?;
    Ok(extract_path(context, path)
        .and_then(Value::as_array)
        .is_some_and(|items| items.contains(expected)))
}

pub fn not_list_contains(args: &Value, context: Option<&Value>) -> Result<bool> {
    let (path, expected) = path_value_args("NOT_LIST_CONTAINS", args)?;
    Ok(!extract_path(context, path)
        .and_then(Value::as_array)
        .is_some_and(|items| items.contains(expected)))
}

/// True iff every listed path resolves against the context
pub fn exists(args: &Value, context: Option<&Value>) -> Result<bool> {
    let paths = path_list_args("EXISTS", args)?;
    Ok(paths
        .iter()
        .all(|path| extract_path(context, path).is_some()))
}

/// True iff none of the listed paths resolve; not the strict negation of
/// `EXISTS` when several paths are given
pub fn not_exists(args: &Value, context: Option<&Value>) -> Result<bool> {
    let paths = path_list_args("NOT_EXISTS", args)?;
    Ok(paths
        .iter()
        .all(|path| extract_path(context, path).is_none()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    fn ctx() -> Value {
        json!({
            "status": "active",
            "level": 5,
            "name": "carol",
            "tags": ["staff", "beta"],
            "profile": {"age": 31},
            "items": [{"id": 1}, {"id": 2}]
        })
    }

    #[test]
    fn test_extract_dotted_and_indexed_paths() {
        let ctx = ctx();
        assert_eq!(extract_path(Some(&ctx), "profile.age"), Some(&json!(31)));
        assert_eq!(extract_path(Some(&ctx), "items.1.id"), Some(&json!(2)));
        assert_eq!(extract_path(Some(&ctx), "profile.missing"), None);
        assert_eq!(extract_path(None, "status"), None);
    }

    #[test]
    fn test_extract_strips_root_aliases() {
        let ctx = ctx();
        assert_eq!(
            extract_path(Some(&ctx), "context.status"),
            Some(&json!("active"))
        );
        assert_eq!(extract_path(Some(&ctx), "$.status"), Some(&json!("active")));
    }

    #[test]
    fn test_extract_prefers_literal_context_key() {
        let ctx = json!({"context": {"status": "inner"}, "status": "outer"});
        assert_eq!(
            extract_path(Some(&ctx), "context.status"),
            Some(&json!("inner"))
        );
    }

    #[test]
    fn test_equals_and_negation() {
        let ctx = ctx();
        let args = json!({"path": "status", "value": "active"});
        assert!(equals(&args, Some(&ctx)).unwrap());
        assert!(!not_equals(&args, Some(&ctx)).unwrap());

        // Absent path: EQUALS false, NOT_EQUALS true
        let args = json!({"path": "missing", "value": "active"});
        assert!(!equals(&args, Some(&ctx)).unwrap());
        assert!(not_equals(&args, Some(&ctx)).unwrap());
    }

    #[test_case(json!({"path": "level", "value": 3}), true ; "numeric greater")]
    #[test_case(json!({"path": "level", "value": 5}), false ; "numeric equal is not greater")]
    #[test_case(json!({"path": "name", "value": "bob"}), true ; "lexicographic")]
    #[test_case(json!({"path": "level", "value": "3"}), false ; "mixed types never compare")]
    #[test_case(json!({"path": "missing", "value": 1}), false ; "absent path")]
    fn test_greater_than(args: Value, expected: bool) {
        assert_eq!(greater_than(&args, Some(&ctx())).unwrap(), expected);
    }

    #[test]
    fn test_ordering_boundaries() {
        let ctx = ctx();
        let at_level = json!({"path": "level", "value": 5});
        assert!(greater_than_equals(&at_level, Some(&ctx)).unwrap());
        assert!(less_than_equals(&at_level, Some(&ctx)).unwrap());
        assert!(!less_than(&at_level, Some(&ctx)).unwrap());
    }

    #[test]
    fn test_list_membership() {
        let ctx = ctx();
        let hit = json!({"path": "tags", "value": "staff"});
        let miss = json!({"path": "tags", "value": "admin"});

        assert!(list_contains(&hit, Some(&ctx)).unwrap());
        assert!(!list_contains(&miss, Some(&ctx)).unwrap());
        assert!(not_list_contains(&miss, Some(&ctx)).unwrap());

        // Path that is not a list
        let scalar = json!({"path": "status", "value": "active"});
        assert!(!list_contains(&scalar, Some(&ctx)).unwrap());
        assert!(not_list_contains(&scalar, Some(&ctx)).unwrap());
    }

    #[test]
    fn test_exists_arg_shapes() {
        let ctx = ctx();
        assert!(exists(&json!("status"), Some(&ctx)).unwrap());
        assert!(exists(&json!({"path": "profile.age"}), Some(&ctx)).unwrap());
        assert!(exists(&json!(["status", "level"]), Some(&ctx)).unwrap());
        assert!(!exists(&json!(["status", "missing"]), Some(&ctx)).unwrap());

        assert!(not_exists(&json!("missing"), Some(&ctx)).unwrap());
        assert!(!not_exists(&json!(["missing", "status"]), Some(&ctx)).unwrap());
    }

    #[test]
    fn test_malformed_args_rejected() {
        let ctx = ctx();
        assert!(matches!(
            equals(&json!("nope"), Some(&ctx)),
            Err(AccessError::InvalidConditionArgs(_))
        ));
        assert!(matches!(
            equals(&json!({"value": 1}), Some(&ctx)),
            Err(AccessError::InvalidConditionArgs(_))
        ));
        assert!(matches!(
            exists(&json!(42), Some(&ctx)),
            Err(AccessError::InvalidConditionArgs(_))
        ));
    }
}
