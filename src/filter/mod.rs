//! Attribute glob filtering
//!
//! Projects a data object down to the fields admitted by a set of glob
//! patterns. Patterns are dot-delimited (`profile.address.city`), may use
//! `*` for a single segment or a trailing `**` for everything below a
//! level, and a `!` prefix negates.
//!
//! Patterns are sorted by specificity before application: broad wildcard
//! patterns first, negations next, exact notations last, so the more
//! specific pattern always wins regardless of input order — `"!car.*"`
//! overrides an earlier `"*"`, and an exact `"car.model"` re-admits a field
//! a negation removed.

use serde_json::{Map, Value};
use wildmatch::WildMatch;

struct PatternOp {
    negated: bool,
    segments: Vec<String>,
}

impl PatternOp {
    fn parse(pattern: &str) -> Option<Self> {
        let (negated, body) = match pattern.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, pattern),
        };
        if body.is_empty() {
            return None;
        }
        Some(Self {
            negated,
            segments: body.split('.').map(str::to_string).collect(),
        })
    }

    /// Application order: wildcard admissions, then negations, then exact
    /// notations
    fn specificity(&self) -> u8 {
        if self.negated {
            1
        } else if self.segments.iter().any(|s| s.contains('*')) {
            0
        } else {
            2
        }
    }

    /// Whether this pattern admits an entire (scalar) root value
    fn admits_root(&self) -> bool {
        !self.negated && self.segments.len() == 1 && matches!(self.segments[0].as_str(), "*" | "**")
    }
}

fn segment_matches(segment: &str, key: &str) -> bool {
    if segment.contains('*') || segment.contains('?') {
        WildMatch::new(segment).matches(key)
    } else {
        segment == key
    }
}

/// Deep-filters `data` down to the attributes admitted by `patterns`
///
/// The input is never mutated; a new value is returned. An empty pattern
/// set (or only empty strings) yields an empty object. Arrays of data
/// objects are filtered element-wise; a scalar passes through only under a
/// root wildcard pattern.
///
/// # Examples
///
/// ```rust
/// use rolegate::filter_attributes;
/// use serde_json::json;
///
/// let data = json!({"a": 1, "b": {"c": 2, "d": 3}});
/// let filtered = filter_attributes(&data, &["*", "!b.*", "b.c"]);
/// assert_eq!(filtered, json!({"a": 1, "b": {"c": 2}}));
/// ```
pub fn filter_attributes<S: AsRef<str>>(data: &Value, patterns: &[S]) -> Value {
    let mut ops: Vec<PatternOp> = patterns
        .iter()
        .filter_map(|p| PatternOp::parse(p.as_ref()))
        .collect();
    if ops.is_empty() {
        return Value::Object(Map::new());
    }
    ops.sort_by_key(PatternOp::specificity);

    apply(data, &ops)
}

fn apply(data: &Value, ops: &[PatternOp]) -> Value {
    match data {
        Value::Array(items) => Value::Array(items.iter().map(|item| apply(item, ops)).collect()),
        Value::Object(_) => {
            let mut result = Value::Object(Map::new());
            for op in ops {
                let segments: Vec<&str> = op.segments.iter().map(String::as_str).collect();
                if op.negated {
                    exclude(&mut result, &segments);
                } else {
                    include(&mut result, data, &segments);
                }
            }
            result
        }
        scalar => {
            if ops.iter().any(PatternOp::admits_root) {
                scalar.clone()
            } else {
                Value::Null
            }
        }
    }
}

/// Copies the fields of `source` selected by `segments` into `target`
fn include(target: &mut Value, source: &Value, segments: &[&str]) {
    let Some((segment, rest)) = segments.split_first() else {
        return;
    };

    match source {
        // Arrays are transparent to path segments: filter element-wise
        Value::Array(items) => {
            if !matches!(target, Value::Array(t) if t.len() == items.len()) {
                *target = Value::Array(items.iter().map(empty_like).collect());
            }
            if let Value::Array(targets) = target {
                for (child, item) in targets.iter_mut().zip(items) {
                    include(child, item, segments);
                }
            }
        }
        Value::Object(map) => {
            let Value::Object(target_map) = target else {
                return;
            };
            // A trailing "**" admits the whole subtree
            if *segment == "**" {
                for (key, value) in map {
                    target_map.insert(key.clone(), value.clone());
                }
                return;
            }
            for (key, value) in map {
                if !segment_matches(segment, key) {
                    continue;
                }
                if rest.is_empty() {
                    target_map.insert(key.clone(), value.clone());
                } else if can_descend(value) {
                    let child = target_map
                        .entry(key.clone())
                        .or_insert_with(|| empty_like(value));
                    include(child, value, rest);
                }
            }
        }
        _ => {}
    }
}

/// Removes the fields selected by `segments` from `target`
fn exclude(target: &mut Value, segments: &[&str]) {
    let Some((segment, rest)) = segments.split_first() else {
        return;
    };

    match target {
        Value::Array(items) => {
            for item in items {
                exclude(item, segments);
            }
        }
        Value::Object(map) => {
            if *segment == "**" {
                map.clear();
                return;
            }
            if rest.is_empty() {
                map.retain(|key, _| !segment_matches(segment, key));
            } else {
                for (key, value) in map.iter_mut() {
                    if segment_matches(segment, key) {
                        exclude(value, rest);
                    }
                }
            }
        }
        _ => {}
    }
}

/// Whether remaining path segments can select anything inside `value`;
/// guards against planting empty placeholders under scalar fields
fn can_descend(value: &Value) -> bool {
    match value {
        Value::Object(_) => true,
        Value::Array(items) => items.iter().any(can_descend),
        _ => false,
    }
}

/// Empty container of the same kind as `value`, the seed for deep merges
fn empty_like(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(empty_like).collect()),
        Value::Object(_) => Value::Object(Map::new()),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests;
