//! Attribute filter tests: specificity ordering, negation, nesting, and
//! element-wise array filtering

use serde_json::json;
use test_case::test_case;

use super::filter_attributes;

#[test]
fn test_wildcard_admits_everything() {
    let data = json!({"a": 1, "b": {"c": 2, "d": 3}});
    assert_eq!(filter_attributes(&data, &["*"]), data);
}

#[test]
fn test_negation_overrides_wildcard() {
    let data = json!({"a": 1, "b": {"c": 2, "d": 3}});
    let filtered = filter_attributes(&data, &["*", "!b.*", "b.c"]);
    assert_eq!(filtered, json!({"a": 1, "b": {"c": 2}}));
}

#[test]
fn test_pattern_order_does_not_matter() {
    let data = json!({"a": 1, "b": {"c": 2, "d": 3}});
    let expected = json!({"a": 1, "b": {"c": 2}});

    // Same patterns in every order: specificity sorting normalizes them
    assert_eq!(filter_attributes(&data, &["b.c", "!b.*", "*"]), expected);
    assert_eq!(filter_attributes(&data, &["!b.*", "*", "b.c"]), expected);
    assert_eq!(filter_attributes(&data, &["*", "b.c", "!b.*"]), expected);
}

#[test_case(&[] ; "no patterns")]
#[test_case(&[""] ; "empty string pattern")]
fn test_empty_patterns_yield_empty_object(patterns: &[&str]) {
    let data = json!({"a": 1, "b": 2});
    assert_eq!(filter_attributes(&data, patterns), json!({}));
}

#[test]
fn test_exact_notation_selects_nested_field() {
    let data = json!({"user": {"name": "ada", "email": "a@example.com"}, "meta": 1});
    let filtered = filter_attributes(&data, &["user.name"]);
    assert_eq!(filtered, json!({"user": {"name": "ada"}}));
}

#[test]
fn test_negated_exact_field_removed() {
    let data = json!({"name": "x", "password": "y"});
    let filtered = filter_attributes(&data, &["*", "!password"]);
    assert_eq!(filtered, json!({"name": "x"}));
}

#[test]
fn test_mid_path_wildcard() {
    let data = json!({
        "home": {"address": {"city": "oslo", "zip": "0150"}},
        "work": {"address": {"city": "bergen", "zip": "5003"}}
    });
    let filtered = filter_attributes(&data, &["*.address.city"]);
    assert_eq!(
        filtered,
        json!({
            "home": {"address": {"city": "oslo"}},
            "work": {"address": {"city": "bergen"}}
        })
    );
}

#[test]
fn test_double_wildcard_admits_subtree() {
    let data = json!({"car": {"engine": {"hp": 90}, "color": "red"}, "id": 7});
    let filtered = filter_attributes(&data, &["car.**"]);
    assert_eq!(
        filtered,
        json!({"car": {"engine": {"hp": 90}, "color": "red"}})
    );
}

#[test]
fn test_arrays_filtered_element_wise() {
    let data = json!([
        {"name": "a", "secret": 1},
        {"name": "b", "secret": 2}
    ]);
    let filtered = filter_attributes(&data, &["*", "!secret"]);
    assert_eq!(filtered, json!([{"name": "a"}, {"name": "b"}]));
}

#[test]
fn test_nested_array_transparency() {
    let data = json!({"items": [{"id": 1, "price": 10}, {"id": 2, "price": 20}]});
    let filtered = filter_attributes(&data, &["items.id"]);
    assert_eq!(filtered, json!({"items": [{"id": 1}, {"id": 2}]}));
}

#[test]
fn test_recursing_into_scalar_leaves_nothing_behind() {
    let data = json!({"b": 5});
    assert_eq!(filter_attributes(&data, &["b.c"]), json!({}));
}

#[test]
fn test_input_is_not_mutated() {
    let data = json!({"a": 1, "b": 2});
    let snapshot = data.clone();
    let _ = filter_attributes(&data, &["a"]);
    assert_eq!(data, snapshot);
}

#[test]
fn test_scalar_passes_only_under_root_wildcard() {
    assert_eq!(filter_attributes(&json!(42), &["*"]), json!(42));
    assert_eq!(filter_attributes(&json!(42), &["a"]), json!(null));
}
