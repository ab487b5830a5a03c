//! Condition expression trees
//!
//! A condition is a tagged tree of `AND`/`OR`/`NOT` combinators over leaf
//! predicates. The wire format is a single-key JSON object:
//!
//! ```json
//! {"AND": [
//!     {"EQUALS": {"path": "status", "value": "active"}},
//!     {"NOT": {"LIST_CONTAINS": {"path": "flags", "value": "banned"}}}
//! ]}
//! ```
//!
//! `AND`/`OR` operands may be given as an array of sub-expressions or as an
//! object mapping predicate names to their args (one sub-expression per
//! entry). Trees are immutable once attached to a grant.

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{AccessError, Result};

/// A condition expression evaluated against a request context
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// True iff no operand evaluates false; vacuously true on an empty list
    And(Vec<Condition>),
    /// True iff at least one operand is true; an empty list is false when a
    /// context is present and true when there is none
    Or(Vec<Condition>),
    /// Logical negation of the nested expression
    Not(Box<Condition>),
    /// Leaf predicate, resolved by name from the evaluator's registry
    Fn { name: String, args: Value },
}

impl Condition {
    /// Conjunction of sub-conditions
    pub fn and(operands: impl IntoIterator<Item = Condition>) -> Self {
        Condition::And(operands.into_iter().collect())
    }

    /// Disjunction of sub-conditions
    pub fn or(operands: impl IntoIterator<Item = Condition>) -> Self {
        Condition::Or(operands.into_iter().collect())
    }

    /// Negation
    pub fn not(operand: Condition) -> Self {
        Condition::Not(Box::new(operand))
    }

    /// Leaf predicate by name
    pub fn func(name: impl Into<String>, args: Value) -> Self {
        Condition::Fn {
            name: name.into(),
            args,
        }
    }

    /// Parses a condition from its wire representation
    ///
    /// # Errors
    ///
    /// `InvalidConditionArgs` when the value is not a single-key object,
    /// when an `AND`/`OR` operand is neither an array nor an object, or when
    /// `NOT` is not given exactly one nested expression.
    pub fn from_value(value: &Value) -> Result<Self> {
        let map = value.as_object().ok_or_else(|| {
            AccessError::InvalidConditionArgs(format!(
                "condition must be an object, got {}",
                type_name(value)
            ))
        })?;

        let mut entries = map.iter();
        let (key, operand) = match (entries.next(), entries.next()) {
            (Some(entry), None) => entry,
            _ => {
                return Err(AccessError::InvalidConditionArgs(format!(
                    "condition object must have exactly one key, got {}",
                    map.len()
                )))
            }
        };
        match key.as_str() {
            "AND" => Ok(Condition::And(Self::parse_operands("AND", operand)?)),
            "OR" => Ok(Condition::Or(Self::parse_operands("OR", operand)?)),
            "NOT" => {
                if !operand.is_object() {
                    return Err(AccessError::InvalidConditionArgs(format!(
                        "NOT requires a single nested condition, got {}",
                        type_name(operand)
                    )));
                }
                Ok(Condition::not(Self::from_value(operand)?))
            }
            name => Ok(Condition::func(name, operand.clone())),
        }
    }

    fn parse_operands(combinator: &str, operand: &Value) -> Result<Vec<Condition>> {
        match operand {
            Value::Array(items) => items.iter().map(Self::from_value).collect(),
            Value::Object(entries) => entries
                .iter()
                .map(|(name, args)| match name.as_str() {
                    "AND" => Ok(Condition::And(Self::parse_operands("AND", args)?)),
                    "OR" => Ok(Condition::Or(Self::parse_operands("OR", args)?)),
                    "NOT" => Ok(Condition::not(Self::from_value(args)?)),
                    _ => Ok(Condition::func(name, args.clone())),
                })
                .collect(),
            other => Err(AccessError::InvalidConditionArgs(format!(
                "{} operands must be an array or an object, got {}",
                combinator,
                type_name(other)
            ))),
        }
    }

    /// Wire representation of this condition
    pub fn to_value(&self) -> Value {
        let mut map = Map::with_capacity(1);
        match self {
            Condition::And(subs) => {
                map.insert(
                    "AND".to_string(),
                    Value::Array(subs.iter().map(Condition::to_value).collect()),
                );
            }
            Condition::Or(subs) => {
                map.insert(
                    "OR".to_string(),
                    Value::Array(subs.iter().map(Condition::to_value).collect()),
                );
            }
            Condition::Not(inner) => {
                map.insert("NOT".to_string(), inner.to_value());
            }
            Condition::Fn { name, args } => {
                map.insert(name.clone(), args.clone());
            }
        }
        Value::Object(map)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Condition::from_value(&value).map_err(D::Error::custom)
    }
}
