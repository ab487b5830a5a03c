//! Recursive condition evaluation with a predicate registry
//!
//! Evaluation is asynchronous because registered predicates may perform
//! asynchronous work (e.g. a remote attribute fetch). Combinators await
//! every operand before combining; `AND` in particular invokes every
//! sub-condition so predicate side effects are never skipped. No ordering
//! is guaranteed across sibling branches beyond "all complete before the
//! combinator returns".

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;

use super::expr::Condition;
use super::predicates;
use crate::error::{AccessError, Result};

/// A caller-registered leaf predicate
///
/// Failures surface as [`AccessError::PredicateFailed`] and abort the
/// enclosing evaluation; the engine never retries.
#[async_trait]
pub trait Predicate: Send + Sync {
    async fn test(&self, args: &Value, context: Option<&Value>) -> anyhow::Result<bool>;
}

type BuiltIn = fn(&Value, Option<&Value>) -> Result<bool>;

/// Evaluates condition trees against a request context
///
/// Built-in predicates cover equality, ordering, list membership, and path
/// existence; [`register`](ConditionEvaluator::register) adds custom leaf
/// predicates by name. Custom names shadow built-ins.
///
/// # Examples
///
/// ```rust
/// use rolegate::{Condition, ConditionEvaluator};
/// use serde_json::json;
///
/// # async fn example() -> rolegate::Result<()> {
/// let evaluator = ConditionEvaluator::new();
/// let condition = Condition::from_value(&json!({
///     "EQUALS": {"path": "status", "value": "active"}
/// }))?;
///
/// let ctx = json!({"status": "active"});
/// assert!(evaluator.evaluate(Some(&condition), Some(&ctx)).await?);
/// # Ok(())
/// # }
/// ```
pub struct ConditionEvaluator {
    custom: HashMap<String, Arc<dyn Predicate>>,
}

impl ConditionEvaluator {
    pub fn new() -> Self {
        Self {
            custom: HashMap::new(),
        }
    }

    /// Registers a custom predicate under `name`, replacing any previous
    /// registration and shadowing a built-in of the same name
    pub fn register(&mut self, name: impl Into<String>, predicate: impl Predicate + 'static) {
        self.custom.insert(name.into(), Arc::new(predicate));
    }

    /// Evaluates an optional condition against an optional context
    ///
    /// The absence of a condition always means "grant applies": `None`
    /// evaluates to `true` regardless of context.
    pub async fn evaluate(
        &self,
        condition: Option<&Condition>,
        context: Option<&Value>,
    ) -> Result<bool> {
        match condition {
            None => Ok(true),
            Some(condition) => self.eval(condition, context).await,
        }
    }

    fn eval<'a>(
        &'a self,
        condition: &'a Condition,
        context: Option<&'a Value>,
    ) -> BoxFuture<'a, Result<bool>> {
        async move {
            match condition {
                Condition::And(operands) => {
                    // Invoke every operand; side effects are never skipped.
                    // An empty list is vacuously true.
                    let mut all = true;
                    for operand in operands {
                        if !self.eval(operand, context).await? {
                            all = false;
                        }
                    }
                    Ok(all)
                }
                Condition::Or(operands) => {
                    // Empty OR: no condition accepted the input when a
                    // context was expected; vacuous pass when there is none.
                    if operands.is_empty() {
                        return Ok(context.is_none());
                    }
                    let mut any = false;
                    for operand in operands {
                        if self.eval(operand, context).await? {
                            any = true;
                        }
                    }
                    Ok(any)
                }
                Condition::Not(inner) => Ok(!self.eval(inner, context).await?),
                Condition::Fn { name, args } => self.eval_leaf(name, args, context).await,
            }
        }
        .boxed()
    }

    async fn eval_leaf(
        &self,
        name: &str,
        args: &Value,
        context: Option<&Value>,
    ) -> Result<bool> {
        if let Some(predicate) = self.custom.get(name) {
            return predicate
                .test(args, context)
                .await
                .map_err(|source| AccessError::PredicateFailed {
                    name: name.to_string(),
                    source,
                });
        }

        let built_in: BuiltIn = match name {
            "EQUALS" => predicates::equals,
            "NOT_EQUALS" => predicates::not_equals,
            "GREATER_THAN" => predicates::greater_than,
            "GREATER_THAN_EQUALS" => predicates::greater_than_equals,
            "LESS_THAN" => predicates::less_than,
            "LESS_THAN_EQUALS" => predicates::less_than_equals,
            "LIST_CONTAINS" => predicates::list_contains,
            "NOT_LIST_CONTAINS" => predicates::not_list_contains,
            "EXISTS" => predicates::exists,
            "NOT_EXISTS" => predicates::not_exists,
            unknown => return Err(AccessError::UnknownPredicate(unknown.to_string())),
        };
        built_in(args, context)
    }
}

impl Default for ConditionEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConditionEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConditionEvaluator")
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}
