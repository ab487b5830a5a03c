//! Condition module: expression trees, evaluation, and built-in predicates
//!
//! Conditions gate a grant's applicability: `AND`/`OR`/`NOT` combinators
//! over leaf predicates evaluated against the query context. Evaluation is
//! asynchronous so registered predicates may suspend.

mod evaluator;
mod expr;
pub mod predicates;

pub use evaluator::{ConditionEvaluator, Predicate};
pub use expr::Condition;
