//! # Role and attribute based access control (rolegate)
//!
//! Access control decision engine with support for:
//! - Role based grants keyed by resource and action
//! - Role inheritance with cycle detection
//! - Conditional grants evaluated against a query context
//! - Attribute level filtering with glob and negation patterns
//! - Possession semantics (`own` vs `any`)
//!
//! ## Example
//!
//! ```rust,no_run
//! use rolegate::{AccessControl, Action, Query};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut ac = AccessControl::new();
//!
//! ac.set_grants(json!({
//!     "viewer": {
//!         "grants": [
//!             {"resource": "article", "action": "read:any", "attributes": ["*", "!draft"]}
//!         ]
//!     },
//!     "editor": {
//!         "grants": [
//!             {"resource": "article", "action": "update:any"}
//!         ],
//!         "$extend": {"viewer": 2}
//!     }
//! }))?;
//!
//! let query = Query::role("editor").resource("article").action(Action::Read);
//! let permission = ac.permission(&query).await?;
//!
//! assert!(permission.granted());
//! let visible = permission.filter(&json!({"title": "hi", "draft": true}));
//! # Ok(())
//! # }
//! ```

pub mod condition;
pub mod engine;
pub mod error;
pub mod filter;
pub mod store;
pub mod types;

pub use condition::{Condition, ConditionEvaluator, Predicate};
pub use engine::{AccessControl, Permission};
pub use error::{AccessError, Result};
pub use filter::filter_attributes;
pub use store::{Extension, GrantStore, Role};
pub use types::{Action, ActionKey, Grant, Possession, Query};
