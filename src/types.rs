//! Core types for grants and queries
//!
//! This module provides the fundamental data structures of the engine:
//! actions with possession (`read:own`, `update:any`, the wildcard `*`),
//! grant records, and the query shape used by every resolver operation.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::condition::Condition;
use crate::error::AccessError;

/// CRUD action, plus the wildcard that matches every action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    /// Wildcard action (`"*"`), matches any queried action
    Any,
}

impl Action {
    /// String form used on the wire and in action-key listings
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Any => "*",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Action::Create),
            "read" => Ok(Action::Read),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            "*" => Ok(Action::Any),
            other => Err(AccessError::InvalidGrants(format!(
                "unknown action '{}'",
                other
            ))),
        }
    }
}

/// Whether an action is restricted to resources owned by the acting subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Possession {
    Own,
    Any,
}

impl Possession {
    pub fn as_str(&self) -> &'static str {
        match self {
            Possession::Own => "own",
            Possession::Any => "any",
        }
    }
}

impl fmt::Display for Possession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Possession {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "own" => Ok(Possession::Own),
            "any" => Ok(Possession::Any),
            other => Err(AccessError::InvalidGrants(format!(
                "unknown possession '{}'",
                other
            ))),
        }
    }
}

/// Action plus possession, the key a grant is stored under
///
/// Wire format is a string: `"read"` (bare action, `any` implied),
/// `"read:own"`, `"delete:any"`, or `"*"` for the wildcard action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionKey {
    pub action: Action,
    pub possession: Possession,
}

impl ActionKey {
    pub fn new(action: Action, possession: Possession) -> Self {
        Self { action, possession }
    }

    /// Wildcard key: any action, any possession
    pub fn any() -> Self {
        Self::new(Action::Any, Possession::Any)
    }
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.action, self.possession)
    }
}

impl FromStr for ActionKey {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((action, possession)) => Ok(Self::new(
                Action::from_str(action)?,
                Possession::from_str(possession)?,
            )),
            // A bare action means "any" possession
            None => Ok(Self::new(Action::from_str(s)?, Possession::Any)),
        }
    }
}

impl Serialize for ActionKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ActionKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ActionKey::from_str(&s).map_err(D::Error::custom)
    }
}

fn default_attributes() -> Vec<String> {
    vec!["*".to_string()]
}

/// A rule allowing a role to perform an action on a resource, restricted to
/// a set of attribute patterns and optionally gated by a condition
///
/// Grants with the same role/resource/action accumulate; every conditioned
/// variant is tried at query time and accepted attribute sets are unioned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grant {
    pub resource: String,

    pub action: ActionKey,

    /// Attribute glob patterns; defaults to `["*"]` (grant everything)
    #[serde(default = "default_attributes")]
    pub attributes: Vec<String>,

    /// Condition gating this grant's applicability
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

impl Grant {
    /// Create a grant for a resource/action with the default `["*"]` attributes
    pub fn new(resource: impl Into<String>, action: ActionKey) -> Self {
        Self {
            resource: resource.into(),
            action,
            attributes: default_attributes(),
            condition: None,
        }
    }

    /// Replace the attribute patterns
    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    /// Attach a condition
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Checks whether this grant satisfies the query's resource/action filters
    ///
    /// Conditions are not consulted here. Matching rules:
    /// - an absent query resource or action matches every grant
    /// - the wildcard grant action matches every queried action
    /// - a query for `own` possession is satisfied by an `own` or `any` grant
    ///   (the broader grant covers the narrower request); a query for `any`
    ///   requires an `any` grant
    pub fn matches(
        &self,
        resource: Option<&str>,
        action: Option<Action>,
        possession: Option<Possession>,
    ) -> bool {
        if let Some(resource) = resource {
            if self.resource != resource {
                return false;
            }
        }

        if let Some(action) = action {
            if self.action.action != Action::Any && self.action.action != action {
                return false;
            }
        }

        match possession {
            Some(Possession::Any) => self.action.possession == Possession::Any,
            Some(Possession::Own) | None => true,
        }
    }
}

/// Query input: role set, optional resource/action/possession filters, and
/// an optional runtime context for condition evaluation
///
/// Built either with the builder methods or deserialized from the wire shape
/// `{role, resource?, action?, possession?, context?}` where `role` is a
/// string or a list of strings and `action` may carry a `:own`/`:any` suffix.
///
/// # Examples
///
/// ```rust
/// use rolegate::{Action, Query};
/// use serde_json::json;
///
/// let query = Query::role("editor")
///     .resource("article")
///     .action(Action::Update)
///     .own()
///     .context(json!({"status": "active"}));
///
/// assert_eq!(query.roles, vec!["editor"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub roles: Vec<String>,
    pub resource: Option<String>,
    pub action: Option<Action>,
    pub possession: Option<Possession>,
    pub context: Option<Value>,
}

impl Query {
    /// Query for a single role
    pub fn role(role: impl Into<String>) -> Self {
        Self {
            roles: vec![role.into()],
            ..Self::default()
        }
    }

    /// Query for a set of roles
    pub fn roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    pub fn possession(mut self, possession: Possession) -> Self {
        self.possession = Some(possession);
        self
    }

    /// Restrict the query to resources owned by the acting subject
    pub fn own(self) -> Self {
        self.possession(Possession::Own)
    }

    /// Require grants that cover any resource, not just owned ones
    pub fn any(self) -> Self {
        self.possession(Possession::Any)
    }

    pub fn context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RoleField {
    One(String),
    Many(Vec<String>),
}

#[derive(Deserialize)]
struct QueryWire {
    role: RoleField,
    #[serde(default)]
    resource: Option<String>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    possession: Option<String>,
    #[serde(default)]
    context: Option<Value>,
}

impl<'de> Deserialize<'de> for Query {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = QueryWire::deserialize(deserializer)?;

        let roles = match wire.role {
            RoleField::One(role) => vec![role],
            RoleField::Many(roles) => roles,
        };

        // An action string may carry a possession suffix ("read:own"); an
        // explicit possession field wins over the suffix.
        let (action, suffix) = match wire.action.as_deref() {
            None => (None, None),
            Some(s) => {
                let key = ActionKey::from_str(s).map_err(D::Error::custom)?;
                let suffix = s.contains(':').then_some(key.possession);
                (Some(key.action), suffix)
            }
        };

        let possession = match wire.possession.as_deref() {
            Some(p) => Some(Possession::from_str(p).map_err(D::Error::custom)?),
            None => suffix,
        };

        Ok(Query {
            roles,
            resource: wire.resource,
            action,
            possession,
            context: wire.context,
        })
    }
}
