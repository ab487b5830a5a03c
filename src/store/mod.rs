//! Grant storage and role inheritance
//!
//! The [`GrantStore`] owns the role→resource→action grant graph. Roles may
//! extend other roles (`$extend`), inheriting their grants; extension is
//! validated for cycles at registration time, never at query time, and
//! carries a score recording each extension's contribution so removals can
//! roll the bookkeeping back.
//!
//! Two input shapes are accepted by [`set_grants`](GrantStore::set_grants):
//!
//! ```json
//! {
//!   "editor": {
//!     "grants": [{"resource": "article", "action": "update:any"}],
//!     "$extend": {"viewer": 2}
//!   }
//! }
//! ```
//!
//! or a flat list of records each carrying its own `role`:
//!
//! ```json
//! [{"role": "editor", "resource": "article", "action": "update:any"}]
//! ```

use std::collections::{HashMap, VecDeque};
use std::str::FromStr;

use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::condition::Condition;
use crate::error::{AccessError, Result};
use crate::types::{ActionKey, Grant, Query};

/// One inheritance edge: the score contribution captured at extension time
/// and an optional condition gating the inherited permissions
#[derive(Debug, Clone)]
pub struct Extension {
    pub score: i64,
    pub condition: Option<Condition>,
}

/// A role: its own grants plus the roles it extends
#[derive(Debug, Clone)]
pub struct Role {
    pub grants: Vec<Grant>,
    pub extends: IndexMap<String, Extension>,
    /// Inheritance score; starts at 1, grows by `extender.score + 1` per
    /// extension, shrinks by the recorded contribution on removal
    pub score: i64,
}

impl Default for Role {
    fn default() -> Self {
        Self {
            grants: Vec::new(),
            extends: IndexMap::new(),
            score: 1,
        }
    }
}

#[derive(Deserialize)]
struct RoleInput {
    #[serde(default)]
    grants: Vec<GrantInput>,
    #[serde(rename = "$extend", default)]
    extend: IndexMap<String, ExtendInput>,
}

#[derive(Deserialize)]
struct GrantInput {
    #[serde(default)]
    resource: Option<String>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    attributes: Option<Vec<String>>,
    #[serde(default)]
    condition: Option<Condition>,
}

#[derive(Deserialize)]
struct FlatGrantInput {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    resource: Option<String>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    attributes: Option<Vec<String>>,
    #[serde(default)]
    condition: Option<Condition>,
}

/// `$extend` wire value: a bare score or `{score, condition}`. Wire scores
/// are advisory; the store recomputes them at ingestion so the bookkeeping
/// invariants hold for loaded graphs too.
#[derive(Deserialize)]
#[serde(untagged)]
enum ExtendInput {
    Score(i64),
    Detailed {
        #[serde(default)]
        #[allow(dead_code)]
        score: Option<i64>,
        #[serde(default)]
        condition: Option<Condition>,
    },
}

impl ExtendInput {
    fn into_condition(self) -> Option<Condition> {
        match self {
            ExtendInput::Score(_) => None,
            ExtendInput::Detailed { condition, .. } => condition,
        }
    }
}

/// In-memory store for the role→grant graph
///
/// Mutation takes `&mut self` and queries take `&self`, so the borrow
/// checker enforces the single-writer discipline in-process; the store has
/// no internal locking.
#[derive(Debug, Clone, Default)]
pub struct GrantStore {
    roles: IndexMap<String, Role>,
}

impl GrantStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all stored grants with the normalized form of `input`
    ///
    /// Accepts the role-keyed object shape or the flat list shape (module
    /// docs). The whole input is validated and normalized before any state
    /// changes, so a rejected call leaves the prior grants intact.
    ///
    /// # Errors
    ///
    /// - `InvalidGrants` when the input is neither an object nor a list, or
    ///   a record fails to parse
    /// - `MissingRequiredField` when a record lacks `role`, `resource`, or
    ///   `action`
    /// - `CircularExtension` when an ingested `$extend` edge is cyclic or
    ///   names an unknown role
    pub fn set_grants(&mut self, input: Value) -> Result<()> {
        let staged = Self::normalize(input)?;
        debug!(roles = staged.roles.len(), "replacing grant store contents");
        self.roles = staged.roles;
        Ok(())
    }

    fn normalize(input: Value) -> Result<GrantStore> {
        let mut store = GrantStore::new();
        match input {
            Value::Object(_) => {
                let roles: IndexMap<String, RoleInput> = serde_json::from_value(input)
                    .map_err(|e| AccessError::InvalidGrants(e.to_string()))?;

                // All role keys exist before extensions are applied, so the
                // cycle check sees the complete graph.
                for name in roles.keys() {
                    store.role_mut(name);
                }
                for (name, def) in &roles {
                    for record in &def.grants {
                        let grant = Self::build_grant(record)?;
                        store.role_mut(name).grants.push(grant);
                    }
                }
                for (name, def) in roles {
                    for (extender, ext) in def.extend {
                        store.extend_role(&[&name], &[&extender], ext.into_condition())?;
                    }
                }
            }
            Value::Array(_) => {
                let records: Vec<FlatGrantInput> = serde_json::from_value(input)
                    .map_err(|e| AccessError::InvalidGrants(e.to_string()))?;
                for record in records {
                    let role = record.role.as_deref().ok_or(
                        AccessError::MissingRequiredField {
                            field: "role",
                            context: "grant record",
                        },
                    )?;
                    let action = record.action.as_deref().ok_or(
                        AccessError::MissingRequiredField {
                            field: "action",
                            context: "grant record",
                        },
                    )?;
                    let grant = Self::build_grant(&GrantInput {
                        resource: record.resource,
                        action: Some(action.to_string()),
                        attributes: record.attributes,
                        condition: record.condition,
                    })?;
                    store.role_mut(role).grants.push(grant);
                }
            }
            _ => {
                return Err(AccessError::InvalidGrants(
                    "expected an object keyed by role or a list of grant records".to_string(),
                ))
            }
        }
        Ok(store)
    }

    fn build_grant(record: &GrantInput) -> Result<Grant> {
        let resource = record
            .resource
            .clone()
            .ok_or(AccessError::MissingRequiredField {
                field: "resource",
                context: "grant record",
            })?;
        // An omitted action inside the object shape means the wildcard key
        let action = match record.action.as_deref() {
            Some(action) => ActionKey::from_str(action)?,
            None => ActionKey::any(),
        };
        let mut grant = Grant::new(resource, action);
        if let Some(attributes) = &record.attributes {
            grant.attributes = attributes.clone();
        }
        grant.condition = record.condition.clone();
        Ok(grant)
    }

    /// Appends a grant to `role`, creating the role on demand
    pub fn grant(&mut self, role: impl AsRef<str>, grant: Grant) {
        debug!(role = role.as_ref(), resource = %grant.resource, action = %grant.action, "adding grant");
        self.role_mut(role.as_ref()).grants.push(grant);
    }

    /// Extends every role in `roles` by every role in `extenders`
    ///
    /// Each extended role inherits the extender's grants (gated by
    /// `condition`, when given, evaluated against the querying context).
    /// Roles in `roles` are created if absent; extender roles never are.
    /// Validation covers the whole call before any mutation, so an error
    /// leaves the graph unchanged.
    ///
    /// # Errors
    ///
    /// `CircularExtension` when a pair is self-extending, the extender does
    /// not exist, or the new edge would close a cycle.
    pub fn extend_role<R, E>(
        &mut self,
        roles: &[R],
        extenders: &[E],
        condition: Option<Condition>,
    ) -> Result<()>
    where
        R: AsRef<str>,
        E: AsRef<str>,
    {
        // Validate against a snapshot of the edge set, accumulating the
        // pending edges so pairs within one call see each other.
        let mut edges: HashMap<String, IndexSet<String>> = self
            .roles
            .iter()
            .map(|(name, role)| (name.clone(), role.extends.keys().cloned().collect()))
            .collect();
        let mut pending = Vec::new();

        for role in roles {
            for extender in extenders {
                let (role, extender) = (role.as_ref(), extender.as_ref());
                if role == extender {
                    return Err(AccessError::CircularExtension {
                        role: role.to_string(),
                        extender: extender.to_string(),
                        reason: "a role cannot extend itself".to_string(),
                    });
                }
                if !self.roles.contains_key(extender) {
                    return Err(AccessError::CircularExtension {
                        role: role.to_string(),
                        extender: extender.to_string(),
                        reason: format!("extender role '{}' does not exist", extender),
                    });
                }
                if Self::reaches(&edges, extender, role) {
                    return Err(AccessError::CircularExtension {
                        role: role.to_string(),
                        extender: extender.to_string(),
                        reason: "extension would create a cycle".to_string(),
                    });
                }
                edges
                    .entry(role.to_string())
                    .or_default()
                    .insert(extender.to_string());
                pending.push((role.to_string(), extender.to_string()));
            }
        }

        for (role, extender) in pending {
            let contribution = self.roles.get(&extender).map_or(0, |r| r.score) + 1;
            let entry = self.role_mut(&role);
            // Re-extending replaces the previous edge without double-counting
            if let Some(previous) = entry.extends.shift_remove(&extender) {
                entry.score -= previous.score;
            }
            entry.score += contribution;
            entry.extends.insert(
                extender.clone(),
                Extension {
                    score: contribution,
                    condition: condition.clone(),
                },
            );
            debug!(role, extender, contribution, "extended role");
        }
        Ok(())
    }

    /// Deletes the given roles and strips them from every remaining role's
    /// extension map, rolling back the recorded score contributions
    ///
    /// Operates on a de-duplicated, sorted list; unknown roles are ignored.
    pub fn remove_roles<R: AsRef<str>>(&mut self, roles: &[R]) {
        let mut targets: Vec<&str> = roles.iter().map(AsRef::as_ref).collect();
        targets.sort_unstable();
        targets.dedup();

        for target in &targets {
            if self.roles.shift_remove(*target).is_some() {
                debug!(role = target, "removed role");
            }
        }
        for role in self.roles.values_mut() {
            for target in &targets {
                if let Some(extension) = role.extends.shift_remove(*target) {
                    role.score -= extension.score;
                }
            }
        }
    }

    /// Every role transitively reachable from `roles` over `$extend`,
    /// collected exactly once
    ///
    /// The visited set makes the traversal tolerate cycles that bypassed the
    /// creation-time check. Unknown starting roles contribute nothing.
    pub fn reachable_roles<R: AsRef<str>>(&self, roles: &[R]) -> IndexSet<String> {
        let mut visited = IndexSet::new();
        let mut queue: VecDeque<&str> = roles
            .iter()
            .map(AsRef::as_ref)
            .filter(|name| self.roles.contains_key(*name))
            .collect();

        while let Some(name) = queue.pop_front() {
            if !visited.insert(name.to_string()) {
                continue;
            }
            if let Some(role) = self.roles.get(name) {
                for extender in role.extends.keys() {
                    if !visited.contains(extender.as_str())
                        && self.roles.contains_key(extender.as_str())
                    {
                        queue.push_back(extender);
                    }
                }
            }
        }
        visited
    }

    /// Grants across the inheritance-expanded role set matching the query's
    /// resource/action filters; conditions are not evaluated
    pub fn union_grants(&self, query: &Query) -> Vec<Grant> {
        let mut grants = Vec::new();
        for name in self.reachable_roles(&query.roles) {
            if let Some(role) = self.roles.get(&name) {
                for grant in &role.grants {
                    if grant.matches(query.resource.as_deref(), query.action, query.possession) {
                        grants.push(grant.clone());
                    }
                }
            }
        }
        grants
    }

    /// Deduplicated union of matching grants' attribute patterns
    pub fn union_attributes(&self, query: &Query) -> Vec<String> {
        let mut attributes = IndexSet::new();
        for grant in self.union_grants(query) {
            attributes.extend(grant.attributes);
        }
        attributes.into_iter().collect()
    }

    /// Distinct action keys granted to the role set on the queried resource
    pub fn union_actions(&self, query: &Query) -> Vec<String> {
        let mut actions = IndexSet::new();
        for grant in self.union_grants(query) {
            actions.insert(grant.action.to_string());
        }
        actions.into_iter().collect()
    }

    /// Distinct resources granted to the role set
    pub fn union_resources(&self, query: &Query) -> Vec<String> {
        let mut resources = IndexSet::new();
        for grant in self.union_grants(query) {
            resources.insert(grant.resource);
        }
        resources.into_iter().collect()
    }

    /// The subset of the directly supplied roles whose direct or inherited
    /// grants satisfy the query
    pub fn allowing_roles(&self, query: &Query) -> Vec<String> {
        let mut allowing = Vec::new();
        for name in &query.roles {
            if allowing.contains(name) {
                continue;
            }
            let reachable = self.reachable_roles(std::slice::from_ref(name));
            let allows = reachable.iter().any(|reached| {
                self.roles.get(reached).is_some_and(|role| {
                    role.grants.iter().any(|grant| {
                        grant.matches(query.resource.as_deref(), query.action, query.possession)
                    })
                })
            });
            if allows {
                allowing.push(name.clone());
            }
        }
        allowing
    }

    /// Looks up a role definition
    pub fn role(&self, name: &str) -> Option<&Role> {
        self.roles.get(name)
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.roles.contains_key(name)
    }

    pub fn role_count(&self) -> usize {
        self.roles.len()
    }

    /// All role names, in insertion order
    pub fn role_names(&self) -> Vec<String> {
        self.roles.keys().cloned().collect()
    }

    fn role_mut(&mut self, name: &str) -> &mut Role {
        self.roles.entry(name.to_string()).or_default()
    }

    fn reaches(edges: &HashMap<String, IndexSet<String>>, from: &str, target: &str) -> bool {
        let mut visited = IndexSet::new();
        let mut queue = VecDeque::from([from]);
        while let Some(current) = queue.pop_front() {
            if current == target {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(next) = edges.get(current) {
                queue.extend(next.iter().map(String::as_str));
            }
        }
        false
    }
}
