//! Access control engine
//!
//! [`AccessControl`] ties the grant store and the condition evaluator
//! together: grant management delegates to the store, while
//! [`permission`](AccessControl::permission) walks the inheritance graph
//! with the query context in hand, evaluating extension and grant
//! conditions along the way.

mod permission;

use std::collections::VecDeque;

use indexmap::IndexSet;
use serde_json::Value;
use tracing::debug;

use crate::condition::{Condition, ConditionEvaluator, Predicate};
use crate::error::{AccessError, Result};
use crate::store::GrantStore;
use crate::types::{Grant, Query};

pub use permission::Permission;

/// Role and attribute based access control engine
///
/// Holds a [`GrantStore`] of role definitions and a
/// [`ConditionEvaluator`] for conditional grants. Cheap to construct;
/// queries take `&self`, so a populated engine can be shared behind an
/// `Arc`.
#[derive(Debug, Default)]
pub struct AccessControl {
    store: GrantStore,
    evaluator: ConditionEvaluator,
}

impl AccessControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the role model with `input`, which may be either the
    /// nested object shape or a flat array of grant records
    ///
    /// Validation happens against a staged copy; on error the previous
    /// model is untouched.
    pub fn set_grants(&mut self, input: Value) -> Result<()> {
        self.store.set_grants(input)
    }

    /// Adds a single grant to `role`, creating the role if absent
    pub fn grant(&mut self, role: impl AsRef<str>, grant: Grant) {
        self.store.grant(role, grant);
    }

    /// Makes every role in `roles` inherit from every role in
    /// `extenders`, optionally gated by `condition`
    ///
    /// A gated extension is only followed during [`permission`]
    /// resolution when its condition holds for the query context; the
    /// condition-free accessors treat the edge as unconditional.
    ///
    /// [`permission`]: AccessControl::permission
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
        self.store.extend_role(roles, extenders, condition)
    }

    /// Deletes roles and every inheritance edge pointing at them
    pub fn remove_roles<R: AsRef<str>>(&mut self, roles: &[R]) {
        self.store.remove_roles(roles);
    }

    /// Registers a custom predicate under `name`, shadowing any built-in
    /// of the same name
    pub fn register_predicate(&mut self, name: impl Into<String>, predicate: impl Predicate + 'static) {
        self.evaluator.register(name, predicate);
    }

    /// Resolves the query into a [`Permission`]
    ///
    /// Walks the query's roles and their transitive extensions
    /// breadth-first. An extension carrying a condition is only followed
    /// when the condition holds for the query context; a matching grant
    /// contributes its attributes only when its own condition holds.
    /// The result is granted when at least one attribute pattern was
    /// collected.
    ///
    /// # Errors
    ///
    /// `MissingRequiredField` when the query names no roles; condition
    /// evaluation errors (`UnknownPredicate`, `InvalidConditionArgs`,
    /// `PredicateFailed`) propagate.
    pub async fn permission(&self, query: &Query) -> Result<Permission> {
        Self::require_roles(query)?;
        let context = query.context.as_ref();

        let mut visited: IndexSet<String> = IndexSet::new();
        let mut queue: VecDeque<String> = query
            .roles
            .iter()
            .filter(|name| self.store.has_role(name))
            .cloned()
            .collect();
        let mut attributes: IndexSet<String> = IndexSet::new();

        while let Some(name) = queue.pop_front() {
            if !visited.insert(name.clone()) {
                continue;
            }
            let Some(role) = self.store.role(&name) else {
                continue;
            };
            for grant in &role.grants {
                if !grant.matches(query.resource.as_deref(), query.action, query.possession) {
                    continue;
                }
                if self.evaluator.evaluate(grant.condition.as_ref(), context).await? {
                    attributes.extend(grant.attributes.iter().cloned());
                } else {
                    debug!(role = %name, resource = %grant.resource, "grant condition rejected");
                }
            }
            for (extender, extension) in &role.extends {
                if visited.contains(extender) || !self.store.has_role(extender) {
                    continue;
                }
                if self.evaluator.evaluate(extension.condition.as_ref(), context).await? {
                    queue.push_back(extender.clone());
                } else {
                    debug!(role = %name, extender, "extension condition rejected");
                }
            }
        }

        let attributes: Vec<String> = attributes.into_iter().collect();
        debug!(
            roles = ?query.roles,
            resource = query.resource.as_deref().unwrap_or("*"),
            granted = !attributes.is_empty(),
            "resolved permission"
        );
        Ok(Permission::new(attributes))
    }

    /// Grants matching the query across the inheritance-expanded role
    /// set, conditions attached but not evaluated
    pub fn allowed_grants(&self, query: &Query) -> Result<Vec<Grant>> {
        Self::require_roles(query)?;
        Ok(self.store.union_grants(query))
    }

    /// Deduplicated attribute patterns of every matching grant,
    /// ignoring conditions
    pub fn allowed_attributes(&self, query: &Query) -> Result<Vec<String>> {
        Self::require_roles(query)?;
        Ok(self.store.union_attributes(query))
    }

    /// Distinct action keys the role set holds on the queried resource
    pub fn allowed_actions(&self, query: &Query) -> Result<Vec<String>> {
        Self::require_roles(query)?;
        Ok(self.store.union_actions(query))
    }

    /// Distinct resources the role set holds any matching grant on
    pub fn allowed_resources(&self, query: &Query) -> Result<Vec<String>> {
        Self::require_roles(query)?;
        Ok(self.store.union_resources(query))
    }

    /// The subset of the query's own roles that would satisfy it,
    /// directly or through inheritance
    pub fn allowing_roles(&self, query: &Query) -> Result<Vec<String>> {
        Self::require_roles(query)?;
        Ok(self.store.allowing_roles(query))
    }

    /// Read access to the underlying role model
    pub fn store(&self) -> &GrantStore {
        &self.store
    }

    fn require_roles(query: &Query) -> Result<()> {
        if query.roles.is_empty() {
            return Err(AccessError::MissingRequiredField {
                field: "role",
                context: "query",
            });
        }
        Ok(())
    }
}
