//! Multi-scope variable store
//!
//! Holds every variable scope a request can draw from. Lookups run in the
//! order given by [`VariableScope::RESOLUTION_ORDER`]; the first enabled hit
//! wins.
//!
//! The store is a plain value with no interior mutability. Share it across
//! OS threads only behind a lock.

use std::collections::HashMap;

use super::variable::{ResolvedVariable, Variable, VariableMap, VariableScope};
use crate::error::{DomainError, DomainResult};

/// Addresses one concrete scope store for writes and direct reads.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScopeTarget {
    /// The global store.
    Global,
    /// The active environment.
    Environment,
    /// The store of the collection with this id.
    Collection(String),
    /// The ephemeral runtime store.
    Runtime,
}

/// The environment currently resolvable, with its variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveEnvironment {
    /// Environment identifier (used for the `env_<id>` persistence key).
    pub id: String,
    /// Variables of this environment.
    pub variables: VariableMap,
}

impl ActiveEnvironment {
    /// Creates an active environment from its id and variables.
    #[must_use]
    pub fn new(id: impl Into<String>, variables: VariableMap) -> Self {
        Self {
            id: id.into(),
            variables,
        }
    }
}

/// Scoped key/value storage for variables.
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    global: VariableMap,
    environment: Option<ActiveEnvironment>,
    collections: HashMap<String, VariableMap>,
    current_collection: Option<String>,
    runtime: VariableMap,
}

impl VariableStore {
    /// Creates an empty store with no active environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines (inserts or replaces) a variable in the target scope.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidIdentifier`] for a blank name and
    /// [`DomainError::NoActiveEnvironment`] when writing to the environment
    /// scope while none is active.
    pub fn define(
        &mut self,
        target: &ScopeTarget,
        name: impl Into<String>,
        variable: Variable,
    ) -> DomainResult<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::InvalidIdentifier(name));
        }
        self.scope_mut(target)?.insert(name, variable);
        Ok(())
    }

    /// Sets only the value of a variable, keeping an existing description.
    ///
    /// # Errors
    ///
    /// Same as [`Self::define`].
    pub fn set_value(
        &mut self,
        target: &ScopeTarget,
        name: &str,
        value: impl Into<String>,
    ) -> DomainResult<()> {
        let variable = match self.get(target, name) {
            Some(existing) => Variable {
                value: value.into(),
                ..existing.clone()
            },
            None => Variable::new(value),
        };
        self.define(target, name, variable)
    }

    /// Deletes a variable from the target scope, returning it if present.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NoActiveEnvironment`] when targeting the
    /// environment scope while none is active.
    pub fn delete(&mut self, target: &ScopeTarget, name: &str) -> DomainResult<Option<Variable>> {
        Ok(self.scope_mut(target)?.remove(name))
    }

    /// Reads a variable from one specific scope.
    #[must_use]
    pub fn get(&self, target: &ScopeTarget, name: &str) -> Option<&Variable> {
        self.scope(target).and_then(|scope| scope.get(name))
    }

    /// Returns the variables of one specific scope, if that scope exists.
    #[must_use]
    pub fn scope(&self, target: &ScopeTarget) -> Option<&VariableMap> {
        match target {
            ScopeTarget::Global => Some(&self.global),
            ScopeTarget::Environment => self.environment.as_ref().map(|env| &env.variables),
            ScopeTarget::Collection(id) => self.collections.get(id),
            ScopeTarget::Runtime => Some(&self.runtime),
        }
    }

    fn scope_mut(&mut self, target: &ScopeTarget) -> DomainResult<&mut VariableMap> {
        match target {
            ScopeTarget::Global => Ok(&mut self.global),
            ScopeTarget::Environment => self
                .environment
                .as_mut()
                .map(|env| &mut env.variables)
                .ok_or(DomainError::NoActiveEnvironment),
            ScopeTarget::Collection(id) => Ok(self.collections.entry(id.clone()).or_default()),
            ScopeTarget::Runtime => Ok(&mut self.runtime),
        }
    }

    /// Resolves a name across scopes, first enabled hit wins.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<ResolvedVariable> {
        VariableScope::RESOLUTION_ORDER.iter().find_map(|scope| {
            self.scope_for(*scope)
                .and_then(|vars| vars.get(name))
                .and_then(Variable::enabled_value)
                .map(|value| ResolvedVariable::new(name, value, *scope))
        })
    }

    /// Resolves a name to just its value.
    #[must_use]
    pub fn resolve_value(&self, name: &str) -> Option<String> {
        self.resolve(name).map(|resolved| resolved.value)
    }

    fn scope_for(&self, scope: VariableScope) -> Option<&VariableMap> {
        match scope {
            VariableScope::Runtime => Some(&self.runtime),
            VariableScope::Environment => self.environment.as_ref().map(|env| &env.variables),
            VariableScope::Global => Some(&self.global),
            VariableScope::Collection => self
                .current_collection
                .as_ref()
                .and_then(|id| self.collections.get(id)),
        }
    }

    /// Makes `environment` the only resolvable environment, returning the
    /// previously active one.
    pub fn activate_environment(
        &mut self,
        environment: ActiveEnvironment,
    ) -> Option<ActiveEnvironment> {
        self.environment.replace(environment)
    }

    /// Deactivates the current environment, returning it.
    pub fn deactivate_environment(&mut self) -> Option<ActiveEnvironment> {
        self.environment.take()
    }

    /// Returns the active environment, if any.
    #[must_use]
    pub const fn active_environment(&self) -> Option<&ActiveEnvironment> {
        self.environment.as_ref()
    }

    /// Selects which collection store takes part in resolution.
    pub fn set_current_collection(&mut self, collection_id: Option<String>) {
        self.current_collection = collection_id;
    }

    /// Returns the id of the collection taking part in resolution.
    #[must_use]
    pub fn current_collection(&self) -> Option<&str> {
        self.current_collection.as_deref()
    }

    /// Drops every runtime variable.
    pub fn clear_runtime(&mut self) {
        self.runtime.clear();
    }

    /// Swaps in a new runtime scope, returning the one it replaces.
    ///
    /// Lets concurrent executions sharing one store each keep their own
    /// runtime variables.
    pub fn replace_runtime(&mut self, runtime: VariableMap) -> VariableMap {
        std::mem::replace(&mut self.runtime, runtime)
    }

    /// Returns the global variables.
    #[must_use]
    pub const fn global(&self) -> &VariableMap {
        &self.global
    }

    /// Replaces the global variables wholesale.
    pub fn replace_global(&mut self, variables: VariableMap) {
        self.global = variables;
    }

    /// Returns all collection stores keyed by collection id.
    #[must_use]
    pub const fn collections(&self) -> &HashMap<String, VariableMap> {
        &self.collections
    }

    /// Replaces all collection stores wholesale.
    pub fn replace_collections(&mut self, collections: HashMap<String, VariableMap>) {
        self.collections = collections;
    }

    /// Returns every resolvable variable name, sorted and deduplicated.
    #[must_use]
    pub fn all_variable_names(&self) -> Vec<String> {
        let mut names: Vec<String> = VariableScope::RESOLUTION_ORDER
            .iter()
            .filter_map(|scope| self.scope_for(*scope))
            .flat_map(|vars| vars.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn store_with_env() -> VariableStore {
        let mut store = VariableStore::new();
        store.activate_environment(ActiveEnvironment::new("dev", VariableMap::new()));
        store
    }

    #[test]
    fn test_resolve_single_scope() {
        let mut store = store_with_env();
        store
            .define(&ScopeTarget::Global, "app", Variable::new("courier"))
            .unwrap();

        let resolved = store.resolve("app").expect("should resolve");
        assert_eq!(resolved.value, "courier");
        assert_eq!(resolved.scope, VariableScope::Global);
    }

    #[test]
    fn test_environment_shadows_global() {
        let mut store = store_with_env();
        store
            .define(&ScopeTarget::Global, "host", Variable::new("global.example"))
            .unwrap();
        store
            .define(&ScopeTarget::Environment, "host", Variable::new("env.example"))
            .unwrap();

        let resolved = store.resolve("host").unwrap();
        assert_eq!(resolved.value, "env.example");
        assert_eq!(resolved.scope, VariableScope::Environment);
    }

    #[test]
    fn test_global_shadows_collection() {
        let mut store = store_with_env();
        store.set_current_collection(Some("orders".to_string()));
        store
            .define(
                &ScopeTarget::Collection("orders".to_string()),
                "page",
                Variable::new("2"),
            )
            .unwrap();
        assert_eq!(store.resolve_value("page"), Some("2".to_string()));

        store
            .define(&ScopeTarget::Global, "page", Variable::new("1"))
            .unwrap();
        assert_eq!(store.resolve_value("page"), Some("1".to_string()));
    }

    #[test]
    fn test_collection_requires_current_selection() {
        let mut store = VariableStore::new();
        store
            .define(
                &ScopeTarget::Collection("orders".to_string()),
                "page",
                Variable::new("2"),
            )
            .unwrap();
        assert_eq!(store.resolve("page"), None);

        store.set_current_collection(Some("orders".to_string()));
        assert_eq!(store.resolve_value("page"), Some("2".to_string()));
    }

    #[test]
    fn test_runtime_resolves_first() {
        let mut store = store_with_env();
        store
            .define(&ScopeTarget::Environment, "token", Variable::new("old"))
            .unwrap();
        store
            .define(&ScopeTarget::Runtime, "token", Variable::new("fresh"))
            .unwrap();
        assert_eq!(store.resolve_value("token"), Some("fresh".to_string()));

        store.clear_runtime();
        assert_eq!(store.resolve_value("token"), Some("old".to_string()));
    }

    #[test]
    fn test_replace_runtime_swaps_scopes() {
        let mut store = VariableStore::new();
        store
            .define(&ScopeTarget::Runtime, "step", Variable::new("a"))
            .unwrap();

        let mut other = VariableMap::new();
        other.insert("step".to_string(), Variable::new("b"));
        let previous = store.replace_runtime(other);
        assert_eq!(store.resolve_value("step"), Some("b".to_string()));

        let swapped = store.replace_runtime(previous);
        assert_eq!(swapped.get("step").map(|v| v.value.as_str()), Some("b"));
        assert_eq!(store.resolve_value("step"), Some("a".to_string()));
    }

    #[test]
    fn test_disabled_variable_falls_through() {
        let mut store = store_with_env();
        store
            .define(&ScopeTarget::Environment, "host", Variable::disabled("off"))
            .unwrap();
        store
            .define(&ScopeTarget::Global, "host", Variable::new("on"))
            .unwrap();
        assert_eq!(store.resolve_value("host"), Some("on".to_string()));
    }

    #[test]
    fn test_environment_write_without_active_environment() {
        let mut store = VariableStore::new();
        let result = store.define(&ScopeTarget::Environment, "x", Variable::new("1"));
        assert_eq!(result, Err(DomainError::NoActiveEnvironment));
    }

    #[test]
    fn test_blank_name_rejected() {
        let mut store = VariableStore::new();
        let result = store.define(&ScopeTarget::Global, "  ", Variable::new("1"));
        assert!(matches!(result, Err(DomainError::InvalidIdentifier(_))));
    }

    #[test]
    fn test_switching_environment_hides_previous_variables() {
        let mut store = store_with_env();
        store
            .define(&ScopeTarget::Environment, "host", Variable::new("dev.local"))
            .unwrap();

        let previous = store
            .activate_environment(ActiveEnvironment::new("prod", VariableMap::new()))
            .unwrap();
        assert_eq!(previous.id, "dev");
        assert!(previous.variables.contains_key("host"));
        assert_eq!(store.resolve("host"), None);
    }

    #[test]
    fn test_delete_is_explicit() {
        let mut store = VariableStore::new();
        store
            .define(&ScopeTarget::Global, "a", Variable::new("1"))
            .unwrap();
        let removed = store.delete(&ScopeTarget::Global, "a").unwrap();
        assert_eq!(removed, Some(Variable::new("1")));
        assert_eq!(store.delete(&ScopeTarget::Global, "a").unwrap(), None);
    }

    #[test]
    fn test_set_value_keeps_description() {
        let mut store = VariableStore::new();
        store
            .define(
                &ScopeTarget::Global,
                "token",
                Variable::new("a").with_description("auth token"),
            )
            .unwrap();
        store.set_value(&ScopeTarget::Global, "token", "b").unwrap();

        let var = store.get(&ScopeTarget::Global, "token").unwrap();
        assert_eq!(var.value, "b");
        assert_eq!(var.description, "auth token");
    }

    #[test]
    fn test_all_variable_names() {
        let mut store = store_with_env();
        store
            .define(&ScopeTarget::Global, "b", Variable::new("1"))
            .unwrap();
        store
            .define(&ScopeTarget::Environment, "a", Variable::new("2"))
            .unwrap();
        store
            .define(&ScopeTarget::Environment, "b", Variable::new("3"))
            .unwrap();
        assert_eq!(store.all_variable_names(), vec!["a", "b"]);
    }
}
