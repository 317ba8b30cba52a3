//! Variable scope persistence use cases
//!
//! Scopes are stored verbatim as JSON blobs: `global` holds the global
//! variables, `collection` maps collection ids to their variables and
//! `env_<id>` holds one environment.

use std::collections::HashMap;

use courier_domain::{ActiveEnvironment, VariableMap, VariableStore};
use serde_json::Value;
use tracing::{debug, info};

use crate::ApplicationResult;
use crate::ports::{KeyValueStore, StorageError};

/// Key of the global scope blob.
pub const GLOBAL_KEY: &str = "global";

/// Key of the collection scopes blob.
pub const COLLECTION_KEY: &str = "collection";

/// Key of one environment's blob.
#[must_use]
pub fn environment_key(environment_id: &str) -> String {
    format!("env_{environment_id}")
}

fn decode<T: serde::de::DeserializeOwned + Default>(
    values: &mut HashMap<String, Value>,
    key: &str,
) -> Result<T, StorageError> {
    values.remove(key).map_or_else(
        || Ok(T::default()),
        |value| {
            serde_json::from_value(value).map_err(|e| StorageError::InvalidData {
                key: key.to_string(),
                message: e.to_string(),
            })
        },
    )
}

fn encode(value: &impl serde::Serialize) -> Result<Value, StorageError> {
    serde_json::to_value(value).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Builds a [`VariableStore`] from persisted scopes.
pub struct LoadVariableScopes<S> {
    store: S,
}

impl<S: KeyValueStore> LoadVariableScopes<S> {
    /// Creates a new `LoadVariableScopes` use case.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Loads global and collection scopes, plus the given environment.
    /// Missing blobs load as empty scopes.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read or a blob is malformed.
    pub async fn execute(&self, environment_id: Option<&str>) -> ApplicationResult<VariableStore> {
        let env_key = environment_id.map(environment_key);
        let mut keys = vec![GLOBAL_KEY, COLLECTION_KEY];
        if let Some(key) = &env_key {
            keys.push(key);
        }

        let mut values = self.store.get(&keys).await?;
        let mut variables = VariableStore::new();
        variables.replace_global(decode(&mut values, GLOBAL_KEY)?);
        variables.replace_collections(decode(&mut values, COLLECTION_KEY)?);

        if let (Some(id), Some(key)) = (environment_id, &env_key) {
            let env: VariableMap = decode(&mut values, key)?;
            variables.activate_environment(ActiveEnvironment::new(id, env));
        }

        debug!(environment = ?environment_id, "variable scopes loaded");
        Ok(variables)
    }
}

/// Writes every persistent scope of a [`VariableStore`] back to the store.
/// The runtime scope is never persisted.
pub struct FlushVariableScopes<S> {
    store: S,
}

impl<S: KeyValueStore> FlushVariableScopes<S> {
    /// Creates a new `FlushVariableScopes` use case.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Flushes global, collection and active environment scopes.
    ///
    /// # Errors
    /// Returns an error if the store cannot be written.
    pub async fn execute(&self, variables: &VariableStore) -> ApplicationResult<()> {
        let mut entries = HashMap::new();
        entries.insert(GLOBAL_KEY.to_string(), encode(variables.global())?);
        entries.insert(COLLECTION_KEY.to_string(), encode(variables.collections())?);
        if let Some(env) = variables.active_environment() {
            entries.insert(environment_key(&env.id), encode(&env.variables)?);
        }
        self.store.set(entries).await?;
        Ok(())
    }
}

/// Swaps the active environment, persisting the outgoing one first.
pub struct SwitchEnvironment<S> {
    store: S,
}

impl<S: KeyValueStore> SwitchEnvironment<S> {
    /// Creates a new `SwitchEnvironment` use case.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Activates `environment_id` (or none), returning the id that was active.
    ///
    /// # Errors
    /// Returns an error if the outgoing environment cannot be written or the
    /// incoming one cannot be read.
    pub async fn execute(
        &self,
        variables: &mut VariableStore,
        environment_id: Option<&str>,
    ) -> ApplicationResult<Option<String>> {
        if let Some(outgoing) = variables.active_environment() {
            let mut entries = HashMap::new();
            entries.insert(environment_key(&outgoing.id), encode(&outgoing.variables)?);
            self.store.set(entries).await?;
        }

        let previous = match environment_id {
            Some(id) => {
                let key = environment_key(id);
                let mut values = self.store.get(&[key.as_str()]).await?;
                let env: VariableMap = decode(&mut values, &key)?;
                variables.activate_environment(ActiveEnvironment::new(id, env))
            }
            None => variables.deactivate_environment(),
        };

        let previous = previous.map(|env| env.id);
        info!(from = ?previous, to = ?environment_id, "environment switched");
        Ok(previous)
    }
}
