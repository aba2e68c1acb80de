//! Collaborator interfaces
//!
//! Everything the engine needs from its environment is passed in through
//! these traits instead of being reached through globals: configuration,
//! small durable state, the host command registry, and the loader for
//! external scripts. Tests drive the engine with in-memory fakes.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::{ExError, ExErrorKind, PaletteError};
use crate::model::{CommandSpec, InvocationContext};

// ========== Configuration ==========

/// Read-only view of the host configuration
pub trait ConfigurationProvider: Send + Sync {
    /// Raw value for a fully qualified key (`command-palette.commands`), if set
    fn get(&self, key: &str) -> Option<Value>;
}

/// Typed read of a configuration value, falling back to `default` when unset
///
/// # Errors
///
/// `MalformedSetting` if the value is present but does not deserialize as `T`.
pub fn read_setting<T: DeserializeOwned>(
    provider: &dyn ConfigurationProvider,
    key: &str,
    default: T,
) -> std::result::Result<T, PaletteError> {
    match provider.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => serde_json::from_value(value).map_err(|e| PaletteError::MalformedSetting {
            key: key.to_string(),
            reason: e.to_string(),
        }),
    }
}

impl ConfigurationProvider for HashMap<String, Value> {
    fn get(&self, key: &str) -> Option<Value> {
        HashMap::get(self, key).cloned()
    }
}

// ========== Durable state ==========

/// Partition of the durable key/value store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    /// Shared by every workspace on the machine
    Global,
    /// Private to the current workspace
    Workspace,
}

impl Partition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Global => "global",
            Partition::Workspace => "workspace",
        }
    }
}

/// Small durable key/value state (ScopeId, last-used script paths)
pub trait StateStore: Send + Sync {
    /// # Errors
    ///
    /// Backend failures (`Persistence`, `Serialization`).
    fn get(&self, partition: Partition, key: &str) -> Result<Option<Value>, ExError>;

    /// Store `value`, or remove the key when `None`
    ///
    /// # Errors
    ///
    /// Backend failures (`Persistence`, `Serialization`).
    fn set(&self, partition: Partition, key: &str, value: Option<Value>) -> Result<(), ExError>;
}

/// Process-local state store
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    values: Mutex<HashMap<(Partition, String), Value>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn get(&self, partition: Partition, key: &str) -> Result<Option<Value>, ExError> {
        let values = self.values.lock().map_err(|_| poisoned("state_get"))?;
        Ok(values.get(&(partition, key.to_string())).cloned())
    }

    fn set(&self, partition: Partition, key: &str, value: Option<Value>) -> Result<(), ExError> {
        let mut values = self.values.lock().map_err(|_| poisoned("state_set"))?;
        match value {
            Some(value) => values.insert((partition, key.to_string()), value),
            None => values.remove(&(partition, key.to_string())),
        };
        Ok(())
    }
}

fn poisoned(op: &str) -> ExError {
    ExError::new(ExErrorKind::Internal)
        .with_op(op)
        .with_message("state store lock poisoned")
}

// ========== Host command boundary ==========

/// Handler bound to a registered command id
pub type CommandHandler = Arc<dyn Fn() -> BoxFuture<'static, Result<(), ExError>> + Send + Sync>;

/// Severity of a message shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptLevel {
    Info,
    Error,
}

/// The editor-side command registry and user prompt
#[async_trait]
pub trait CommandHost: Send + Sync {
    /// Bind `handler` to `id` until `unregister_command`
    ///
    /// # Errors
    ///
    /// `Registration` if the host refuses the id.
    fn register_command(&self, id: &str, handler: CommandHandler) -> Result<(), ExError>;

    fn unregister_command(&self, id: &str);

    /// Invoke an existing host command with positional arguments
    ///
    /// # Errors
    ///
    /// Whatever the invoked command fails with.
    async fn execute_command(&self, id: &str, args: Vec<Value>) -> Result<(), ExError>;

    /// Set a context variable visible to `when` expressions
    ///
    /// # Errors
    ///
    /// Host failures.
    async fn set_context(&self, key: &str, value: Value) -> Result<(), ExError>;

    /// Show `message` with action buttons; returns the chosen action, if any
    async fn prompt(&self, level: PromptLevel, message: &str, actions: &[String])
        -> Option<String>;
}

// ========== External scripts ==========

/// Opaque behaviour loaded from an external script
#[async_trait]
pub trait CommandAction: Send + Sync {
    /// # Errors
    ///
    /// `ActionFailed` (or any error the action reports).
    async fn invoke(&self, args: Vec<Value>, context: InvocationContext) -> Result<(), ExError>;
}

/// One declaration read from an external script
#[derive(Clone)]
pub struct ExternalCommand {
    pub spec: CommandSpec,
    pub action: Arc<dyn CommandAction>,
}

impl std::fmt::Debug for ExternalCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalCommand")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

/// Turns a (cached) script file into command declarations
#[async_trait]
pub trait ScriptLoader: Send + Sync {
    /// Extension given to cached copies
    fn cache_extension(&self) -> &str {
        "json"
    }

    /// Load every declaration of `script`; `origin` is the configured source path
    ///
    /// # Errors
    ///
    /// `ScriptLoad` when the script cannot be parsed. A partial result is
    /// never returned.
    async fn load(&self, script: &Path, origin: &Path) -> Result<Vec<ExternalCommand>, ExError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_read_setting_default_when_unset() {
        let config: HashMap<String, Value> = HashMap::new();
        let value: Vec<CommandSpec> = read_setting(&config, "command-palette.commands", vec![])
            .unwrap();
        assert!(value.is_empty());
    }

    #[test]
    fn test_read_setting_malformed() {
        let mut config: HashMap<String, Value> = HashMap::new();
        config.insert("command-palette.commands".into(), json!({"not": "a list"}));
        let result: std::result::Result<Vec<CommandSpec>, _> =
            read_setting(&config, "command-palette.commands", vec![]);
        assert!(matches!(
            result,
            Err(PaletteError::MalformedSetting { .. })
        ));
    }

    #[test]
    fn test_memory_state_store_partitions() {
        let store = MemoryStateStore::new();
        store
            .set(Partition::Global, "k", Some(json!("g")))
            .unwrap();
        store
            .set(Partition::Workspace, "k", Some(json!("w")))
            .unwrap();

        assert_eq!(store.get(Partition::Global, "k").unwrap(), Some(json!("g")));
        assert_eq!(
            store.get(Partition::Workspace, "k").unwrap(),
            Some(json!("w"))
        );

        store.set(Partition::Global, "k", None).unwrap();
        assert_eq!(store.get(Partition::Global, "k").unwrap(), None);
        assert!(store.get(Partition::Workspace, "k").unwrap().is_some());
    }
}
