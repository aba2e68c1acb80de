//! External Source Loader
//!
//! Materializes the commands an external script contributes to one scope:
//! resolves the cached copy (refreshing it when stale), loads it through
//! the [`ScriptLoader`], and projects every declaration. The last-used
//! source path and the ids it contributed are kept in the state store so
//! staleness and failure retention survive restarts.

#![allow(clippy::result_large_err)]

use std::path::{Path, PathBuf};

use cmdpal_core::errors::{ExError, ExErrorKind};
use cmdpal_core::host::{Partition, ScriptLoader, StateStore};
use cmdpal_core::model::Scope;
use cmdpal_core::projector::{project_external, ProjectedCommand};
use cmdpal_store::ScriptCache;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// State key holding an [`ExternalSourceRecord`]
pub const EXTERNAL_SOURCE_KEY: &str = "externalSource";

/// What a scope's external source produced
#[derive(Debug, Clone)]
pub enum ExternalLoad {
    /// No source path is configured for the scope
    NotConfigured,
    /// The script was loaded (it may declare zero commands)
    Loaded {
        source: PathBuf,
        commands: Vec<ProjectedCommand>,
        refreshed: bool,
    },
}

impl ExternalLoad {
    pub fn commands(&self) -> &[ProjectedCommand] {
        match self {
            ExternalLoad::NotConfigured => &[],
            ExternalLoad::Loaded { commands, .. } => commands,
        }
    }
}

/// Persisted per-scope record of the last external source used
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalSourceRecord {
    pub source: PathBuf,
    /// Namespaced ids contributed by the last successful load
    #[serde(rename = "commandIds", default)]
    pub command_ids: Vec<String>,
}

/// Loads one scope's external script through the cache
pub struct ExternalSourceLoader<'a> {
    cache: &'a ScriptCache,
    state: &'a dyn StateStore,
    loader: &'a dyn ScriptLoader,
}

impl<'a> ExternalSourceLoader<'a> {
    pub fn new(
        cache: &'a ScriptCache,
        state: &'a dyn StateStore,
        loader: &'a dyn ScriptLoader,
    ) -> Self {
        Self {
            cache,
            state,
            loader,
        }
    }

    /// The stored record for `scope`, if any
    ///
    /// A record that no longer parses is treated as absent.
    ///
    /// # Errors
    ///
    /// State store failures.
    pub fn record(&self, scope: &Scope) -> Result<Option<ExternalSourceRecord>, ExError> {
        let Some(value) = self.state.get(partition_of(scope), EXTERNAL_SOURCE_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_value(value) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(scope = scope.key(), error = %e, "Ignoring unreadable external source record");
                Ok(None)
            }
        }
    }

    fn store_record(&self, scope: &Scope, record: Option<&ExternalSourceRecord>) -> Result<(), ExError> {
        let value = record
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| {
                ExError::new(ExErrorKind::Serialization)
                    .with_op("store_external_record")
                    .with_message(e.to_string())
            })?;
        self.state
            .set(partition_of(scope), EXTERNAL_SOURCE_KEY, value)
    }

    /// Load the commands `source` contributes to `scope`
    ///
    /// With no source the scope's cache and record are torn down. A
    /// relative source is made absolute before it is cached or recorded.
    ///
    /// # Errors
    ///
    /// `Io` if the cache cannot be refreshed, `ScriptLoad` if the script
    /// cannot be parsed. On `ScriptLoad` the record keeps the ids of the
    /// previous successful load.
    pub async fn load(&self, scope: &Scope, source: Option<&Path>) -> Result<ExternalLoad, ExError> {
        let Some(source) = source.map(absolute).transpose()? else {
            if self.cache.teardown(scope.key())? {
                debug!(scope = scope.key(), "Tore down external source cache");
            }
            self.store_record(scope, None)?;
            return Ok(ExternalLoad::NotConfigured);
        };

        let source = source.as_path();
        let previous = self.record(scope)?;
        let last_used = previous.as_ref().map(|r| r.source.as_path());
        let cached = self
            .cache
            .resolve(scope.key(), source, last_used, self.loader.cache_extension())
            .map_err(|e| e.with_scope(scope.key()))?;

        if cached.refreshed {
            // Record the new path now; keep the old ids until a load succeeds
            let carried = ExternalSourceRecord {
                source: source.to_path_buf(),
                command_ids: previous.map(|r| r.command_ids).unwrap_or_default(),
            };
            self.store_record(scope, Some(&carried))?;
        }

        let declarations = self
            .loader
            .load(&cached.path, source)
            .await
            .map_err(|e| e.with_scope(scope.key()))?;

        let commands: Vec<ProjectedCommand> = declarations
            .iter()
            .map(|d| project_external(d, scope.workspace_id(), source))
            .collect();

        let record = ExternalSourceRecord {
            source: source.to_path_buf(),
            command_ids: commands.iter().map(|c| c.id().to_string()).collect(),
        };
        self.store_record(scope, Some(&record))?;

        debug!(
            scope = scope.key(),
            source = %source.display(),
            count = commands.len(),
            "Loaded external commands"
        );
        Ok(ExternalLoad::Loaded {
            source: source.to_path_buf(),
            commands,
            refreshed: cached.refreshed,
        })
    }
}

/// Relative paths are taken from the current directory, so the recorded
/// last-used source always names one file
fn absolute(path: &Path) -> Result<PathBuf, ExError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|e| {
            ExError::new(ExErrorKind::Io)
                .with_op("resolve_script_path")
                .with_path(path)
                .with_message(e.to_string())
        })
}

fn partition_of(scope: &Scope) -> Partition {
    match scope {
        Scope::Global => Partition::Global,
        Scope::Workspace(_) => Partition::Workspace,
    }
}
