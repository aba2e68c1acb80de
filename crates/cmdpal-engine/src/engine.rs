//! Palette engine: reconciliation passes and lifecycle
//!
//! ## Pass pipeline (in order):
//! 1. Read and validate settings (ConfigError is a hard stop) and anchor
//!    relative script paths to the user settings and workspace roots
//! 2. Resolve this workspace's ScopeId
//! 3. Read the persisted manifest and validate its pairing (hard stop)
//! 4. Project settings commands (global, then workspace)
//! 5. Load external scripts per scope; a `ScriptLoad` failure keeps the
//!    scope's previous entries and is reported, not fatal
//! 6. Reconcile (foreign-workspace preservation, change detection)
//! 7. Write the manifest atomically when changed
//! 8. Bind actions when registration was requested
//!
//! Passes are serialized: a pass triggered while another runs waits for
//! it. The restart prompt and failure notices are shown after the pass
//! lock is released.

#![allow(clippy::result_large_err)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use cmdpal_core::errors::{ExError, ExErrorKind};
use cmdpal_core::host::{
    CommandHost, ConfigurationProvider, Partition, PromptLevel, ScriptLoader, StateStore,
};
use cmdpal_core::model::{Scope, ScopeId};
use cmdpal_core::naming::SCOPE_CONTEXT_KEY;
use cmdpal_core::projector::project_setting;
use cmdpal_core::reconcile::{reconcile, Contribution, SourceKind};
use cmdpal_core::settings::{affects_configuration, PaletteSettings};
use cmdpal_core::{log_op_end, log_op_error, log_op_start};
use cmdpal_core_types::PassId;
use cmdpal_store::{ManifestFile, ScriptCache};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::external::{ExternalLoad, ExternalSourceLoader};
use crate::registration::RegistrationDriver;

/// Host command that restarts the editor window
pub const DEFAULT_RELOAD_COMMAND: &str = "workbench.action.reloadWindow";

pub const RESTART_MESSAGE: &str =
    "Command palette entries have been updated. Please restart to apply them.";
pub const RESTART_ACTION: &str = "Restart";

/// State key holding the workspace's ScopeId
pub const WORKSPACE_ID_KEY: &str = "workspaceId";

/// Operation name on the events bracketing every pass
pub const OP_PASS: &str = "reconcile_pass";

/// Fixed locations and host command names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    pub manifest_path: PathBuf,
    pub cache_root: PathBuf,
    pub reload_command: String,
    /// Directory relative `commandsFromFile` paths resolve against
    pub user_settings_root: Option<PathBuf>,
    /// Directory relative `workspaceCommandsFromFile` paths resolve against
    pub workspace_root: Option<PathBuf>,
}

impl EngineOptions {
    pub fn new(manifest_path: impl Into<PathBuf>, cache_root: impl Into<PathBuf>) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            cache_root: cache_root.into(),
            reload_command: DEFAULT_RELOAD_COMMAND.to_string(),
            user_settings_root: None,
            workspace_root: None,
        }
    }

    pub fn with_user_settings_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.user_settings_root = Some(root.into());
        self
    }

    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    pub fn with_reload_command(mut self, command: impl Into<String>) -> Self {
        self.reload_command = command.into();
        self
    }
}

/// What one pass did
#[derive(Debug, Clone)]
pub struct PassReport {
    pub pass_id: PassId,
    pub scope_id: ScopeId,
    /// The computed entries differ from the persisted manifest
    pub changed: bool,
    /// The manifest file was rewritten
    pub written: bool,
    pub entries: usize,
    pub registered: usize,
    pub foreign_preserved: usize,
    pub retained: usize,
    /// External sources that failed to load this pass
    pub scope_failures: Vec<ExError>,
    /// The user chose to restart after the write
    pub restart_requested: bool,
}

/// The collaborators a [`PaletteEngine`] runs against
pub struct Collaborators {
    pub config: Arc<dyn ConfigurationProvider>,
    pub state: Arc<dyn StateStore>,
    pub host: Arc<dyn CommandHost>,
    pub loader: Arc<dyn ScriptLoader>,
}

/// Keeps the manifest in sync with the user's declared commands
pub struct PaletteEngine {
    options: EngineOptions,
    config: Arc<dyn ConfigurationProvider>,
    state: Arc<dyn StateStore>,
    host: Arc<dyn CommandHost>,
    loader: Arc<dyn ScriptLoader>,
    manifest: ManifestFile,
    cache: ScriptCache,
    registration: RegistrationDriver,
    pass_lock: Mutex<()>,
}

impl PaletteEngine {
    pub fn new(options: EngineOptions, collaborators: Collaborators) -> Self {
        let registration = RegistrationDriver::new(&collaborators.host);
        Self {
            manifest: ManifestFile::new(&options.manifest_path),
            cache: ScriptCache::new(&options.cache_root),
            options,
            config: collaborators.config,
            state: collaborators.state,
            host: collaborators.host,
            loader: collaborators.loader,
            registration,
            pass_lock: Mutex::new(()),
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn bound_ids(&self) -> Vec<String> {
        self.registration.bound_ids()
    }

    /// Process start: publish the ScopeId, then a full pass with registration
    ///
    /// # Errors
    ///
    /// Any error that aborts the pass; it has already been shown to the user.
    pub async fn activate(&self) -> Result<PassReport, ExError> {
        let scope_id = self.ensure_scope_id()?;
        self.host
            .set_context(SCOPE_CONTEXT_KEY, Value::String(scope_id.to_string()))
            .await?;
        self.run_pass(true).await
    }

    /// Configuration change: re-run without new bindings
    ///
    /// Returns `None` when no changed key belongs to the `command-palette`
    /// section.
    ///
    /// # Errors
    ///
    /// Any error that aborts the pass; it has already been shown to the user.
    pub async fn on_configuration_changed(
        &self,
        changed_keys: &[&str],
    ) -> Result<Option<PassReport>, ExError> {
        if !changed_keys.iter().any(|k| affects_configuration(k)) {
            return Ok(None);
        }
        self.run_pass(false).await.map(Some)
    }

    /// Process end: release every binding
    pub fn deactivate(&self) -> usize {
        self.registration.release_all()
    }

    /// Run one full pass, then prompt the user as needed
    ///
    /// # Errors
    ///
    /// Any error that aborts the pass; the previous manifest is untouched.
    pub async fn run_pass(&self, register: bool) -> Result<PassReport, ExError> {
        let pass_id = PassId::new();
        let start = Instant::now();
        log_op_start!(OP_PASS, pass_id = pass_id.as_str(), register);

        let result = {
            let _guard = self.pass_lock.lock().await;
            self.reconcile_locked(&pass_id, register).await
        };

        match result {
            Ok(mut report) => {
                log_op_end!(
                    OP_PASS,
                    duration_ms = start.elapsed().as_millis() as u64,
                    pass_id = pass_id.as_str(),
                    changed = report.changed,
                    written = report.written,
                    registered = report.registered,
                    scope_failures = report.scope_failures.len()
                );
                for failure in &report.scope_failures {
                    self.host
                        .prompt(PromptLevel::Error, &failure.to_string(), &[])
                        .await;
                }
                if report.written {
                    report.restart_requested = self.prompt_restart().await;
                }
                Ok(report)
            }
            Err(err) => {
                let err = err.with_pass_id(pass_id.clone());
                log_op_error!(
                    OP_PASS,
                    err,
                    duration_ms = start.elapsed().as_millis() as u64,
                    pass_id = pass_id.as_str()
                );
                self.host
                    .prompt(PromptLevel::Error, &err.to_string(), &[])
                    .await;
                Err(err)
            }
        }
    }

    async fn reconcile_locked(&self, pass_id: &PassId, register: bool) -> Result<PassReport, ExError> {
        let settings = PaletteSettings::read(self.config.as_ref())
            .map_err(|e| ExError::from(e).with_op("read_settings"))?
            .resolve_relative(
                self.options.user_settings_root.as_deref(),
                self.options.workspace_root.as_deref(),
            );
        let scope_id = self.ensure_scope_id()?;
        let workspace = Scope::Workspace(scope_id.clone());

        let (document, persisted) = self.manifest.read_entries()?;

        let mut contributions = vec![
            Contribution::commands(
                SourceKind::SettingsGlobal,
                settings
                    .commands
                    .iter()
                    .map(|spec| project_setting(spec, None))
                    .collect(),
            ),
            Contribution::commands(
                SourceKind::SettingsWorkspace,
                settings
                    .workspace_commands
                    .iter()
                    .map(|spec| project_setting(spec, Some(&scope_id)))
                    .collect(),
            ),
        ];

        let mut scope_failures = Vec::new();
        let external = [
            (
                SourceKind::ExternalGlobal,
                Scope::Global,
                settings.commands_from_file.as_deref(),
            ),
            (
                SourceKind::ExternalWorkspace,
                workspace,
                settings.workspace_commands_from_file.as_deref(),
            ),
        ];
        for (source_kind, scope, source) in external {
            match self.load_external(&scope, source).await {
                Ok(load) => contributions.push(Contribution::commands(
                    source_kind,
                    load.commands().to_vec(),
                )),
                Err(err) if err.kind() == ExErrorKind::ScriptLoad => {
                    let err = err.with_pass_id(pass_id.clone());
                    warn!(
                        pass_id = pass_id.as_str(),
                        scope = scope.key(),
                        err_code = err.code(),
                        error = %err,
                        "External source failed to load, keeping its previous entries"
                    );
                    let retained_ids = self.retained_ids(&scope)?;
                    contributions.push(Contribution::unavailable(source_kind, retained_ids));
                    scope_failures.push(err);
                }
                Err(err) => return Err(err),
            }
        }

        let outcome = reconcile(&scope_id, contributions, &persisted).map_err(|e| {
            ExError::from(e).with_op("reconcile").with_scope(scope_id.as_str())
        })?;

        let written = if outcome.changed {
            self.manifest.write_entries(document, &outcome.entries)?;
            true
        } else {
            false
        };

        let registered = if register {
            self.registration.bind_all(&outcome.actions)?
        } else {
            0
        };

        Ok(PassReport {
            pass_id: pass_id.clone(),
            scope_id,
            changed: outcome.changed,
            written,
            entries: outcome.entries.len(),
            registered,
            foreign_preserved: outcome.foreign_preserved,
            retained: outcome.retained,
            scope_failures,
            restart_requested: false,
        })
    }

    async fn load_external(&self, scope: &Scope, source: Option<&Path>) -> Result<ExternalLoad, ExError> {
        ExternalSourceLoader::new(&self.cache, self.state.as_ref(), self.loader.as_ref())
            .load(scope, source)
            .await
    }

    fn retained_ids(&self, scope: &Scope) -> Result<Vec<String>, ExError> {
        let loader =
            ExternalSourceLoader::new(&self.cache, self.state.as_ref(), self.loader.as_ref());
        Ok(loader
            .record(scope)?
            .map(|record| record.command_ids)
            .unwrap_or_default())
    }

    /// Read the persisted ScopeId, generating and storing one on first use
    fn ensure_scope_id(&self) -> Result<ScopeId, ExError> {
        match self.state.get(Partition::Workspace, WORKSPACE_ID_KEY)? {
            Some(Value::String(raw)) => ScopeId::parse(raw)
                .map_err(|e| ExError::from(e).with_op("ensure_scope_id")),
            Some(other) => Err(ExError::new(ExErrorKind::InvalidConfig)
                .with_op("ensure_scope_id")
                .with_message(format!("stored workspace id is not a string: {}", other))),
            None => {
                let id = ScopeId::generate();
                self.state.set(
                    Partition::Workspace,
                    WORKSPACE_ID_KEY,
                    Some(Value::String(id.to_string())),
                )?;
                info!(scope = id.as_str(), "Generated workspace id");
                Ok(id)
            }
        }
    }

    /// Offer a restart once; declining defers until the next restart
    async fn prompt_restart(&self) -> bool {
        let choice = self
            .host
            .prompt(
                PromptLevel::Info,
                RESTART_MESSAGE,
                &[RESTART_ACTION.to_string()],
            )
            .await;
        if choice.as_deref() != Some(RESTART_ACTION) {
            return false;
        }
        if let Err(err) = self
            .host
            .execute_command(&self.options.reload_command, Vec::new())
            .await
        {
            warn!(
                command = self.options.reload_command.as_str(),
                error = %err,
                "Reload command failed"
            );
        }
        true
    }
}
