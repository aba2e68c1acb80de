pub mod invoke;
pub mod list;
pub mod reconcile;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use cmdpal_core::errors::{ExError, ExErrorKind};
use cmdpal_engine::{Collaborators, EngineOptions, JsonScriptLoader, PaletteEngine};
use cmdpal_store::SqliteStateStore;

use crate::config::FileConfiguration;
use crate::host::ConsoleHost;

/// Locations shared by every subcommand that runs a pass
#[derive(Debug, Args)]
pub struct PaletteArgs {
    /// Manifest file to keep in sync
    #[arg(long, default_value = "package.json")]
    pub manifest: PathBuf,

    /// User settings file
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Workspace directory; its settings live in `.cmdpal/settings.json`
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    #[arg(long, default_value = ".cmdpal/state.db")]
    pub state_db: PathBuf,

    /// Directory holding cached copies of external scripts
    #[arg(long, default_value = ".cmdpal/cache")]
    pub cache: PathBuf,

    /// Host command run when a restart is accepted
    #[arg(long)]
    pub reload_command: Option<String>,
}

impl PaletteArgs {
    pub fn build(&self, host: Arc<ConsoleHost>) -> Result<PaletteEngine, ExError> {
        let workspace = self.workspace.canonicalize().map_err(|e| {
            ExError::new(ExErrorKind::Io)
                .with_op("resolve_workspace")
                .with_path(&self.workspace)
                .with_message(e.to_string())
        })?;
        let workspace_settings = workspace.join(".cmdpal").join("settings.json");
        let config =
            FileConfiguration::load(self.settings.as_deref(), Some(workspace_settings.as_path()))?;
        let state = SqliteStateStore::open(&self.state_db, &workspace.display().to_string())?;

        let mut options =
            EngineOptions::new(&self.manifest, &self.cache).with_workspace_root(&workspace);
        if let Some(root) = self.settings_root()? {
            options = options.with_user_settings_root(root);
        }
        if let Some(command) = &self.reload_command {
            options = options.with_reload_command(command);
        }

        Ok(PaletteEngine::new(
            options,
            Collaborators {
                config: Arc::new(config),
                state: Arc::new(state),
                host,
                loader: Arc::new(JsonScriptLoader::new()),
            },
        ))
    }

    /// Absolute directory of the user settings file
    fn settings_root(&self) -> Result<Option<PathBuf>, ExError> {
        let Some(settings) = &self.settings else {
            return Ok(None);
        };
        let absolute = if settings.is_absolute() {
            settings.clone()
        } else {
            std::env::current_dir()
                .map_err(|e| {
                    ExError::new(ExErrorKind::Io)
                        .with_op("resolve_settings_root")
                        .with_message(e.to_string())
                })?
                .join(settings)
        };
        Ok(absolute.parent().map(PathBuf::from))
    }
}
