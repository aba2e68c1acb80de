//! JSON script loader
//!
//! An external script is a JSON array of declarations:
//!
//! ```json
//! [
//!   {
//!     "command": "deploy",
//!     "title": "Deploy",
//!     "category": "Ops",
//!     "args": ["staging"],
//!     "run": ["./scripts/deploy.sh", "--verbose"]
//!   }
//! ]
//! ```
//!
//! Each declaration's action runs `run` as a child process with the
//! stored args appended, in the directory of the configured script.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use cmdpal_core::errors::{ExError, ExErrorKind};
use cmdpal_core::host::{CommandAction, ExternalCommand, ScriptLoader};
use cmdpal_core::model::{CommandSpec, InvocationContext};
use serde::Deserialize;
use serde_json::Value;
use tokio::process::Command;
use tracing::debug;

/// Environment variable carrying the configured script path to actions
pub const SCRIPT_PATH_ENV: &str = "CMDPAL_SCRIPT_PATH";

#[derive(Debug, Deserialize)]
struct Declaration {
    #[serde(flatten)]
    spec: CommandSpec,
    #[serde(default)]
    run: Vec<String>,
}

/// Loads JSON declaration files
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonScriptLoader;

impl JsonScriptLoader {
    pub fn new() -> Self {
        Self
    }

    /// Parse declarations from raw bytes; `origin` is only used in errors
    ///
    /// # Errors
    ///
    /// `ScriptLoad` for malformed JSON or an incomplete declaration.
    pub fn parse(bytes: &[u8], origin: &Path) -> Result<Vec<ExternalCommand>, ExError> {
        let declarations: Vec<Declaration> =
            serde_json::from_slice(bytes).map_err(|e| load_error(origin, e.to_string()))?;

        let label = origin.display().to_string();
        declarations
            .into_iter()
            .enumerate()
            .map(|(index, declaration)| {
                declaration
                    .spec
                    .validate(&label, index)
                    .map_err(|e| load_error(origin, e.to_string()).with_index(index))?;
                let Some((program, base_args)) = declaration.run.split_first() else {
                    return Err(load_error(origin, "declaration has no 'run' command".to_string())
                        .with_index(index)
                        .with_command_id(declaration.spec.command.clone()));
                };
                let action = ProcessAction {
                    program: program.clone(),
                    base_args: base_args.to_vec(),
                };
                Ok(ExternalCommand {
                    spec: declaration.spec,
                    action: Arc::new(action),
                })
            })
            .collect()
    }
}

#[async_trait]
impl ScriptLoader for JsonScriptLoader {
    async fn load(&self, script: &Path, origin: &Path) -> Result<Vec<ExternalCommand>, ExError> {
        let bytes = tokio::fs::read(script)
            .await
            .map_err(|e| load_error(script, e.to_string()))?;
        let commands = Self::parse(&bytes, origin)?;
        debug!(path = %script.display(), count = commands.len(), "Parsed script declarations");
        Ok(commands)
    }
}

fn load_error(path: &Path, reason: String) -> ExError {
    ExError::new(ExErrorKind::ScriptLoad)
        .with_op("load_script")
        .with_path(path)
        .with_message(reason)
}

/// Runs a program on invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessAction {
    program: String,
    base_args: Vec<String>,
}

impl ProcessAction {
    pub fn new(program: impl Into<String>, base_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            base_args,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn render_arg(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[async_trait]
impl CommandAction for ProcessAction {
    async fn invoke(&self, args: Vec<Value>, context: InvocationContext) -> Result<(), ExError> {
        let origin = &context.original_script_location;
        let mut command = Command::new(&self.program);
        command
            .args(&self.base_args)
            .args(args.iter().map(Self::render_arg))
            .env(SCRIPT_PATH_ENV, origin)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        if let Some(dir) = origin.parent().filter(|d| !d.as_os_str().is_empty()) {
            command.current_dir(dir);
        }

        let output = command.output().await.map_err(|e| {
            ExError::new(ExErrorKind::ActionFailed)
                .with_op("invoke_action")
                .with_path(origin)
                .with_message(format!("failed to start '{}': {}", self.program, e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExError::new(ExErrorKind::ActionFailed)
                .with_op("invoke_action")
                .with_path(origin)
                .with_message(format!(
                    "'{}' exited with {}: {}",
                    self.program,
                    output.status,
                    stderr.trim()
                )));
        }
        Ok(())
    }
}
