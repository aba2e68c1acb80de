use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;

use crate::host::CommandAction;

/// Metadata handed to a bound action on every invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationContext {
    /// Path of the script the action was declared in (the source, not the cached copy)
    pub original_script_location: PathBuf,
}

/// What a namespaced command id is bound to for the lifetime of the process
#[derive(Clone)]
pub enum RegistrableAction {
    /// Forward to an existing host command
    Delegate {
        command: String,
        original_command: String,
        args: Vec<Value>,
    },
    /// Call a function loaded from an external script
    Bound {
        command: String,
        action: Arc<dyn CommandAction>,
        args: Vec<Value>,
        context: InvocationContext,
    },
}

impl RegistrableAction {
    /// The namespaced id this action is registered under
    pub fn command_id(&self) -> &str {
        match self {
            RegistrableAction::Delegate { command, .. } => command,
            RegistrableAction::Bound { command, .. } => command,
        }
    }

    pub fn args(&self) -> &[Value] {
        match self {
            RegistrableAction::Delegate { args, .. } => args,
            RegistrableAction::Bound { args, .. } => args,
        }
    }

    pub fn is_delegate(&self) -> bool {
        matches!(self, RegistrableAction::Delegate { .. })
    }
}

impl std::fmt::Debug for RegistrableAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistrableAction::Delegate {
                command,
                original_command,
                args,
            } => f
                .debug_struct("Delegate")
                .field("command", command)
                .field("original_command", original_command)
                .field("args", args)
                .finish(),
            RegistrableAction::Bound {
                command,
                args,
                context,
                ..
            } => f
                .debug_struct("Bound")
                .field("command", command)
                .field("args", args)
                .field("context", context)
                .finish_non_exhaustive(),
        }
    }
}
