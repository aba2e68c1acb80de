//! Command Projector
//!
//! Pure mappings from a [`CommandSpec`] to the artifacts needed downstream:
//! the manifest command descriptor, the palette visibility descriptor, and
//! the action the namespaced id is registered with.

use std::path::Path;
use std::sync::Arc;

use serde_json::Map;

use crate::host::{CommandAction, ExternalCommand};
use crate::model::{
    CommandSpec, InvocationContext, ManifestCommandEntry, PaletteEntry, PaletteVisibilityEntry,
    RegistrableAction, ScopeId,
};
use crate::naming::{namespaced_id, visibility_when};

/// A projected command: its manifest record and what to bind it to
#[derive(Debug, Clone)]
pub struct ProjectedCommand {
    pub entry: PaletteEntry,
    pub action: RegistrableAction,
}

impl ProjectedCommand {
    pub fn id(&self) -> &str {
        self.entry.id()
    }
}

pub fn to_manifest_entry(spec: &CommandSpec) -> ManifestCommandEntry {
    ManifestCommandEntry {
        command: namespaced_id(&spec.command),
        title: spec.title.clone(),
        category: spec.category.clone(),
        extra: Map::new(),
    }
}

/// Visibility descriptor; workspace-qualified when `scope` is given
pub fn to_visibility_entry(spec: &CommandSpec, scope: Option<&ScopeId>) -> PaletteVisibilityEntry {
    PaletteVisibilityEntry {
        command: namespaced_id(&spec.command),
        when: visibility_when(spec.when.as_deref(), scope),
        extra: Map::new(),
    }
}

/// Forward to the host command named by `spec.command`
pub fn to_delegate_action(spec: &CommandSpec) -> RegistrableAction {
    RegistrableAction::Delegate {
        command: namespaced_id(&spec.command),
        original_command: spec.command.clone(),
        args: spec.args_or_empty(),
    }
}

/// Call a loaded action; `origin` is the configured script path
pub fn to_bound_action(
    spec: &CommandSpec,
    action: Arc<dyn CommandAction>,
    origin: &Path,
) -> RegistrableAction {
    RegistrableAction::Bound {
        command: namespaced_id(&spec.command),
        action,
        args: spec.args_or_empty(),
        context: InvocationContext {
            original_script_location: origin.to_path_buf(),
        },
    }
}

fn to_entry(spec: &CommandSpec, scope: Option<&ScopeId>) -> PaletteEntry {
    PaletteEntry {
        command: to_manifest_entry(spec),
        visibility: to_visibility_entry(spec, scope),
    }
}

/// Project a settings entry (delegate kind)
pub fn project_setting(spec: &CommandSpec, scope: Option<&ScopeId>) -> ProjectedCommand {
    ProjectedCommand {
        entry: to_entry(spec, scope),
        action: to_delegate_action(spec),
    }
}

/// Project a declaration loaded from an external script (bound kind)
pub fn project_external(
    command: &ExternalCommand,
    scope: Option<&ScopeId>,
    origin: &Path,
) -> ProjectedCommand {
    ProjectedCommand {
        entry: to_entry(&command.spec, scope),
        action: to_bound_action(&command.spec, command.action.clone(), origin),
    }
}
