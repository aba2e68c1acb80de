//! Settings ingestion
//!
//! Reads the four `command-palette.*` keys through a
//! [`ConfigurationProvider`] and validates every entry up front.

use std::path::{Path, PathBuf};

use crate::errors::Result;
use crate::host::{read_setting, ConfigurationProvider};
use crate::model::CommandSpec;
use crate::naming::NAMESPACE;

pub const KEY_COMMANDS: &str = "commands";
pub const KEY_WORKSPACE_COMMANDS: &str = "workspaceCommands";
pub const KEY_COMMANDS_FROM_FILE: &str = "commandsFromFile";
pub const KEY_WORKSPACE_COMMANDS_FROM_FILE: &str = "workspaceCommandsFromFile";

/// Fully qualified configuration key (`command-palette.<key>`)
pub fn qualified_key(key: &str) -> String {
    format!("{}.{}", NAMESPACE, key)
}

/// Whether a changed configuration key concerns this engine
///
/// True for the section itself and anything below it.
pub fn affects_configuration(changed_key: &str) -> bool {
    changed_key == NAMESPACE
        || changed_key
            .strip_prefix(NAMESPACE)
            .is_some_and(|rest| rest.starts_with('.'))
}

/// The validated contents of the `command-palette` section
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaletteSettings {
    pub commands: Vec<CommandSpec>,
    pub workspace_commands: Vec<CommandSpec>,
    pub commands_from_file: Option<PathBuf>,
    pub workspace_commands_from_file: Option<PathBuf>,
}

impl PaletteSettings {
    /// Read and validate all four keys
    ///
    /// # Errors
    ///
    /// `MalformedSetting` for a value of the wrong shape, `MissingCommandId`
    /// or `MissingTitle` for an incomplete entry.
    pub fn read(provider: &dyn ConfigurationProvider) -> Result<Self> {
        let commands = read_specs(provider, KEY_COMMANDS)?;
        let workspace_commands = read_specs(provider, KEY_WORKSPACE_COMMANDS)?;
        let commands_from_file = read_path(provider, KEY_COMMANDS_FROM_FILE)?;
        let workspace_commands_from_file = read_path(provider, KEY_WORKSPACE_COMMANDS_FROM_FILE)?;

        Ok(Self {
            commands,
            workspace_commands,
            commands_from_file,
            workspace_commands_from_file,
        })
    }

    /// Anchor relative script paths to the directory that declared them
    ///
    /// `commandsFromFile` is resolved against `user_root`,
    /// `workspaceCommandsFromFile` against `workspace_root`. Absolute paths
    /// and paths without a root are left as they are.
    pub fn resolve_relative(mut self, user_root: Option<&Path>, workspace_root: Option<&Path>) -> Self {
        self.commands_from_file = anchor(self.commands_from_file, user_root);
        self.workspace_commands_from_file = anchor(self.workspace_commands_from_file, workspace_root);
        self
    }
}

fn anchor(path: Option<PathBuf>, root: Option<&Path>) -> Option<PathBuf> {
    match (path, root) {
        (Some(path), Some(root)) if path.is_relative() => Some(root.join(path)),
        (path, _) => path,
    }
}

fn read_specs(provider: &dyn ConfigurationProvider, key: &str) -> Result<Vec<CommandSpec>> {
    let qualified = qualified_key(key);
    let specs: Vec<CommandSpec> = read_setting(provider, &qualified, Vec::new())?;
    for (index, spec) in specs.iter().enumerate() {
        spec.validate(&qualified, index)?;
    }
    Ok(specs)
}

// An empty string means "not configured".
fn read_path(provider: &dyn ConfigurationProvider, key: &str) -> Result<Option<PathBuf>> {
    let raw: Option<String> = read_setting(provider, &qualified_key(key), None)?;
    Ok(raw
        .filter(|path| !path.trim().is_empty())
        .map(PathBuf::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PaletteError;
    use serde_json::{json, Value};
    use std::collections::HashMap;

    fn config(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (qualified_key(k), v.clone()))
            .collect()
    }

    #[test]
    fn test_read_empty_configuration() {
        let settings = PaletteSettings::read(&config(&[])).unwrap();
        assert_eq!(settings, PaletteSettings::default());
    }

    #[test]
    fn test_read_all_keys() {
        let settings = PaletteSettings::read(&config(&[
            (KEY_COMMANDS, json!([{"command": "a", "title": "A"}])),
            (
                KEY_WORKSPACE_COMMANDS,
                json!([{"command": "b", "title": "B", "when": "editorFocus"}]),
            ),
            (KEY_COMMANDS_FROM_FILE, json!("/home/u/commands.json")),
            (KEY_WORKSPACE_COMMANDS_FROM_FILE, json!("")),
        ]))
        .unwrap();

        assert_eq!(settings.commands, vec![CommandSpec::new("a", "A")]);
        assert_eq!(
            settings.workspace_commands,
            vec![CommandSpec::new("b", "B").with_when("editorFocus")]
        );
        assert_eq!(
            settings.commands_from_file,
            Some(PathBuf::from("/home/u/commands.json"))
        );
        assert_eq!(settings.workspace_commands_from_file, None);
    }

    #[test]
    fn test_relative_paths_anchor_to_their_roots() {
        let settings = PaletteSettings::read(&config(&[
            (KEY_COMMANDS_FROM_FILE, json!("user/cmds.json")),
            (KEY_WORKSPACE_COMMANDS_FROM_FILE, json!("cmds.json")),
        ]))
        .unwrap()
        .resolve_relative(Some(Path::new("/home/u")), Some(Path::new("/w/project")));

        assert_eq!(
            settings.commands_from_file,
            Some(PathBuf::from("/home/u/user/cmds.json"))
        );
        assert_eq!(
            settings.workspace_commands_from_file,
            Some(PathBuf::from("/w/project/cmds.json"))
        );
    }

    #[test]
    fn test_absolute_paths_and_missing_roots_are_kept() {
        let settings = PaletteSettings::read(&config(&[
            (KEY_COMMANDS_FROM_FILE, json!("/abs/cmds.json")),
            (KEY_WORKSPACE_COMMANDS_FROM_FILE, json!("rel.json")),
        ]))
        .unwrap()
        .resolve_relative(Some(Path::new("/home/u")), None);

        assert_eq!(
            settings.commands_from_file,
            Some(PathBuf::from("/abs/cmds.json"))
        );
        assert_eq!(
            settings.workspace_commands_from_file,
            Some(PathBuf::from("rel.json"))
        );
    }

    #[test]
    fn test_entry_without_title_fails_fast() {
        let result = PaletteSettings::read(&config(&[(KEY_COMMANDS, json!([{"command": "a"}]))]));
        assert!(matches!(
            result,
            Err(PaletteError::MalformedSetting { .. })
        ));
    }

    #[test]
    fn test_blank_command_fails_fast() {
        let result = PaletteSettings::read(&config(&[(
            KEY_WORKSPACE_COMMANDS,
            json!([{"command": "ok", "title": "Ok"}, {"command": " ", "title": "T"}]),
        )]));
        match result {
            Err(PaletteError::MissingCommandId { key, index }) => {
                assert_eq!(key, "command-palette.workspaceCommands");
                assert_eq!(index, 1);
            }
            other => panic!("expected MissingCommandId, got {:?}", other),
        }
    }

    #[test]
    fn test_affects_configuration() {
        assert!(affects_configuration("command-palette"));
        assert!(affects_configuration("command-palette.commands"));
        assert!(!affects_configuration("command-paletteX"));
        assert!(!affects_configuration("editor.fontSize"));
    }
}
