//! Manifest document model
//!
//! The persisted manifest keeps commands and their palette visibility in
//! two positionally paired arrays:
//!
//! ```text
//! contributes.commands[i]              { command, title, category? }
//! contributes.menus.commandPalette[i]  { command, when }
//! ```
//!
//! Inside the engine the pair is a single [`PaletteEntry`]. This module is
//! the only place that sees the two-array form: it validates the pairing on
//! read and regenerates both arrays on write. Every other key of the
//! document is left untouched.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::errors::{PaletteError, Result};
use crate::model::{ManifestCommandEntry, PaletteEntry, PaletteVisibilityEntry};

pub const SECTION_CONTRIBUTES: &str = "contributes";
pub const SECTION_COMMANDS: &str = "contributes.commands";
pub const SECTION_MENUS: &str = "contributes.menus";
pub const SECTION_COMMAND_PALETTE: &str = "contributes.menus.commandPalette";

const INDENT: &[u8] = b"    ";

/// The whole persisted manifest document
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedManifest {
    document: Value,
}

impl Default for PersistedManifest {
    fn default() -> Self {
        Self {
            document: Value::Object(Map::new()),
        }
    }
}

impl PersistedManifest {
    /// Parse a manifest from raw bytes
    ///
    /// # Errors
    ///
    /// `MalformedSection` when the bytes are not a JSON object.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let document: Value =
            serde_json::from_slice(bytes).map_err(|e| PaletteError::MalformedSection {
                section: "<document>".to_string(),
                reason: e.to_string(),
            })?;
        Self::from_value(document)
    }

    /// # Errors
    ///
    /// `MalformedSection` when `document` is not a JSON object.
    pub fn from_value(document: Value) -> Result<Self> {
        if !document.is_object() {
            return Err(PaletteError::MalformedSection {
                section: "<document>".to_string(),
                reason: "expected an object".to_string(),
            });
        }
        Ok(Self { document })
    }

    pub fn as_value(&self) -> &Value {
        &self.document
    }

    /// The paired entries, validated
    ///
    /// Absent arrays read as empty.
    ///
    /// # Errors
    ///
    /// - `MalformedSection` if a section exists with the wrong type or an
    ///   item does not have the expected shape
    /// - `PairingLengthMismatch` / `PairingIdMismatch` if the arrays are not
    ///   positionally paired
    pub fn entries(&self) -> Result<Vec<PaletteEntry>> {
        let commands: Vec<ManifestCommandEntry> =
            read_items(self.commands_section()?, SECTION_COMMANDS)?;
        let palette: Vec<PaletteVisibilityEntry> =
            read_items(self.palette_section()?, SECTION_COMMAND_PALETTE)?;

        pair(commands, palette)
    }

    /// Replace both arrays with `entries`, keeping positional pairing
    ///
    /// Missing `contributes` / `menus` objects are created.
    ///
    /// # Errors
    ///
    /// `MalformedSection` if an enclosing section exists with the wrong type.
    pub fn set_entries(&mut self, entries: &[PaletteEntry]) -> Result<()> {
        let mut commands = Vec::with_capacity(entries.len());
        let mut palette = Vec::with_capacity(entries.len());
        for entry in entries {
            commands.push(serde_json::to_value(&entry.command)?);
            palette.push(serde_json::to_value(&entry.visibility)?);
        }

        let root = self
            .document
            .as_object_mut()
            .ok_or_else(|| wrong_type("<document>", "object"))?;
        let contributes = object_entry(root, "contributes", SECTION_CONTRIBUTES)?;
        contributes.insert("commands".to_string(), Value::Array(commands));
        let menus = object_entry(contributes, "menus", SECTION_MENUS)?;
        menus.insert("commandPalette".to_string(), Value::Array(palette));
        Ok(())
    }

    /// Four-space indented JSON with a trailing newline
    ///
    /// # Errors
    ///
    /// `Serialization` if the document cannot be encoded.
    pub fn to_pretty_bytes(&self) -> Result<Vec<u8>> {
        use serde::Serialize;

        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(INDENT);
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.document.serialize(&mut serializer)?;
        out.push(b'\n');
        Ok(out)
    }

    fn contributes(&self) -> Result<Option<&Map<String, Value>>> {
        match self.document.get("contributes") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(_) => Err(wrong_type(SECTION_CONTRIBUTES, "object")),
        }
    }

    fn commands_section(&self) -> Result<Option<&Vec<Value>>> {
        let Some(contributes) = self.contributes()? else {
            return Ok(None);
        };
        as_array(contributes.get("commands"), SECTION_COMMANDS)
    }

    fn palette_section(&self) -> Result<Option<&Vec<Value>>> {
        let Some(contributes) = self.contributes()? else {
            return Ok(None);
        };
        let menus = match contributes.get("menus") {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Object(map)) => map,
            Some(_) => return Err(wrong_type(SECTION_MENUS, "object")),
        };
        as_array(menus.get("commandPalette"), SECTION_COMMAND_PALETTE)
    }
}

/// Zip the two arrays into paired records
///
/// # Errors
///
/// `PairingLengthMismatch` or `PairingIdMismatch`; alignment is never guessed.
pub fn pair(
    commands: Vec<ManifestCommandEntry>,
    palette: Vec<PaletteVisibilityEntry>,
) -> Result<Vec<PaletteEntry>> {
    if commands.len() != palette.len() {
        return Err(PaletteError::PairingLengthMismatch {
            commands: commands.len(),
            palette_items: palette.len(),
        });
    }

    commands
        .into_iter()
        .zip(palette)
        .enumerate()
        .map(|(index, (command, visibility))| {
            if command.command != visibility.command {
                return Err(PaletteError::PairingIdMismatch {
                    index,
                    command: command.command,
                    palette_command: visibility.command,
                });
            }
            Ok(PaletteEntry {
                command,
                visibility,
            })
        })
        .collect()
}

fn as_array<'a>(value: Option<&'a Value>, section: &str) -> Result<Option<&'a Vec<Value>>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items)),
        Some(_) => Err(wrong_type(section, "array")),
    }
}

fn read_items<T: DeserializeOwned>(items: Option<&Vec<Value>>, section: &str) -> Result<Vec<T>> {
    let Some(items) = items else {
        return Ok(Vec::new());
    };
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item.clone()).map_err(|e| PaletteError::MalformedSection {
                section: format!("{}[{}]", section, index),
                reason: e.to_string(),
            })
        })
        .collect()
}

fn object_entry<'a>(
    parent: &'a mut Map<String, Value>,
    key: &str,
    section: &str,
) -> Result<&'a mut Map<String, Value>> {
    let slot = parent
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if slot.is_null() {
        *slot = Value::Object(Map::new());
    }
    slot.as_object_mut()
        .ok_or_else(|| wrong_type(section, "object"))
}

fn wrong_type(section: &str, expected: &str) -> PaletteError {
    PaletteError::MalformedSection {
        section: section.to_string(),
        reason: format!("expected {}", expected),
    }
}
