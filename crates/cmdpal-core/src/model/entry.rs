use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::scope::Ownership;
use crate::naming::owner_of;

/// What the host displays as a command (`contributes.commands[i]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestCommandEntry {
    pub command: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Keys this crate does not model, carried through unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Controls palette visibility (`contributes.menus.commandPalette[i]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaletteVisibilityEntry {
    pub command: String,
    #[serde(default = "default_when")]
    pub when: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_when() -> String {
    "true".to_string()
}

/// One command with its visibility: the paired record used everywhere
/// inside the engine instead of two index-aligned lists
#[derive(Debug, Clone, PartialEq)]
pub struct PaletteEntry {
    pub command: ManifestCommandEntry,
    pub visibility: PaletteVisibilityEntry,
}

impl PaletteEntry {
    /// The namespaced command id shared by both halves
    pub fn id(&self) -> &str {
        &self.command.command
    }

    pub fn ownership(&self) -> Ownership {
        owner_of(&self.visibility.when)
    }

    /// Drop absent-valued (`null`) keys so structural comparison never
    /// sees phantom fields
    pub fn normalized(mut self) -> Self {
        strip_absent(&mut self.command.extra);
        strip_absent(&mut self.visibility.extra);
        self
    }

    /// Canonical ordering key used before comparing entry sets
    pub fn sort_key(&self) -> (&str, &str, &str) {
        (
            self.command.command.as_str(),
            self.visibility.when.as_str(),
            self.command.title.as_str(),
        )
    }
}

/// Remove `null` members recursively
pub fn strip_absent(map: &mut Map<String, Value>) {
    map.retain(|_, v| !v.is_null());
    for value in map.values_mut() {
        if let Value::Object(inner) = value {
            strip_absent(inner);
        }
    }
}
