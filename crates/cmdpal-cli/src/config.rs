//! Settings files as a configuration provider
//!
//! Both files are JSON objects keyed like editor settings, either flat
//! (`"command-palette.commands": [...]`) or nested under the section
//! (`"command-palette": {"commands": [...]}`). Workspace values override
//! user values key by key.

use std::path::Path;

use cmdpal_core::errors::{ExError, ExErrorKind};
use cmdpal_core::host::ConfigurationProvider;
use serde_json::{Map, Value};

#[derive(Debug, Default)]
pub struct FileConfiguration {
    layers: Vec<Map<String, Value>>,
}

impl FileConfiguration {
    /// Load the user file and the workspace file; either may be absent
    pub fn load(user: Option<&Path>, workspace: Option<&Path>) -> Result<Self, ExError> {
        let mut layers = Vec::new();
        for path in [workspace, user].into_iter().flatten() {
            if let Some(layer) = read_layer(path)? {
                layers.push(layer);
            }
        }
        Ok(Self { layers })
    }

    #[cfg(test)]
    fn from_layers(layers: Vec<Value>) -> Self {
        Self {
            layers: layers
                .into_iter()
                .filter_map(|v| v.as_object().cloned())
                .collect(),
        }
    }
}

fn read_layer(path: &Path) -> Result<Option<Map<String, Value>>, ExError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(ExError::new(ExErrorKind::Io)
                .with_op("read_settings_file")
                .with_path(path)
                .with_message(e.to_string()))
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(Value::Object(map)) => Ok(Some(map)),
        Ok(_) => Err(invalid(path, "settings file must hold a JSON object".to_string())),
        Err(e) => Err(invalid(path, e.to_string())),
    }
}

fn invalid(path: &Path, reason: String) -> ExError {
    ExError::new(ExErrorKind::InvalidConfig)
        .with_op("read_settings_file")
        .with_path(path)
        .with_message(reason)
}

fn lookup(layer: &Map<String, Value>, key: &str) -> Option<Value> {
    if let Some(value) = layer.get(key) {
        return Some(value.clone());
    }
    let (section, rest) = key.split_once('.')?;
    layer.get(section)?.as_object()?.get(rest).cloned()
}

impl ConfigurationProvider for FileConfiguration {
    fn get(&self, key: &str) -> Option<Value> {
        self.layers.iter().find_map(|layer| lookup(layer, key))
    }
}
