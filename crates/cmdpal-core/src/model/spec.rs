use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{PaletteError, Result};

/// A user-declared command entry, read from settings or an external script
///
/// Immutable for the duration of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Host command id (settings) or action id (external script)
    pub command: String,

    /// Title shown in the command palette
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Visibility expression; `"true"` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,

    /// Positional arguments passed on invocation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<Value>>,
}

impl CommandSpec {
    pub fn new(command: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            title: title.into(),
            category: None,
            when: None,
            args: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_when(mut self, when: impl Into<String>) -> Self {
        self.when = Some(when.into());
        self
    }

    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = Some(args);
        self
    }

    /// Arguments to forward, empty when none were declared
    pub fn args_or_empty(&self) -> Vec<Value> {
        self.args.clone().unwrap_or_default()
    }

    /// Check the required fields of the entry at `index` under `key`
    ///
    /// # Errors
    ///
    /// `MissingCommandId` for a blank command, `MissingTitle` for a blank title.
    pub fn validate(&self, key: &str, index: usize) -> Result<()> {
        if self.command.trim().is_empty() {
            return Err(PaletteError::MissingCommandId {
                key: key.to_string(),
                index,
            });
        }
        if self.title.trim().is_empty() {
            return Err(PaletteError::MissingTitle {
                key: key.to_string(),
                command: self.command.clone(),
            });
        }
        Ok(())
    }
}
