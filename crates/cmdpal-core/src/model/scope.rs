use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{PaletteError, Result};

/// Stable random identifier of one workspace instance
///
/// Generated once and persisted in the workspace partition of the state
/// store. It is embedded verbatim in `when` expressions, so it is limited
/// to ASCII alphanumerics, `-` and `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScopeId(String);

impl ScopeId {
    /// Generate a fresh collision-resistant id (UUIDv4, simple form)
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Parse a persisted id
    ///
    /// # Errors
    ///
    /// `MalformedSetting` if the id is empty or contains characters that
    /// would break a `when` expression.
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if !is_scope_token(&raw) {
            return Err(PaletteError::MalformedSetting {
                key: "workspaceId".to_string(),
                reason: format!("'{}' is not a valid workspace id", raw),
            });
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ScopeId {
    type Error = PaletteError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<ScopeId> for String {
    fn from(id: ScopeId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub(crate) fn is_scope_token(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Scope a command set is declared for
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Global,
    Workspace(ScopeId),
}

impl Scope {
    /// Directory / log label: `global` or the ScopeId
    pub fn key(&self) -> &str {
        match self {
            Scope::Global => "global",
            Scope::Workspace(id) => id.as_str(),
        }
    }

    pub fn workspace_id(&self) -> Option<&ScopeId> {
        match self {
            Scope::Global => None,
            Scope::Workspace(id) => Some(id),
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Owner of a persisted visibility entry, read from its `when` text
///
/// Only the canonical `<key> == <id> && …` prefix marks a workspace entry;
/// any other `when`, including one that mentions the key elsewhere, is a
/// global entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ownership {
    Global,
    Workspace(String),
}

impl Ownership {
    /// Whether a pass running as `current` must carry this entry forward untouched
    pub fn is_foreign_to(&self, current: &ScopeId) -> bool {
        match self {
            Ownership::Global => false,
            Ownership::Workspace(id) => id != current.as_str(),
        }
    }
}
