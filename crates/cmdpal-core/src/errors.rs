use cmdpal_core_types::PassId;
use thiserror::Error;

/// Result type alias using PaletteError
pub type Result<T> = std::result::Result<T, PaletteError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that can be used for programmatic
/// error handling, testing, and messages surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Configuration
    InvalidConfig,
    DuplicateCommand,

    // External sources
    ScriptLoad,

    // Manifest
    /// Manifest lists are not positionally paired
    ManifestCorrupt,
    /// Manifest is not JSON, or a contributes section has the wrong type
    InvalidManifest,

    // Registration / invocation
    Registration,
    ActionFailed,

    // Integration/IO
    Io,
    Serialization,
    Persistence,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidConfig => "ERR_INVALID_CONFIG",
            ExErrorKind::DuplicateCommand => "ERR_DUPLICATE_COMMAND",
            ExErrorKind::ScriptLoad => "ERR_SCRIPT_LOAD",
            ExErrorKind::ManifestCorrupt => "ERR_MANIFEST_CORRUPT",
            ExErrorKind::InvalidManifest => "ERR_INVALID_MANIFEST",
            ExErrorKind::Registration => "ERR_REGISTRATION",
            ExErrorKind::ActionFailed => "ERR_ACTION_FAILED",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// Whether this kind belongs to the configuration family (fail-fast at ingestion)
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ExErrorKind::InvalidConfig | ExErrorKind::DuplicateCommand
        )
    }
}

/// Canonical structured error type
///
/// Carries a classification for programmatic handling and optional
/// context for debugging and for the message shown to the user.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    scope: Option<String>,
    command_id: Option<String>,
    path: Option<String>,
    index: Option<usize>,
    pass_id: Option<PassId>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            scope: None,
            command_id: None,
            path: None,
            index: None,
            pass_id: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add scope context ("global" or a workspace ScopeId)
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Add command id context
    pub fn with_command_id(mut self, id: impl Into<String>) -> Self {
        self.command_id = Some(id.into());
        self
    }

    /// Add filesystem path context
    pub fn with_path(mut self, path: impl AsRef<std::path::Path>) -> Self {
        self.path = Some(path.as_ref().display().to_string());
        self
    }

    /// Add list index context
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Add pass id context
    pub fn with_pass_id(mut self, pass_id: PassId) -> Self {
        self.pass_id = Some(pass_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the scope context, if any
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Get the command id context, if any
    pub fn command_id(&self) -> Option<&str> {
        self.command_id.as_deref()
    }

    /// Get the path context, if any
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Get the index context, if any
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Get the pass id context, if any
    pub fn pass_id(&self) -> Option<&PassId> {
        self.pass_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(scope) = &self.scope {
            write!(f, " (scope: {})", scope)?;
        }
        if let Some(command_id) = &self.command_id {
            write!(f, " (command: {})", command_id)?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path)?;
        }
        if let Some(index) = self.index {
            write!(f, " (index: {})", index)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Error taxonomy for the pure reconciliation core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PaletteError {
    // ===== Configuration Errors =====
    /// A configured command entry has no usable `command` id
    #[error("Command entry {index} in '{key}' has an empty command id")]
    MissingCommandId { key: String, index: usize },

    /// A configured command entry has no usable title
    #[error("Command entry '{command}' in '{key}' has an empty title")]
    MissingTitle { key: String, command: String },

    /// A configuration value does not have the expected shape
    #[error("Setting '{key}' is malformed: {reason}")]
    MalformedSetting { key: String, reason: String },

    /// Two own entries resolve to the same namespaced id
    #[error("Command '{command_id}' is declared more than once")]
    DuplicateCommand { command_id: String },

    // ===== Manifest Errors =====
    /// The two contributes lists differ in length
    #[error("Manifest lists differ in length: {commands} commands, {palette_items} palette items")]
    PairingLengthMismatch {
        commands: usize,
        palette_items: usize,
    },

    /// The two contributes lists disagree on the command id at an index
    #[error("Manifest lists disagree at index {index}: '{command}' vs '{palette_command}'")]
    PairingIdMismatch {
        index: usize,
        command: String,
        palette_command: String,
    },

    /// A manifest section exists but has the wrong JSON type
    #[error("Manifest section '{section}' is malformed: {reason}")]
    MalformedSection { section: String, reason: String },

    // ===== Generic Errors =====
    /// Serialization error (JSON encoding/decoding)
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

/// Conversion from PaletteError to ExError
impl From<PaletteError> for ExError {
    fn from(err: PaletteError) -> Self {
        match err {
            PaletteError::MissingCommandId { key, index } => {
                ExError::new(ExErrorKind::InvalidConfig)
                    .with_index(index)
                    .with_message(format!("Entry in '{}' has an empty command id", key))
            }

            PaletteError::MissingTitle { key, command } => ExError::new(ExErrorKind::InvalidConfig)
                .with_command_id(command)
                .with_message(format!("Entry in '{}' has an empty title", key)),

            PaletteError::MalformedSetting { key, reason } => {
                ExError::new(ExErrorKind::InvalidConfig)
                    .with_message(format!("Setting '{}' is malformed: {}", key, reason))
            }

            PaletteError::DuplicateCommand { command_id } => {
                ExError::new(ExErrorKind::DuplicateCommand)
                    .with_command_id(command_id)
                    .with_message("Command is declared more than once")
            }

            PaletteError::PairingLengthMismatch {
                commands,
                palette_items,
            } => ExError::new(ExErrorKind::ManifestCorrupt).with_message(format!(
                "{} commands but {} command palette items",
                commands, palette_items
            )),

            PaletteError::PairingIdMismatch {
                index,
                command,
                palette_command,
            } => ExError::new(ExErrorKind::ManifestCorrupt)
                .with_index(index)
                .with_command_id(command)
                .with_message(format!(
                    "Command palette item at the same index is '{}'",
                    palette_command
                )),

            PaletteError::MalformedSection { section, reason } => {
                ExError::new(ExErrorKind::InvalidManifest)
                    .with_message(format!("Section '{}' is malformed: {}", section, reason))
            }

            PaletteError::Serialization { message } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }
        }
    }
}

/// Conversion from serde_json::Error to PaletteError
impl From<serde_json::Error> for PaletteError {
    fn from(err: serde_json::Error) -> Self {
        PaletteError::Serialization {
            message: err.to_string(),
        }
    }
}
