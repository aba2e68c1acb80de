//! cmdpal core - reconciliation kernel for user-declared palette commands
//!
//! This crate turns command entries declared in settings or external
//! scripts into the records a host manifest needs, and merges them with
//! entries other workspaces own in the same shared manifest:
//! - Identity Namer (namespaced ids, workspace visibility predicate)
//! - Command Projector (manifest, visibility and action descriptors)
//! - Settings ingestion with up-front validation
//! - Manifest document model with pairing validation and stable formatting
//! - Reconciler (foreign-workspace preservation, change detection)
//! - Collaborator traits for configuration, state, host and script loading
//!
//! Everything here is synchronous and side-effect free apart from logging;
//! the async traits in [`host`] are implemented by the engine and hosts.

pub mod errors;
pub mod host;
pub mod logging_facility;
pub mod manifest;
pub mod model;
pub mod naming;
pub mod projector;
pub mod reconcile;
pub mod settings;

// Used by the exported logging macros
pub use cmdpal_core_types;

// Re-export commonly used types
pub use errors::{ExError, ExErrorKind, PaletteError, Result};
pub use host::{
    CommandAction, CommandHandler, CommandHost, ConfigurationProvider, ExternalCommand,
    MemoryStateStore, Partition, PromptLevel, ScriptLoader, StateStore,
};
pub use manifest::PersistedManifest;
pub use model::{CommandSpec, PaletteEntry, RegistrableAction, Scope, ScopeId};
pub use projector::ProjectedCommand;
pub use reconcile::{reconcile, Contribution, Reconciliation, SourceKind};
pub use settings::PaletteSettings;
