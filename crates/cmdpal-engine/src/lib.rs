//! cmdpal engine - orchestration layer
//!
//! Coordinates the pure reconciliation core with persistence and the host:
//! external script loading through the cache, action registration, and the
//! serialized activation / configuration-change / deactivation lifecycle.

pub mod engine;
pub mod external;
pub mod registration;
pub mod script;

pub use engine::{Collaborators, EngineOptions, PaletteEngine, PassReport};
pub use external::{ExternalLoad, ExternalSourceLoader, ExternalSourceRecord};
pub use registration::RegistrationDriver;
pub use script::{JsonScriptLoader, ProcessAction};
