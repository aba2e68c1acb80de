//! Domain model
//!
//! - [`CommandSpec`]: a user-declared command entry
//! - [`ScopeId`] / [`Scope`] / [`Ownership`]: who an entry belongs to
//! - [`ManifestCommandEntry`] / [`PaletteVisibilityEntry`] / [`PaletteEntry`]: manifest records
//! - [`RegistrableAction`]: what a namespaced id is bound to at runtime

pub mod action;
pub mod entry;
pub mod scope;
pub mod spec;

pub use action::{InvocationContext, RegistrableAction};
pub use entry::{ManifestCommandEntry, PaletteEntry, PaletteVisibilityEntry};
pub use scope::{Ownership, Scope, ScopeId};
pub use spec::CommandSpec;
