//! Identity Namer
//!
//! Derives the namespaced command id used in the manifest and for
//! registration, and the workspace-scope predicate embedded in `when`
//! expressions.

use crate::model::scope::is_scope_token;
use crate::model::{Ownership, ScopeId};

/// Prefix of every command id this engine contributes; also the
/// configuration section name
pub const NAMESPACE: &str = "command-palette";

/// Host context variable holding the current workspace's ScopeId
pub const SCOPE_CONTEXT_KEY: &str = "command-palette.workspaceId";

/// `<namespace>.<original>`
///
/// ```
/// use cmdpal_core::naming::namespaced_id;
/// assert_eq!(namespaced_id("foo.bar"), "command-palette.foo.bar");
/// ```
pub fn namespaced_id(original: &str) -> String {
    format!("{}.{}", NAMESPACE, original)
}

pub fn scope_context_key() -> &'static str {
    SCOPE_CONTEXT_KEY
}

/// Visibility expression for an entry, qualified with the workspace
/// predicate when `scope` is present
pub fn visibility_when(user_when: Option<&str>, scope: Option<&ScopeId>) -> String {
    let user_when = user_when.unwrap_or("true");
    match scope {
        None => user_when.to_string(),
        Some(scope) => format!("{} == {} && {}", SCOPE_CONTEXT_KEY, scope, user_when),
    }
}

/// Read the owner of a visibility entry from its `when` text
///
/// ```
/// use cmdpal_core::model::Ownership;
/// use cmdpal_core::naming::owner_of;
///
/// assert_eq!(
///     owner_of("command-palette.workspaceId == W1 && true"),
///     Ownership::Workspace("W1".to_string())
/// );
/// assert_eq!(owner_of("editorFocus"), Ownership::Global);
/// ```
pub fn owner_of(when: &str) -> Ownership {
    parse_workspace_prefix(when)
        .map(|id| Ownership::Workspace(id.to_string()))
        .unwrap_or(Ownership::Global)
}

fn parse_workspace_prefix(when: &str) -> Option<&str> {
    let rest = when.trim_start().strip_prefix(SCOPE_CONTEXT_KEY)?;
    let rest = rest.trim_start().strip_prefix("==")?.trim_start();

    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(rest.len());
    let (id, tail) = rest.split_at(end);
    if !is_scope_token(id) {
        return None;
    }

    let tail = tail.trim_start();
    if tail.is_empty() || tail.starts_with("&&") {
        Some(id)
    } else {
        None
    }
}
