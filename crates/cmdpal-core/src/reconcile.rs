//! Reconciler
//!
//! Merges this process's command sets with the entries other workspaces
//! own in the persisted manifest, and decides whether a write is needed.
//!
//! ## Algorithm
//!
//! 1. Own entries, in contribution order (settings-global,
//!    settings-workspace, external-global, external-workspace). A scope
//!    whose external source failed to load keeps its previously persisted
//!    entries but registers nothing for them.
//! 2. Foreign entries: every persisted entry owned by a different
//!    workspace, carried forward unchanged in persisted order.
//! 3. `next = own ++ foreign`, absent fields stripped.
//! 4. `changed` compares `next` and the persisted entries after sorting
//!    both by `(command, when, title)`, so reordering alone never causes a
//!    write.
//!
//! ## Id collisions with foreign entries
//!
//! Namespaced ids are unique among own entries (a duplicate is
//! `DuplicateCommand`), but not across workspaces. A foreign entry that
//! shares an id with an own entry and has a different `when` is still
//! carried forward, so the merged manifest can list that id twice.
//! Preserving other workspaces' entries takes precedence over manifest-wide
//! uniqueness; the collision is logged at `warn`. A foreign entry with the
//! same id and `when` as an own entry is dropped as a duplicate.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::errors::{PaletteError, Result};
use crate::model::{Ownership, PaletteEntry, RegistrableAction, ScopeId};
use crate::projector::ProjectedCommand;

/// Where a contribution comes from; also its position in the merge order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceKind {
    SettingsGlobal,
    SettingsWorkspace,
    ExternalGlobal,
    ExternalWorkspace,
}

impl SourceKind {
    pub fn is_workspace(&self) -> bool {
        matches!(
            self,
            SourceKind::SettingsWorkspace | SourceKind::ExternalWorkspace
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::SettingsGlobal => "settings-global",
            SourceKind::SettingsWorkspace => "settings-workspace",
            SourceKind::ExternalGlobal => "external-global",
            SourceKind::ExternalWorkspace => "external-workspace",
        }
    }
}

/// What one source contributes to a pass
#[derive(Debug, Clone)]
pub enum ContributionContent {
    /// Freshly projected commands (possibly none)
    Commands(Vec<ProjectedCommand>),
    /// The source could not be loaded; keep the persisted entries it
    /// contributed last time, identified by these namespaced ids
    Unavailable { retained_ids: Vec<String> },
}

#[derive(Debug, Clone)]
pub struct Contribution {
    pub source: SourceKind,
    pub content: ContributionContent,
}

impl Contribution {
    pub fn commands(source: SourceKind, commands: Vec<ProjectedCommand>) -> Self {
        Self {
            source,
            content: ContributionContent::Commands(commands),
        }
    }

    pub fn unavailable(source: SourceKind, retained_ids: Vec<String>) -> Self {
        Self {
            source,
            content: ContributionContent::Unavailable { retained_ids },
        }
    }
}

/// Outcome of one reconciliation
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// Full next-state entry list: own entries, then foreign ones
    pub entries: Vec<PaletteEntry>,
    /// Whether `entries` differs from the persisted manifest
    pub changed: bool,
    /// Actions for this process's freshly loaded entries only
    pub actions: Vec<RegistrableAction>,
    pub foreign_preserved: usize,
    pub retained: usize,
}

/// Compute the next manifest state for the workspace `scope`
///
/// `persisted` must already be pairing-validated.
///
/// # Errors
///
/// `DuplicateCommand` when two freshly loaded entries share a namespaced id.
pub fn reconcile(
    scope: &ScopeId,
    contributions: Vec<Contribution>,
    persisted: &[PaletteEntry],
) -> Result<Reconciliation> {
    let mut ordered = contributions;
    ordered.sort_by_key(|c| c.source);

    let mut live_ids = HashSet::new();
    for contribution in &ordered {
        if let ContributionContent::Commands(commands) = &contribution.content {
            for projected in commands {
                if !live_ids.insert(projected.id().to_string()) {
                    return Err(PaletteError::DuplicateCommand {
                        command_id: projected.id().to_string(),
                    });
                }
            }
        }
    }

    let mut own: Vec<PaletteEntry> = Vec::new();
    let mut actions = Vec::new();
    let mut retained = 0;
    for contribution in ordered {
        match contribution.content {
            ContributionContent::Commands(commands) => {
                for projected in commands {
                    own.push(projected.entry.normalized());
                    actions.push(projected.action);
                }
            }
            ContributionContent::Unavailable { retained_ids } => {
                let kept = persisted.iter().filter(|entry| {
                    retained_ids.iter().any(|id| id == entry.id())
                        && !live_ids.contains(entry.id())
                        && owned_by_source(entry, contribution.source, scope)
                });
                for entry in kept {
                    if own.iter().all(|e| e.id() != entry.id()) {
                        own.push(entry.clone().normalized());
                        retained += 1;
                    }
                }
            }
        }
    }

    let mut foreign = Vec::new();
    for entry in persisted {
        if !entry.ownership().is_foreign_to(scope) {
            continue;
        }
        let same_id = own.iter().find(|e| e.id() == entry.id());
        match same_id {
            Some(e) if e.visibility.when == entry.visibility.when => continue,
            Some(_) => warn!(
                command_id = entry.id(),
                when = entry.visibility.when.as_str(),
                "Preserving foreign workspace entry that shares an id with a local entry"
            ),
            None => {}
        }
        foreign.push(entry.clone().normalized());
    }

    let foreign_preserved = foreign.len();
    let mut entries = own;
    entries.extend(foreign);

    let changed = differs(&entries, persisted);
    debug!(
        scope = scope.as_str(),
        own_len = entries.len() - foreign_preserved,
        foreign_len = foreign_preserved,
        retained,
        changed,
        "Reconciled palette entries"
    );

    Ok(Reconciliation {
        entries,
        changed,
        actions,
        foreign_preserved,
        retained,
    })
}

fn owned_by_source(entry: &PaletteEntry, source: SourceKind, scope: &ScopeId) -> bool {
    match entry.ownership() {
        Ownership::Global => !source.is_workspace(),
        Ownership::Workspace(id) => source.is_workspace() && id == scope.as_str(),
    }
}

/// Order-independent structural comparison of two entry lists
pub fn differs(next: &[PaletteEntry], persisted: &[PaletteEntry]) -> bool {
    if next.len() != persisted.len() {
        return true;
    }
    let mut left: Vec<PaletteEntry> = next.iter().cloned().map(PaletteEntry::normalized).collect();
    let mut right: Vec<PaletteEntry> = persisted
        .iter()
        .cloned()
        .map(PaletteEntry::normalized)
        .collect();
    left.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    right.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    left != right
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CommandSpec;
    use crate::projector::project_setting;

    fn scope(id: &str) -> ScopeId {
        ScopeId::parse(id).unwrap()
    }

    fn global(command: &str) -> ProjectedCommand {
        project_setting(&CommandSpec::new(command, command.to_uppercase()), None)
    }

    fn local(command: &str, scope: &ScopeId) -> ProjectedCommand {
        project_setting(&CommandSpec::new(command, command.to_uppercase()), Some(scope))
    }

    #[test]
    fn test_empty_everything_is_unchanged() {
        let result = reconcile(&scope("W1"), vec![], &[]).unwrap();
        assert!(result.entries.is_empty());
        assert!(!result.changed);
    }

    #[test]
    fn test_new_command_changes_manifest() {
        let result = reconcile(
            &scope("W1"),
            vec![Contribution::commands(
                SourceKind::SettingsGlobal,
                vec![global("a")],
            )],
            &[],
        )
        .unwrap();
        assert!(result.changed);
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.actions.len(), 1);
    }

    #[test]
    fn test_merge_order_follows_source_kind() {
        let w = scope("W1");
        let result = reconcile(
            &w,
            vec![
                Contribution::commands(SourceKind::ExternalWorkspace, vec![local("d", &w)]),
                Contribution::commands(SourceKind::SettingsWorkspace, vec![local("b", &w)]),
                Contribution::commands(SourceKind::SettingsGlobal, vec![global("a")]),
                Contribution::commands(SourceKind::ExternalGlobal, vec![global("c")]),
            ],
            &[],
        )
        .unwrap();
        let ids: Vec<&str> = result.entries.iter().map(|e| e.id()).collect();
        assert_eq!(
            ids,
            vec![
                "command-palette.a",
                "command-palette.b",
                "command-palette.c",
                "command-palette.d"
            ]
        );
    }

    #[test]
    fn test_duplicate_own_ids_are_rejected() {
        let w = scope("W1");
        let result = reconcile(
            &w,
            vec![
                Contribution::commands(SourceKind::SettingsGlobal, vec![global("a")]),
                Contribution::commands(SourceKind::SettingsWorkspace, vec![local("a", &w)]),
            ],
            &[],
        );
        assert_eq!(
            result.unwrap_err(),
            PaletteError::DuplicateCommand {
                command_id: "command-palette.a".into()
            }
        );
    }

    #[test]
    fn test_own_stale_entries_are_dropped() {
        let w = scope("W1");
        let persisted = vec![global("old").entry, local("gone", &w).entry];
        let result = reconcile(&w, vec![], &persisted).unwrap();
        assert!(result.entries.is_empty());
        assert!(result.changed);
    }

    #[test]
    fn test_reordered_persisted_entries_are_unchanged() {
        let w = scope("W1");
        let persisted = vec![global("b").entry, global("a").entry];
        let result = reconcile(
            &w,
            vec![Contribution::commands(
                SourceKind::SettingsGlobal,
                vec![global("a"), global("b")],
            )],
            &persisted,
        )
        .unwrap();
        assert!(!result.changed);
    }

    #[test]
    fn test_foreign_entry_sharing_id_is_kept() {
        let w1 = scope("W1");
        let w2 = scope("W2");
        let persisted = vec![local("a", &w1).entry];
        let result = reconcile(
            &w2,
            vec![Contribution::commands(
                SourceKind::SettingsWorkspace,
                vec![local("a", &w2)],
            )],
            &persisted,
        )
        .unwrap();
        assert_eq!(result.entries.len(), 2);
        assert_eq!(result.foreign_preserved, 1);
        assert_eq!(result.actions.len(), 1);
    }

    #[test]
    fn test_unavailable_source_retains_its_entries() {
        let w = scope("W1");
        let persisted = vec![global("kept").entry, global("other").entry];
        let result = reconcile(
            &w,
            vec![Contribution::unavailable(
                SourceKind::ExternalGlobal,
                vec!["command-palette.kept".into()],
            )],
            &persisted,
        )
        .unwrap();

        let ids: Vec<&str> = result.entries.iter().map(|e| e.id()).collect();
        assert_eq!(ids, vec!["command-palette.kept"]);
        assert_eq!(result.retained, 1);
        assert!(result.actions.is_empty());
        assert!(result.changed);
    }

    #[test]
    fn test_unavailable_workspace_source_ignores_global_entries() {
        let w = scope("W1");
        let persisted = vec![global("x").entry];
        let result = reconcile(
            &w,
            vec![Contribution::unavailable(
                SourceKind::ExternalWorkspace,
                vec!["command-palette.x".into()],
            )],
            &persisted,
        )
        .unwrap();
        assert!(result.entries.is_empty());
    }
}
