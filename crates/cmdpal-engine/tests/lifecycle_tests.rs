//! Activation, configuration change and deactivation

mod common;

use cmdpal_core::errors::ExErrorKind;
use cmdpal_core::host::{Partition, PromptLevel, StateStore};
use cmdpal_core::naming::SCOPE_CONTEXT_KEY;
use cmdpal_engine::engine::{DEFAULT_RELOAD_COMMAND, RESTART_ACTION, WORKSPACE_ID_KEY};
use common::Fixture;
use serde_json::json;

#[tokio::test]
async fn test_first_activation_with_nothing_configured_writes_nothing() {
    // GIVEN no settings and no manifest file
    let fx = Fixture::new();

    // WHEN the engine activates
    let report = fx.engine.activate().await.unwrap();

    // THEN nothing changed and no file was created
    assert!(!report.changed);
    assert!(!report.written);
    assert!(!fx.manifest_path().exists());
    assert!(fx.host.prompts().is_empty());
}

#[tokio::test]
async fn test_activation_publishes_persisted_scope_id() {
    let fx = Fixture::new();

    let report = fx.engine.activate().await.unwrap();

    let stored = fx.state.get(Partition::Workspace, WORKSPACE_ID_KEY).unwrap();
    assert_eq!(stored, Some(json!(report.scope_id.as_str())));
    assert_eq!(
        fx.host.context(SCOPE_CONTEXT_KEY),
        Some(json!(report.scope_id.as_str()))
    );

    // AND the id is stable across passes
    let again = fx.engine.run_pass(false).await.unwrap();
    assert_eq!(again.scope_id, report.scope_id);
}

#[tokio::test]
async fn test_non_string_scope_id_is_invalid_config() {
    let fx = Fixture::new();
    fx.state
        .set(Partition::Workspace, WORKSPACE_ID_KEY, Some(json!(42)))
        .unwrap();

    let err = fx.engine.activate().await.unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::InvalidConfig);
}

#[tokio::test]
async fn test_added_command_writes_once_and_prompts_once() {
    // GIVEN one global command
    let fx = Fixture::new();
    fx.config.set(
        "commands",
        json!([{"command": "editor.action.formatDocument", "title": "Format", "category": "Edit"}]),
    );

    // WHEN activating
    let report = fx.engine.activate().await.unwrap();

    // THEN the manifest holds the namespaced entry
    assert!(report.written);
    assert_eq!(
        fx.manifest_ids(),
        vec!["command-palette.editor.action.formatDocument"]
    );
    let manifest = fx.manifest();
    assert_eq!(
        manifest["contributes"]["menus"]["commandPalette"],
        json!([{"command": "command-palette.editor.action.formatDocument", "when": "true"}])
    );
    assert_eq!(manifest["contributes"]["commands"][0]["category"], "Edit");

    // AND the restart prompt was shown exactly once
    let prompts = fx.host.prompts();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].0, PromptLevel::Info);

    // AND the command is bound
    assert_eq!(
        fx.host.registered(),
        vec!["command-palette.editor.action.formatDocument"]
    );
}

#[tokio::test]
async fn test_second_pass_is_idempotent() {
    let fx = Fixture::new();
    fx.config
        .set("commands", json!([{"command": "a", "title": "A"}]));
    fx.engine.activate().await.unwrap();
    let before = std::fs::read(fx.manifest_path()).unwrap();

    let report = fx.engine.run_pass(false).await.unwrap();

    assert!(!report.changed);
    assert!(!report.written);
    assert_eq!(std::fs::read(fx.manifest_path()).unwrap(), before);
    assert_eq!(fx.host.prompts().len(), 1);
}

#[tokio::test]
async fn test_manifest_format_is_four_space_indented_with_trailing_newline() {
    let fx = Fixture::new();
    fx.config
        .set("commands", json!([{"command": "a", "title": "A"}]));

    fx.engine.activate().await.unwrap();

    let text = std::fs::read_to_string(fx.manifest_path()).unwrap();
    assert!(text.starts_with("{\n    \"contributes\""));
    assert!(text.ends_with("}\n"));
}

#[tokio::test]
async fn test_workspace_command_is_scoped_to_this_workspace() {
    let fx = Fixture::new();
    fx.config.set(
        "workspaceCommands",
        json!([{"command": "b", "title": "B", "when": "editorFocus"}]),
    );

    let report = fx.engine.activate().await.unwrap();

    let manifest = fx.manifest();
    assert_eq!(
        manifest["contributes"]["menus"]["commandPalette"][0]["when"],
        json!(format!(
            "command-palette.workspaceId == {} && editorFocus",
            report.scope_id
        ))
    );
}

#[tokio::test]
async fn test_configuration_change_does_not_bind_new_commands() {
    // GIVEN an activated engine with one command
    let fx = Fixture::new();
    fx.config
        .set("commands", json!([{"command": "a", "title": "A"}]));
    fx.engine.activate().await.unwrap();

    // WHEN a second command is added at runtime
    fx.config.set(
        "commands",
        json!([{"command": "a", "title": "A"}, {"command": "b", "title": "B"}]),
    );
    let report = fx
        .engine
        .on_configuration_changed(&["command-palette.commands"])
        .await
        .unwrap()
        .unwrap();

    // THEN the manifest gains it but it stays unbound until restart
    assert!(report.written);
    assert_eq!(report.registered, 0);
    assert_eq!(
        fx.manifest_ids(),
        vec!["command-palette.a", "command-palette.b"]
    );
    assert_eq!(fx.host.registered(), vec!["command-palette.a"]);
}

#[tokio::test]
async fn test_unrelated_configuration_change_is_ignored() {
    let fx = Fixture::new();
    fx.engine.activate().await.unwrap();

    let outcome = fx
        .engine
        .on_configuration_changed(&["editor.fontSize", "command-paletteX.commands"])
        .await
        .unwrap();

    assert!(outcome.is_none());
}

#[tokio::test]
async fn test_removed_command_leaves_manifest() {
    let fx = Fixture::new();
    fx.config.set(
        "commands",
        json!([{"command": "a", "title": "A"}, {"command": "b", "title": "B"}]),
    );
    fx.engine.activate().await.unwrap();

    fx.config
        .set("commands", json!([{"command": "b", "title": "B"}]));
    fx.engine
        .on_configuration_changed(&["command-palette"])
        .await
        .unwrap();

    assert_eq!(fx.manifest_ids(), vec!["command-palette.b"]);
}

#[tokio::test]
async fn test_restart_answer_runs_reload_command() {
    let fx = Fixture::new();
    fx.host.answer_with(Some(RESTART_ACTION));
    fx.config
        .set("commands", json!([{"command": "a", "title": "A"}]));

    let report = fx.engine.activate().await.unwrap();

    assert!(report.restart_requested);
    let executed = fx.host.executed();
    assert_eq!(executed.len(), 1);
    assert_eq!(executed[0].0, DEFAULT_RELOAD_COMMAND);
}

#[tokio::test]
async fn test_dismissed_restart_runs_nothing() {
    let fx = Fixture::new();
    fx.config
        .set("commands", json!([{"command": "a", "title": "A"}]));

    let report = fx.engine.activate().await.unwrap();

    assert!(!report.restart_requested);
    assert!(fx.host.executed().is_empty());
}

#[tokio::test]
async fn test_invalid_setting_aborts_pass_and_keeps_manifest() {
    // GIVEN a manifest written by a previous pass
    let fx = Fixture::new();
    fx.config
        .set("commands", json!([{"command": "a", "title": "A"}]));
    fx.engine.activate().await.unwrap();
    let before = std::fs::read(fx.manifest_path()).unwrap();

    // WHEN an entry loses its title
    fx.config
        .set("commands", json!([{"command": "a", "title": ""}]));
    let err = fx
        .engine
        .on_configuration_changed(&["command-palette.commands"])
        .await
        .unwrap_err();

    // THEN the pass fails, the error is shown and the file is untouched
    assert_eq!(err.kind(), ExErrorKind::InvalidConfig);
    assert!(err.pass_id().is_some());
    assert_eq!(std::fs::read(fx.manifest_path()).unwrap(), before);
    assert_eq!(fx.host.prompts().last().unwrap().0, PromptLevel::Error);
}

#[tokio::test]
async fn test_duplicate_command_is_fatal() {
    let fx = Fixture::new();
    fx.config.set(
        "commands",
        json!([{"command": "a", "title": "A"}, {"command": "a", "title": "Again"}]),
    );

    let err = fx.engine.activate().await.unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::DuplicateCommand);
    assert_eq!(err.command_id(), Some("command-palette.a"));
    assert!(!fx.manifest_path().exists());
}

#[tokio::test]
async fn test_deactivate_releases_every_binding() {
    let fx = Fixture::new();
    fx.config.set(
        "commands",
        json!([{"command": "a", "title": "A"}, {"command": "b", "title": "B"}]),
    );
    fx.engine.activate().await.unwrap();
    assert_eq!(fx.host.registered().len(), 2);

    let released = fx.engine.deactivate();

    assert_eq!(released, 2);
    assert!(fx.host.registered().is_empty());
    assert!(fx.engine.bound_ids().is_empty());
}

#[tokio::test]
async fn test_delegate_forwards_to_original_command_with_args() {
    let fx = Fixture::new();
    fx.config.set(
        "commands",
        json!([{"command": "workbench.action.tasks.runTask", "title": "Build", "args": ["build", 2]}]),
    );
    fx.engine.activate().await.unwrap();

    fx.host
        .invoke("command-palette.workbench.action.tasks.runTask")
        .await
        .unwrap();

    assert_eq!(
        fx.host.executed(),
        vec![(
            "workbench.action.tasks.runTask".to_string(),
            vec![json!("build"), json!(2)]
        )]
    );
}

#[tokio::test]
async fn test_concurrent_passes_are_serialized() {
    let fx = Fixture::new();
    fx.config
        .set("commands", json!([{"command": "a", "title": "A"}]));
    fx.engine.activate().await.unwrap();
    fx.config.set(
        "commands",
        json!([{"command": "a", "title": "A"}, {"command": "b", "title": "B"}]),
    );

    let (first, second) = tokio::join!(fx.engine.run_pass(false), fx.engine.run_pass(false));

    // Exactly one of the two observed the change
    let written = [first.unwrap().written, second.unwrap().written];
    assert_eq!(written.iter().filter(|w| **w).count(), 1);
    assert_eq!(
        fx.manifest_ids(),
        vec!["command-palette.a", "command-palette.b"]
    );
}
