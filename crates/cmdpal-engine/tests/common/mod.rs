//! Fake collaborators for engine tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cmdpal_core::errors::{ExError, ExErrorKind};
use cmdpal_core::host::{
    CommandHandler, CommandHost, ConfigurationProvider, MemoryStateStore, PromptLevel,
};
use cmdpal_core::settings::qualified_key;
use cmdpal_engine::{Collaborators, EngineOptions, JsonScriptLoader, PaletteEngine};
use serde_json::Value;
use tempfile::TempDir;

/// Mutable in-memory configuration
#[derive(Default)]
pub struct TestConfig {
    values: Mutex<HashMap<String, Value>>,
}

impl TestConfig {
    /// Set `command-palette.<key>`
    pub fn set(&self, key: &str, value: Value) {
        self.values.lock().unwrap().insert(qualified_key(key), value);
    }

    pub fn unset(&self, key: &str) {
        self.values.lock().unwrap().remove(&qualified_key(key));
    }
}

impl ConfigurationProvider for TestConfig {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().unwrap().get(key).cloned()
    }
}

/// Records everything the engine asks of the host
#[derive(Default)]
pub struct FakeHost {
    handlers: Mutex<HashMap<String, CommandHandler>>,
    executed: Mutex<Vec<(String, Vec<Value>)>>,
    prompts: Mutex<Vec<(PromptLevel, String)>>,
    context: Mutex<HashMap<String, Value>>,
    answer: Mutex<Option<String>>,
}

impl FakeHost {
    /// Button picked for every subsequent prompt
    pub fn answer_with(&self, action: Option<&str>) {
        *self.answer.lock().unwrap() = action.map(str::to_string);
    }

    pub fn registered(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.handlers.lock().unwrap().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn executed(&self) -> Vec<(String, Vec<Value>)> {
        self.executed.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<(PromptLevel, String)> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn context(&self, key: &str) -> Option<Value> {
        self.context.lock().unwrap().get(key).cloned()
    }

    /// Run the handler registered under `id`, as the palette would
    pub async fn invoke(&self, id: &str) -> Result<(), ExError> {
        let handler = self.handlers.lock().unwrap().get(id).cloned();
        match handler {
            Some(handler) => handler().await,
            None => Err(ExError::new(ExErrorKind::Registration)
                .with_command_id(id)
                .with_message("not registered")),
        }
    }
}

#[async_trait]
impl CommandHost for FakeHost {
    fn register_command(&self, id: &str, handler: CommandHandler) -> Result<(), ExError> {
        let mut handlers = self.handlers.lock().unwrap();
        if handlers.contains_key(id) {
            return Err(ExError::new(ExErrorKind::Registration)
                .with_command_id(id)
                .with_message("already registered"));
        }
        handlers.insert(id.to_string(), handler);
        Ok(())
    }

    fn unregister_command(&self, id: &str) {
        self.handlers.lock().unwrap().remove(id);
    }

    async fn execute_command(&self, id: &str, args: Vec<Value>) -> Result<(), ExError> {
        self.executed.lock().unwrap().push((id.to_string(), args));
        Ok(())
    }

    async fn set_context(&self, key: &str, value: Value) -> Result<(), ExError> {
        self.context.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn prompt(&self, level: PromptLevel, message: &str, _actions: &[String]) -> Option<String> {
        self.prompts.lock().unwrap().push((level, message.to_string()));
        self.answer.lock().unwrap().clone()
    }
}

/// An engine wired to fakes over a temporary directory
pub struct Fixture {
    pub dir: TempDir,
    pub config: Arc<TestConfig>,
    pub state: Arc<MemoryStateStore>,
    pub host: Arc<FakeHost>,
    pub engine: PaletteEngine,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_state(Arc::new(MemoryStateStore::new()))
    }

    /// Share `state` with another fixture (same machine, same workspace)
    pub fn with_state(state: Arc<MemoryStateStore>) -> Self {
        let dir = TempDir::new().unwrap();
        Self::in_dir(dir, state)
    }

    pub fn in_dir(dir: TempDir, state: Arc<MemoryStateStore>) -> Self {
        Self::configured(dir, state, |options| options)
    }

    /// Adjust the default options (manifest and cache inside `dir`)
    pub fn configured(
        dir: TempDir,
        state: Arc<MemoryStateStore>,
        adjust: impl FnOnce(EngineOptions) -> EngineOptions,
    ) -> Self {
        let config = Arc::new(TestConfig::default());
        let host = Arc::new(FakeHost::default());
        let options = adjust(EngineOptions::new(
            dir.path().join("package.json"),
            dir.path().join("cache"),
        ));
        let engine = PaletteEngine::new(
            options,
            Collaborators {
                config: config.clone(),
                state: state.clone(),
                host: host.clone(),
                loader: Arc::new(JsonScriptLoader::new()),
            },
        );
        Self {
            dir,
            config,
            state,
            host,
            engine,
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.path().join("package.json")
    }

    pub fn manifest(&self) -> Value {
        let bytes = std::fs::read(self.manifest_path()).unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    pub fn write_manifest(&self, document: &Value) {
        std::fs::write(
            self.manifest_path(),
            serde_json::to_vec_pretty(document).unwrap(),
        )
        .unwrap();
    }

    /// Ids listed under `contributes.commands`
    pub fn manifest_ids(&self) -> Vec<String> {
        self.manifest()["contributes"]["commands"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["command"].as_str().unwrap().to_string())
            .collect()
    }

    pub fn write_script(&self, name: &str, declarations: &Value) -> PathBuf {
        let path = self.dir.path().join(name);
        write_script_at(&path, declarations);
        path
    }
}

pub fn write_script_at(path: &Path, declarations: &Value) {
    std::fs::write(path, serde_json::to_vec(declarations).unwrap()).unwrap();
}

/// Push a file's mtime into the future so cached copies look outdated
pub fn touch_future(path: &Path) {
    let file = std::fs::OpenOptions::new().write(true).open(path).unwrap();
    file.set_modified(std::time::SystemTime::now() + std::time::Duration::from_secs(60))
        .unwrap();
}
