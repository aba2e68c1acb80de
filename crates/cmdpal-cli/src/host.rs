//! Terminal stand-in for the editor's command host
//!
//! Registered handlers are kept in memory so `invoke` can run them.
//! Commands the terminal cannot run (host commands reached through a
//! delegate, the reload command) are printed instead.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use cmdpal_core::errors::{ExError, ExErrorKind};
use cmdpal_core::host::{CommandHandler, CommandHost, PromptLevel};
use serde_json::Value;
use tracing::debug;

#[derive(Default)]
pub struct ConsoleHost {
    handlers: Mutex<HashMap<String, CommandHandler>>,
    /// Button pressed for every prompt offering it
    auto_answer: Option<String>,
}

impl ConsoleHost {
    pub fn new(auto_answer: Option<String>) -> Self {
        Self {
            auto_answer,
            ..Self::default()
        }
    }

    fn lock_error(op: &str) -> ExError {
        ExError::new(ExErrorKind::Internal)
            .with_op(op)
            .with_message("console host lock poisoned")
    }

    /// Run the handler bound to `id`
    pub async fn invoke(&self, id: &str) -> Result<(), ExError> {
        let handler = self
            .handlers
            .lock()
            .map_err(|_| Self::lock_error("invoke"))?
            .get(id)
            .cloned();
        let Some(handler) = handler else {
            return Err(ExError::new(ExErrorKind::Registration)
                .with_op("invoke")
                .with_command_id(id)
                .with_message("command is not registered"));
        };
        handler().await
    }
}

#[async_trait]
impl CommandHost for ConsoleHost {
    fn register_command(&self, id: &str, handler: CommandHandler) -> Result<(), ExError> {
        let mut handlers = self
            .handlers
            .lock()
            .map_err(|_| Self::lock_error("register_command"))?;
        if handlers.contains_key(id) {
            return Err(ExError::new(ExErrorKind::Registration)
                .with_op("register_command")
                .with_command_id(id)
                .with_message("command is already registered"));
        }
        handlers.insert(id.to_string(), handler);
        Ok(())
    }

    fn unregister_command(&self, id: &str) {
        if let Ok(mut handlers) = self.handlers.lock() {
            handlers.remove(id);
        }
    }

    async fn execute_command(&self, id: &str, args: Vec<Value>) -> Result<(), ExError> {
        println!("{} {}", id, Value::Array(args));
        Ok(())
    }

    async fn set_context(&self, key: &str, value: Value) -> Result<(), ExError> {
        debug!(key, value = %value, "Set context");
        Ok(())
    }

    async fn prompt(&self, level: PromptLevel, message: &str, actions: &[String]) -> Option<String> {
        let label = match level {
            PromptLevel::Info => "info",
            PromptLevel::Error => "error",
        };
        eprintln!("[{}] {}", label, message);
        self.auto_answer
            .as_ref()
            .filter(|answer| actions.contains(answer))
            .cloned()
    }
}
