//! Registration Driver
//!
//! Binds each namespaced id to a host command handler for the rest of the
//! process lifetime, and releases every binding on deactivation.

#![allow(clippy::result_large_err)]

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, Weak};

use cmdpal_core::errors::{ExError, ExErrorKind};
use cmdpal_core::host::{CommandHandler, CommandHost};
use cmdpal_core::model::RegistrableAction;
use futures::FutureExt;
use tracing::{debug, info};

/// Tracks the ids this process registered with the host
pub struct RegistrationDriver {
    host: Weak<dyn CommandHost>,
    bound: Mutex<BTreeSet<String>>,
}

impl RegistrationDriver {
    /// Handlers hold only a weak reference to `host`, so the host can
    /// own them without a reference cycle
    pub fn new(host: &Arc<dyn CommandHost>) -> Self {
        Self {
            host: Arc::downgrade(host),
            bound: Mutex::new(BTreeSet::new()),
        }
    }

    fn host(&self) -> Result<Arc<dyn CommandHost>, ExError> {
        self.host.upgrade().ok_or_else(|| {
            ExError::new(ExErrorKind::Registration)
                .with_op("register")
                .with_message("command host is no longer available")
        })
    }

    fn bound(&self) -> Result<std::sync::MutexGuard<'_, BTreeSet<String>>, ExError> {
        self.bound.lock().map_err(|_| {
            ExError::new(ExErrorKind::Internal)
                .with_op("register")
                .with_message("registration table lock poisoned")
        })
    }

    /// Bind every action; an id bound earlier is rebound to the new action
    ///
    /// # Errors
    ///
    /// `Registration` if the host refuses an id. Ids bound before the
    /// failure stay bound.
    pub fn bind_all(&self, actions: &[RegistrableAction]) -> Result<usize, ExError> {
        let host = self.host()?;
        let mut bound = self.bound()?;
        for action in actions {
            let id = action.command_id();
            if bound.remove(id) {
                host.unregister_command(id);
            }
            host.register_command(id, handler_for(&self.host, action.clone()))
                .map_err(|e| e.with_command_id(id))?;
            bound.insert(id.to_string());
            debug!(command_id = id, delegate = action.is_delegate(), "Registered command");
        }
        Ok(actions.len())
    }

    /// Unregister everything this driver bound
    pub fn release_all(&self) -> usize {
        let ids: Vec<String> = match self.bound.lock() {
            Ok(mut bound) => std::mem::take(&mut *bound).into_iter().collect(),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner())
                .into_iter()
                .collect(),
        };
        if let Some(host) = self.host.upgrade() {
            for id in &ids {
                host.unregister_command(id);
            }
        }
        info!(count = ids.len(), "Released command bindings");
        ids.len()
    }

    pub fn bound_ids(&self) -> Vec<String> {
        self.bound
            .lock()
            .map(|b| b.iter().cloned().collect())
            .unwrap_or_default()
    }
}

/// Build the handler invoked when the user runs a namespaced command
pub fn handler_for(host: &Weak<dyn CommandHost>, action: RegistrableAction) -> CommandHandler {
    match action {
        RegistrableAction::Delegate {
            original_command,
            args,
            ..
        } => {
            let host = host.clone();
            Arc::new(move || {
                let host = host.clone();
                let original_command = original_command.clone();
                let args = args.clone();
                async move {
                    let host = host.upgrade().ok_or_else(|| {
                        ExError::new(ExErrorKind::Registration)
                            .with_op("invoke_delegate")
                            .with_command_id(original_command.clone())
                            .with_message("command host is no longer available")
                    })?;
                    host.execute_command(&original_command, args).await
                }
                .boxed()
            })
        }
        RegistrableAction::Bound {
            action,
            args,
            context,
            ..
        } => Arc::new(move || {
            let action = action.clone();
            let args = args.clone();
            let context = context.clone();
            async move { action.invoke(args, context).await }.boxed()
        }),
    }
}
