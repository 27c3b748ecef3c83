//! Registry of loaded collaborator modules.
//!
//! Modules contribute two things to this core: command functions a route
//! script can invoke, and an optional on-break hook run after a script ends
//! in an explicit stop.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use siprelay_core::SipMsg;

use crate::action::CommandFn;

/// Hook run when a route script ends in an explicit stop.
pub type OnBreakFn = Arc<dyn Fn(&SipMsg) + Send + Sync>;

/// Capabilities one loaded module contributes.
#[derive(Clone, Default)]
pub struct Module {
    name: String,
    on_break: Option<OnBreakFn>,
    commands: HashMap<String, CommandFn>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Module {
            name: name.into(),
            on_break: None,
            commands: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attach the on-break hook.
    pub fn with_on_break(mut self, hook: OnBreakFn) -> Self {
        self.on_break = Some(hook);
        self
    }

    /// Register a command function under `name`.
    pub fn with_command(mut self, name: impl Into<String>, command: CommandFn) -> Self {
        self.commands.insert(name.into(), command);
        self
    }
}

/// Ordered collection of loaded modules.
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    modules: Vec<Module>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        ModuleRegistry {
            modules: Vec::new(),
        }
    }

    /// Register a module; hooks later fire in registration order.
    pub fn register(&mut self, module: Module) {
        self.modules.push(module);
    }

    /// Look up a command function by module and command name.
    pub fn command(&self, module: &str, name: &str) -> Option<CommandFn> {
        self.modules
            .iter()
            .find(|m| m.name == module)
            .and_then(|m| m.commands.get(name))
            .cloned()
    }

    /// Notification fan-out after an explicit stop.
    ///
    /// This is not a decision point: hook results are invisible to the
    /// interpreter.
    pub fn notify_break(&self, msg: &SipMsg) {
        for module in &self.modules {
            if let Some(hook) = &module.on_break {
                debug!("running on-break hook of module {}", module.name);
                (hook.as_ref())(msg);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
