//! Execution protocols.
//!
//! A protocol turns a materialized step into a running child process. The
//! engine only knows the [`Protocol`] contract; concrete implementations are
//! registered by name at process start and looked up through the step's
//! `protocol` option.

pub mod interpreter;
pub mod shell;

pub use interpreter::InterpreterProtocol;
pub use shell::ShellProtocol;

use std::collections::{HashMap, HashSet};

use crate::error::{DrakeError, Result};
use crate::fsys::FsFacade;
use crate::materialize::MaterializedStep;

/// Contract every execution protocol implements.
pub trait Protocol {
    /// Registry key.
    fn name(&self) -> &str;

    /// Whether an empty command list fails materialization.
    fn cmds_required(&self) -> bool;

    /// Run the step. Failure is fatal for the whole run.
    fn run(&self, step: &MaterializedStep, fs: &FsFacade) -> Result<()>;
}

/// Static protocol registry, populated at process start.
pub struct ProtocolRegistry {
    protocols: HashMap<String, Box<dyn Protocol>>,
}

impl ProtocolRegistry {
    /// Registry with the built-in protocols: `shell`, `python`, `ruby`.
    pub fn new() -> Self {
        let mut registry = Self {
            protocols: HashMap::new(),
        };
        registry.register(Box::new(ShellProtocol::new()));
        registry.register(Box::new(InterpreterProtocol::new("python", "python3")));
        registry.register(Box::new(InterpreterProtocol::new("ruby", "ruby")));
        registry
    }

    /// Register a protocol, replacing any previous one with the same name.
    pub fn register(&mut self, protocol: Box<dyn Protocol>) {
        self.protocols
            .insert(protocol.name().to_string(), protocol);
    }

    /// Look up a protocol by name.
    pub fn get(&self, name: &str) -> Result<&dyn Protocol> {
        self.protocols
            .get(name)
            .map(|p| p.as_ref())
            .ok_or_else(|| DrakeError::UnknownProtocol {
                name: name.to_string(),
            })
    }

    /// Names of all registered protocols, for parse-time validation.
    pub fn names(&self) -> HashSet<String> {
        self.protocols.keys().cloned().collect()
    }
}

impl Default for ProtocolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
