//! Interpreter protocols: feed the command block to an interpreter on stdin.

use std::io::Write;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{DrakeError, Result};
use crate::fsys::FsFacade;
use crate::materialize::MaterializedStep;

use super::Protocol;

/// A protocol that pipes the step's command block into an interpreter
/// process (`python`, `ruby`).
#[derive(Debug)]
pub struct InterpreterProtocol {
    name: String,
    bin: String,
}

impl InterpreterProtocol {
    pub fn new(name: impl Into<String>, bin: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bin: bin.into(),
        }
    }
}

impl Protocol for InterpreterProtocol {
    fn name(&self) -> &str {
        &self.name
    }

    fn cmds_required(&self) -> bool {
        true
    }

    fn run(&self, step: &MaterializedStep, fs: &FsFacade) -> Result<()> {
        let script = step.cmds.join("\n");
        debug!("running step '{}' via {}", step.dirname, self.bin);

        let fail = |detail: String, exit: Option<i32>| DrakeError::ProtocolFailure {
            step: step.dirname.clone(),
            detail,
            exit,
        };

        let mut child = Command::new(&self.bin)
            .current_dir(fs.base_dir())
            .envs(&step.vars_env)
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|e| fail(format!("failed to start {}: {}", self.bin, e), None))?;

        if let Some(stdin) = child.stdin.take() {
            let mut stdin = stdin;
            stdin
                .write_all(script.as_bytes())
                .map_err(|e| fail(format!("failed to write script: {}", e), None))?;
        }

        let status = child
            .wait()
            .map_err(|e| fail(format!("failed to wait for {}: {}", self.bin, e), None))?;

        if !status.success() {
            return Err(fail(
                format!("{} exited with {:?}", self.name, status.code()),
                status.code(),
            ));
        }

        Ok(())
    }
}
