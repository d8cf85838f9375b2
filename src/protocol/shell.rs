//! Shell protocol: runs the command block through the user's shell.

use std::process::Command;

use tracing::debug;

use crate::error::{DrakeError, Result};
use crate::fsys::FsFacade;
use crate::materialize::MaterializedStep;

use super::Protocol;

/// The default protocol. Joins the step's command lines into one script and
/// executes it with `$SHELL -c`, CWD pinned to the workflow directory.
#[derive(Debug, Default)]
pub struct ShellProtocol;

impl ShellProtocol {
    pub fn new() -> Self {
        Self
    }
}

/// Shell used for step commands.
fn detect_shell() -> String {
    std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string())
}

impl Protocol for ShellProtocol {
    fn name(&self) -> &str {
        "shell"
    }

    fn cmds_required(&self) -> bool {
        true
    }

    fn run(&self, step: &MaterializedStep, fs: &FsFacade) -> Result<()> {
        let script = step.cmds.join("\n");
        let shell = detect_shell();
        debug!("running step '{}' via {}", step.dirname, shell);

        let status = Command::new(&shell)
            .arg("-c")
            .arg(&script)
            .current_dir(fs.base_dir())
            .envs(&step.vars_env)
            .status()
            .map_err(|e| DrakeError::ProtocolFailure {
                step: step.dirname.clone(),
                detail: format!("failed to start {}: {}", shell, e),
                exit: None,
            })?;

        if !status.success() {
            return Err(DrakeError::ProtocolFailure {
                step: step.dirname.clone(),
                detail: format!("shell exited with {:?}", status.code()),
                exit: status.code(),
            });
        }

        Ok(())
    }
}
