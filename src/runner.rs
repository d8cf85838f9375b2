//! Ordered step execution.
//!
//! Drives the predicted steps through their protocols, one at a time, in
//! the order the predictor emitted them. Each step is re-checked against
//! the filesystem immediately before running; the prediction is a plan,
//! the run-time check is authoritative.

use std::collections::HashMap;
use std::fs;
use std::time::Instant;

use chrono::Utc;
use tracing::debug;

use crate::branch::adjust_step;
use crate::error::{DrakeError, Result};
use crate::fsys::FsFacade;
use crate::materialize::materialize;
use crate::options::Options;
use crate::predict::{predict, PredictedStep};
use crate::protocol::ProtocolRegistry;
use crate::select::{select_targets, BuildMode};
use crate::staleness::should_build;
use crate::ui::Ui;
use crate::workflow::ParseTree;

/// Directory under the workflow dir holding per-step run state.
pub const STATE_DIR: &str = ".drake";

/// Executes predicted steps through their protocols.
pub struct Runner<'a> {
    tree: &'a ParseTree,
    options: &'a Options,
    fs: &'a FsFacade,
    protocols: &'a ProtocolRegistry,
    base_env: HashMap<String, String>,
    ui: Ui,
}

impl<'a> Runner<'a> {
    pub fn new(
        tree: &'a ParseTree,
        options: &'a Options,
        fs: &'a FsFacade,
        protocols: &'a ProtocolRegistry,
        base_env: HashMap<String, String>,
        ui: Ui,
    ) -> Self {
        Self {
            tree,
            options,
            fs,
            protocols,
            base_env,
            ui,
        }
    }

    /// Select, predict, confirm and run. Returns the number of steps run.
    pub fn run(&self, targets: &[String]) -> Result<usize> {
        let selected = select_targets(self.tree, targets)?;
        let predicted = predict(self.tree, &selected, self.options, self.fs)?;

        if predicted.is_empty() {
            self.ui.message("Nothing to do.");
            return Ok(0);
        }

        if self.options.print {
            for step in &predicted {
                self.print_record(step)?;
            }
            return Ok(0);
        }

        if !self.options.auto {
            self.ui.message("The following steps will be run, in order:");
            for (number, step) in predicted.iter().enumerate() {
                self.ui.message(&format!(
                    "  {}. {} [{}]",
                    number + 1,
                    self.step_string(step)?,
                    step.cause
                ));
            }
            if !self.ui.confirm("Confirm?")? {
                return Err(DrakeError::Aborted);
            }
        }

        let mut steps_run = 0;
        for (number, step) in predicted.iter().enumerate() {
            if self.run_step(number + 1, step)? {
                steps_run += 1;
            }
        }

        self.ui.success(&format!("Done ({} steps run).", steps_run));
        Ok(steps_run)
    }

    /// Materialize and execute a single predicted step.
    ///
    /// Returns whether the step actually ran.
    fn run_step(&self, number: usize, predicted: &PredictedStep) -> Result<bool> {
        let materialized = materialize(
            self.tree,
            predicted.index,
            &self.base_env,
            self.options,
            self.fs,
            self.protocols,
        )?;

        // Authoritative decision: predecessors have run by now, so the
        // triggering projection no longer applies and inputs must exist.
        let cause = should_build(
            self.tree.step(predicted.index),
            self.options,
            self.fs,
            predicted.build == BuildMode::Forced,
            false,
            predicted.match_type,
            true,
        )?;

        let Some(cause) = cause else {
            self.ui
                .message(&format!("--- {}. Skipped (up-to-date)", number));
            return Ok(false);
        };

        self.ui
            .message(&format!("--- {}. Running ({})", number, cause));

        let start_ms = Utc::now().timestamp_millis();
        self.dump_vars(&materialized.dirname, &materialized.vars_env, start_ms)?;

        let start = Instant::now();
        let protocol = self.protocols.get(materialized.opts.protocol())?;
        protocol.run(&materialized, self.fs)?;

        self.ui.message(&format!(
            "--- {}. Done in {:.2}s",
            number,
            start.elapsed().as_secs_f64()
        ));

        Ok(true)
    }

    /// `outputs <- inputs` display form of the branch-adjusted step.
    fn step_string(&self, predicted: &PredictedStep) -> Result<String> {
        let step = self.tree.step(predicted.index);
        let adjusted = adjust_step(
            step,
            self.options,
            self.fs,
            predicted.assumes_branch_inputs(),
        )?;

        let lhs: Vec<String> = adjusted
            .output_tags
            .iter()
            .map(|t| format!("%{}", t))
            .chain(adjusted.outputs.iter().cloned())
            .collect();
        let rhs: Vec<String> = adjusted
            .input_tags
            .iter()
            .map(|t| format!("%{}", t))
            .chain(adjusted.inputs.iter().cloned())
            .collect();

        Ok(format!("{} <- {}", lhs.join(", "), rhs.join(", ")))
    }

    /// One print-mode record: step marker, then inputs, tags and outputs.
    fn print_record(&self, predicted: &PredictedStep) -> Result<()> {
        let step = self.tree.step(predicted.index);
        let adjusted = adjust_step(
            step,
            self.options,
            self.fs,
            predicted.assumes_branch_inputs(),
        )?;

        println!("S");
        for input in &adjusted.inputs {
            println!("I\t{}", input);
        }
        for tag in &adjusted.input_tags {
            println!("%I\t{}", tag);
        }
        for output in &adjusted.outputs {
            println!("O\t{}", output);
        }
        for tag in &adjusted.output_tags {
            println!("%O\t{}", tag);
        }

        Ok(())
    }

    /// Persist the step's variable environment for post-mortem inspection.
    fn dump_vars(
        &self,
        dirname: &str,
        vars_env: &HashMap<String, String>,
        start_ms: i64,
    ) -> Result<()> {
        let dir = self.options.workflow_dir().join(STATE_DIR).join(dirname);
        fs::create_dir_all(&dir)?;

        let mut entries: Vec<(&String, &String)> = vars_env.iter().collect();
        entries.sort_by_key(|(k, _)| k.as_str());

        let mut content = String::new();
        for (key, value) in entries {
            content.push_str(key);
            content.push('=');
            content.push_str(value);
            content.push('\n');
        }

        let path = dir.join(format!("vars-{}", start_ms));
        debug!("dumping step environment to {}", path.display());
        fs::write(path, content)?;
        Ok(())
    }
}
