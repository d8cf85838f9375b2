//! CLI orchestration.
//!
//! Builds the immutable [`Options`] from parsed arguments, assembles the
//! base variable environment, and dispatches to the runner or the merge
//! coordinator.

pub mod args;

pub use args::Cli;

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::error::Result;
use crate::fsys::FsFacade;
use crate::merge::merge_branch;
use crate::options::{parse_vars, resolve_workflow_path, Options};
use crate::parser::parse_workflow;
use crate::protocol::ProtocolRegistry;
use crate::runner::Runner;
use crate::ui::Ui;

/// Build run options from parsed arguments.
///
/// Resolves the workflow path, parses `--vars`, and anchors a relative
/// logfile against the workflow directory.
pub fn build_options(cli: &Cli) -> Result<Options> {
    let workflow = resolve_workflow_path(&cli.workflow)?;
    let workflow_dir = workflow
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let vars = match &cli.vars {
        Some(raw) => parse_vars(raw)?,
        None => HashMap::new(),
    };

    let logfile = cli.logfile.as_ref().map(|path| {
        if path.is_absolute() {
            path.clone()
        } else {
            workflow_dir.join(path)
        }
    });

    Ok(Options {
        workflow,
        branch: cli.branch.clone(),
        merge_branch: cli.merge_branch.clone(),
        auto: cli.auto,
        quiet: cli.quiet,
        print: cli.print,
        logfile,
        vars,
        debug: cli.debug,
    })
}

/// The ambient variable scope: OS environment merged under `--vars`.
pub fn base_environment(options: &Options) -> HashMap<String, String> {
    let mut env: HashMap<String, String> = std::env::vars().collect();
    env.extend(options.vars.clone());
    env
}

/// Parse the workflow and execute the requested terminal mode.
pub fn run(options: &Options, targets: &[String]) -> Result<()> {
    let text = fs::read_to_string(&options.workflow)?;

    // Anchor the facade on the absolute workflow directory so artifacts
    // land there no matter what the process CWD is.
    let base_dir = fs::canonicalize(options.workflow_dir())?;
    let fs_facade = FsFacade::new(base_dir);

    let protocols = ProtocolRegistry::new();
    let base_env = base_environment(options);
    let tree = parse_workflow(&text, base_env.clone(), protocols.names())?;

    let targets: Vec<String> = if targets.is_empty() {
        vec!["=...".to_string()]
    } else {
        targets.to_vec()
    };

    let ui = Ui::new(options.quiet);

    if !options.merge_branch.is_empty() {
        return merge_branch(&tree, &targets, options, &fs_facade, &ui);
    }

    let runner = Runner::new(&tree, options, &fs_facade, &protocols, base_env, ui);
    runner.run(&targets)?;
    Ok(())
}
