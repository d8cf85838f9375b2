//! Step materialization.
//!
//! Turns a declarative step into an executable command list: branch
//! adjustment, path normalization, variable environment assembly, method
//! inheritance, fragment substitution and whitespace normalization.

use std::collections::HashMap;

use crate::branch::adjust_step;
use crate::error::{DrakeError, Result};
use crate::fsys::FsFacade;
use crate::options::Options;
use crate::protocol::ProtocolRegistry;
use crate::workflow::{CommandLine, Fragment, MethodMode, ParseTree, StepOptions};

/// A step ready for its protocol: paths normalized, commands flattened.
#[derive(Debug, Clone)]
pub struct MaterializedStep {
    pub index: usize,
    pub dirname: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub input_tags: Vec<String>,
    pub output_tags: Vec<String>,
    pub cmds: Vec<String>,
    pub vars_env: HashMap<String, String>,
    pub opts: StepOptions,
}

/// Materialize the step at `index`.
///
/// `base_env` is the ambient variable scope: OS environment merged under
/// `--vars`. Step vars override it, and the derived `INPUT*`/`OUTPUT*`
/// entries override everything.
pub fn materialize(
    tree: &ParseTree,
    index: usize,
    base_env: &HashMap<String, String>,
    options: &Options,
    fs: &FsFacade,
    protocols: &ProtocolRegistry,
) -> Result<MaterializedStep> {
    let step = tree.step(index);

    if step.inputs.iter().any(|i| i.starts_with('?')) {
        return Err(DrakeError::UnsupportedOptionalInput {
            step: step.dirname.clone(),
        });
    }

    let adjusted = adjust_step(step, options, fs, false)?;

    let inputs: Vec<String> = adjusted.inputs.iter().map(|p| fs.display_path(p)).collect();
    let outputs: Vec<String> = adjusted.outputs.iter().map(|p| fs.display_path(p)).collect();

    // Method inheritance: commands, vars and opts, the step winning on all.
    let mut vars = step.vars.clone();
    let mut opts = step.opts.clone();
    let cmds_fragments: Vec<CommandLine> = match &step.opts.method {
        None => step.cmds.clone(),
        Some(name) => {
            // Existence was checked when the tree was built.
            let method =
                tree.methods()
                    .get(name)
                    .ok_or_else(|| DrakeError::UnknownMethod {
                        step: step.dirname.clone(),
                        name: name.clone(),
                    })?;

            let mut merged_vars = method.vars.clone();
            merged_vars.extend(step.vars.clone());
            vars = merged_vars;

            opts = step.opts.merged_over(&method.opts);

            match step.opts.method_mode() {
                MethodMode::Replace => step.cmds.clone(),
                MethodMode::Append => {
                    let mut cmds = method.cmds.clone();
                    cmds.extend(step.cmds.clone());
                    cmds
                }
                MethodMode::Use => method.cmds.clone(),
            }
        }
    };

    let mut vars_env = base_env.clone();
    vars_env.extend(vars);
    extend_with_io_vars(&mut vars_env, "INPUT", &inputs);
    extend_with_io_vars(&mut vars_env, "OUTPUT", &outputs);

    let mut cmds = Vec::with_capacity(cmds_fragments.len());
    for line in &cmds_fragments {
        cmds.push(substitute(line, &vars_env)?);
    }
    let cmds = de_space(&cmds);

    let protocol = protocols.get(opts.protocol())?;
    if cmds.is_empty() && protocol.cmds_required() {
        return Err(DrakeError::EmptyCommands {
            step: step.dirname.clone(),
        });
    }

    Ok(MaterializedStep {
        index,
        dirname: step.dirname.clone(),
        inputs,
        outputs,
        input_tags: step.input_tags.clone(),
        output_tags: step.output_tags.clone(),
        cmds,
        vars_env,
        opts,
    })
}

/// Add `NAME`, `NAME0..NAMEn-1` and `NAMES` entries for a path list.
fn extend_with_io_vars(env: &mut HashMap<String, String>, prefix: &str, paths: &[String]) {
    if let Some(first) = paths.first() {
        env.insert(prefix.to_string(), first.clone());
    }
    for (i, path) in paths.iter().enumerate() {
        env.insert(format!("{}{}", prefix, i), path.clone());
    }
    env.insert(format!("{}S", prefix), paths.join(" "));
}

/// Concatenate a fragment line, resolving references against `env`.
fn substitute(line: &CommandLine, env: &HashMap<String, String>) -> Result<String> {
    let mut out = String::new();
    for fragment in line {
        match fragment {
            Fragment::Literal(text) => out.push_str(text),
            Fragment::VarRef(name) => {
                let value = env.get(name).ok_or_else(|| DrakeError::UndefinedVariable {
                    name: name.clone(),
                })?;
                out.push_str(value);
            }
        }
    }
    Ok(out)
}

/// Strip the first line's leading whitespace prefix from every line that
/// starts with it, preserving deeper relative indentation.
pub fn de_space(cmds: &[String]) -> Vec<String> {
    let Some(first) = cmds.first() else {
        return Vec::new();
    };

    let prefix: String = first
        .chars()
        .take_while(|&c| c == ' ' || c == '\t')
        .collect();

    if prefix.is_empty() {
        return cmds.to_vec();
    }

    cmds.iter()
        .map(|line| match line.strip_prefix(&prefix) {
            Some(stripped) => stripped.to_string(),
            None => line.clone(),
        })
        .collect()
}
