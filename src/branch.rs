//! Branch-namespaced artifact handling.
//!
//! A branch isolates experimental runs: outputs land in `path#branch`
//! while inputs read through to the base namespace when no branch copy
//! exists yet.

use crate::error::Result;
use crate::fsys::FsFacade;
use crate::options::Options;
use crate::workflow::Step;

/// Append the branch suffix to a path.
pub fn branch_path(path: &str, branch: &str) -> String {
    format!("{}#{}", path, branch)
}

/// Rewrite a step's inputs and outputs for the active branch.
///
/// Outputs always move into the branch namespace. Inputs move when
/// `add_to_all` is set (the caller knows a scheduled dependency is about to
/// produce the branch copy), or when the branch copy already exists on disk.
/// With no branch configured the step is returned unchanged.
pub fn adjust_step(
    step: &Step,
    options: &Options,
    fs: &FsFacade,
    add_to_all: bool,
) -> Result<Step> {
    if options.branch.is_empty() {
        return Ok(step.clone());
    }

    let branch = &options.branch;
    let mut adjusted = step.clone();

    adjusted.outputs = step
        .outputs
        .iter()
        .map(|o| branch_path(o, branch))
        .collect();

    let mut inputs = Vec::with_capacity(step.inputs.len());
    for input in &step.inputs {
        let branched = branch_path(input, branch);
        if add_to_all || fs.data_in(&branched)? {
            inputs.push(branched);
        } else {
            inputs.push(input.clone());
        }
    }
    adjusted.inputs = inputs;

    Ok(adjusted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn step(inputs: &[&str], outputs: &[&str]) -> Step {
        Step {
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn options(branch: &str) -> Options {
        Options {
            branch: branch.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn no_branch_leaves_step_unchanged() {
        let temp = TempDir::new().unwrap();
        let fs = FsFacade::new(temp.path());

        let adjusted = adjust_step(&step(&["a"], &["b"]), &options(""), &fs, false).unwrap();
        assert_eq!(adjusted.inputs, vec!["a"]);
        assert_eq!(adjusted.outputs, vec!["b"]);
    }

    #[test]
    fn outputs_always_get_branch_suffix() {
        let temp = TempDir::new().unwrap();
        let fs = FsFacade::new(temp.path());

        let adjusted = adjust_step(&step(&[], &["b"]), &options("x"), &fs, false).unwrap();
        assert_eq!(adjusted.outputs, vec!["b#x"]);
    }

    #[test]
    fn input_reads_through_to_base_when_branch_copy_missing() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a"), "base").unwrap();
        let fs = FsFacade::new(temp.path());

        let adjusted = adjust_step(&step(&["a"], &["b"]), &options("x"), &fs, false).unwrap();
        assert_eq!(adjusted.inputs, vec!["a"]);
    }

    #[test]
    fn input_uses_branch_copy_when_present() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a"), "base").unwrap();
        fs::write(temp.path().join("a#x"), "branch").unwrap();
        let fs = FsFacade::new(temp.path());

        let adjusted = adjust_step(&step(&["a"], &["b"]), &options("x"), &fs, false).unwrap();
        assert_eq!(adjusted.inputs, vec!["a#x"]);
    }

    #[test]
    fn add_to_all_forces_branch_inputs() {
        let temp = TempDir::new().unwrap();
        let fs = FsFacade::new(temp.path());

        let adjusted = adjust_step(&step(&["a"], &["b"]), &options("x"), &fs, true).unwrap();
        assert_eq!(adjusted.inputs, vec!["a#x"]);
    }

    #[test]
    fn adjustment_preserves_cardinality() {
        let temp = TempDir::new().unwrap();
        let fs = FsFacade::new(temp.path());

        let original = step(&["a", "b", "c"], &["d", "e"]);
        let adjusted = adjust_step(&original, &options("x"), &fs, false).unwrap();
        assert_eq!(adjusted.inputs.len(), original.inputs.len());
        assert_eq!(adjusted.outputs.len(), original.outputs.len());
    }
}
