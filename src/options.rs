//! Process-wide run options.
//!
//! [`Options`] is built exactly once at the CLI boundary and threaded by
//! reference to every component; nothing in the engine mutates it afterwards.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{DrakeError, Result};

/// Default workflow file name, also appended when `--workflow` names a directory.
pub const DEFAULT_WORKFLOW: &str = "workflow.d";

/// Immutable configuration for a single run.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Resolved path of the workflow file.
    pub workflow: PathBuf,
    /// Branch namespace suffix; empty means no branching.
    pub branch: String,
    /// Branch to merge back into the main namespace; empty means no merge.
    pub merge_branch: String,
    /// Skip the confirmation prompt.
    pub auto: bool,
    /// Suppress informational output.
    pub quiet: bool,
    /// Print predicted steps instead of running them.
    pub print: bool,
    /// Optional log file, resolved against the workflow directory.
    pub logfile: Option<PathBuf>,
    /// Variables supplied with `--vars`, overriding the OS environment.
    pub vars: HashMap<String, String>,
    /// Debug logging enabled.
    pub debug: bool,
}

impl Options {
    /// Directory containing the workflow file; the base for all relative paths.
    pub fn workflow_dir(&self) -> PathBuf {
        self.workflow
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Resolve the `--workflow` argument to an existing workflow file.
///
/// A directory gets [`DEFAULT_WORKFLOW`] appended. The file must exist.
pub fn resolve_workflow_path(raw: &Path) -> Result<PathBuf> {
    let path = if raw.is_dir() {
        raw.join(DEFAULT_WORKFLOW)
    } else {
        raw.to_path_buf()
    };

    if !path.is_file() {
        return Err(DrakeError::WorkflowNotFound { path });
    }

    Ok(path)
}

/// Parse a `--vars k=v,k=v` string.
///
/// Each entry must contain exactly one `=`; values containing `=` are
/// rejected rather than silently truncated.
pub fn parse_vars(raw: &str) -> Result<HashMap<String, String>> {
    let mut vars = HashMap::new();

    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }

        let parts: Vec<&str> = entry.split('=').collect();
        if parts.len() != 2 || parts[0].is_empty() {
            return Err(DrakeError::InvalidArgument {
                arg: format!("--vars entry '{}' is not of the form key=value", entry),
            });
        }

        vars.insert(parts[0].to_string(), parts[1].to_string());
    }

    Ok(vars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn parse_vars_single_pair() {
        let vars = parse_vars("MODE=fast").unwrap();
        assert_eq!(vars.get("MODE"), Some(&"fast".to_string()));
    }

    #[test]
    fn parse_vars_multiple_pairs() {
        let vars = parse_vars("A=1,B=2").unwrap();
        assert_eq!(vars.len(), 2);
        assert_eq!(vars.get("B"), Some(&"2".to_string()));
    }

    #[test]
    fn parse_vars_allows_empty_value() {
        let vars = parse_vars("A=").unwrap();
        assert_eq!(vars.get("A"), Some(&String::new()));
    }

    #[test]
    fn parse_vars_rejects_missing_equals() {
        assert!(parse_vars("JUSTAKEY").is_err());
    }

    #[test]
    fn parse_vars_rejects_value_containing_equals() {
        assert!(parse_vars("A=b=c").is_err());
    }

    #[test]
    fn parse_vars_rejects_empty_key() {
        assert!(parse_vars("=value").is_err());
    }

    #[test]
    fn parse_vars_skips_empty_entries() {
        let vars = parse_vars("A=1,,B=2,").unwrap();
        assert_eq!(vars.len(), 2);
    }

    #[test]
    fn resolve_workflow_appends_default_for_directory() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(DEFAULT_WORKFLOW), "").unwrap();

        let resolved = resolve_workflow_path(temp.path()).unwrap();
        assert!(resolved.ends_with(DEFAULT_WORKFLOW));
    }

    #[test]
    fn resolve_workflow_accepts_plain_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("pipeline.d");
        fs::write(&file, "").unwrap();

        let resolved = resolve_workflow_path(&file).unwrap();
        assert_eq!(resolved, file);
    }

    #[test]
    fn resolve_workflow_missing_file_errors() {
        let temp = TempDir::new().unwrap();
        let result = resolve_workflow_path(&temp.path().join("absent.d"));
        assert!(matches!(result, Err(DrakeError::WorkflowNotFound { .. })));
    }

    #[test]
    fn workflow_dir_is_parent_of_file() {
        let opts = Options {
            workflow: PathBuf::from("/data/proj/workflow.d"),
            ..Default::default()
        };
        assert_eq!(opts.workflow_dir(), PathBuf::from("/data/proj"));
    }

    #[test]
    fn workflow_dir_defaults_to_current() {
        let opts = Options {
            workflow: PathBuf::from("workflow.d"),
            ..Default::default()
        };
        assert_eq!(opts.workflow_dir(), PathBuf::from("."));
    }
}
