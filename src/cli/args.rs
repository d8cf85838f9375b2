//! CLI argument definitions.
//!
//! All flags are defined with clap's derive macros. Target expressions are
//! trailing positionals; hyphen values are allowed there so the `-name`
//! exclusion form survives parsing.

use clap::Parser;
use std::path::PathBuf;

/// drake - timestamp-driven data-workflow engine.
#[derive(Debug, Parser)]
#[command(name = "drake")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// Path to the workflow file (a directory gets workflow.d appended)
    #[arg(short, long, default_value = "./workflow.d")]
    pub workflow: PathBuf,

    /// Run all steps in the given branch namespace
    #[arg(short, long, default_value = "", conflicts_with = "merge_branch")]
    pub branch: String,

    /// Merge the given branch back into the main namespace
    #[arg(long, default_value = "")]
    pub merge_branch: String,

    /// Run without the confirmation prompt
    #[arg(short, long)]
    pub auto: bool,

    /// Minimal output
    #[arg(short, long)]
    pub quiet: bool,

    /// Print the predicted steps instead of running them
    #[arg(short, long)]
    pub print: bool,

    /// Log file (relative paths resolve against the workflow directory)
    #[arg(short, long)]
    pub logfile: Option<PathBuf>,

    /// Workflow variables, e.g. -v KEY=value,KEY2=value2
    #[arg(short, long)]
    pub vars: Option<String>,

    /// Target expressions (default: everything)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub targets: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let cli = Cli::parse_from(["drake"]);
        assert_eq!(cli.workflow, PathBuf::from("./workflow.d"));
        assert!(cli.branch.is_empty());
        assert!(!cli.auto);
        assert!(cli.targets.is_empty());
    }

    #[test]
    fn positional_targets_are_collected() {
        let cli = Cli::parse_from(["drake", "out.csv", "%tag"]);
        assert_eq!(cli.targets, vec!["out.csv", "%tag"]);
    }

    #[test]
    fn exclusion_targets_survive_after_first_positional() {
        let cli = Cli::parse_from(["drake", "=...", "-out.csv"]);
        assert_eq!(cli.targets, vec!["=...", "-out.csv"]);
    }

    #[test]
    fn branch_conflicts_with_merge_branch() {
        let result = Cli::try_parse_from(["drake", "-b", "x", "--merge-branch", "x"]);
        assert!(result.is_err());
    }

    #[test]
    fn flags_before_targets_are_parsed() {
        let cli = Cli::parse_from(["drake", "-a", "-p", "out.csv"]);
        assert!(cli.auto);
        assert!(cli.print);
        assert_eq!(cli.targets, vec!["out.csv"]);
    }

    #[test]
    fn vars_flag_takes_a_value() {
        let cli = Cli::parse_from(["drake", "-v", "A=1,B=2"]);
        assert_eq!(cli.vars.as_deref(), Some("A=1,B=2"));
    }
}
