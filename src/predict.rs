//! Out-of-date prediction over a target selection.
//!
//! Folds the staleness oracle over the selected steps in order, propagating
//! the triggering closure: once a step is chosen to run, every transitive
//! dependency of it is treated as about-to-be-rebuilt when later selections
//! are evaluated.

use std::collections::HashSet;

use crate::error::Result;
use crate::fsys::FsFacade;
use crate::options::Options;
use crate::select::{BuildMode, MatchType, TargetSelection};
use crate::staleness::{should_build, Cause};
use crate::workflow::ParseTree;

/// A selection the oracle decided to run, with its reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictedStep {
    pub index: usize,
    pub build: BuildMode,
    pub match_type: MatchType,
    pub cause: Cause,
}

impl PredictedStep {
    /// Whether the confirmation display should pretend branch inputs exist.
    pub fn assumes_branch_inputs(&self) -> bool {
        matches!(
            self.cause,
            Cause::ProjectedTimestamped | Cause::Forced { .. }
        )
    }
}

/// Predict which selected steps will run, preserving selection order.
pub fn predict(
    tree: &ParseTree,
    selections: &[TargetSelection],
    options: &Options,
    fs: &FsFacade,
) -> Result<Vec<PredictedStep>> {
    let mut predicted = Vec::new();
    let mut triggered_deps: HashSet<usize> = HashSet::new();

    for selection in selections {
        let cause = should_build(
            tree.step(selection.index),
            options,
            fs,
            selection.build == BuildMode::Forced,
            triggered_deps.contains(&selection.index),
            selection.match_type,
            false,
        )?;

        if let Some(cause) = cause {
            predicted.push(PredictedStep {
                index: selection.index,
                build: selection.build,
                match_type: selection.match_type,
                cause,
            });
            triggered_deps.extend(tree.all_dependencies(selection.index));
        }
    }

    Ok(predicted)
}
