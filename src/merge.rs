//! Branch merge: promote branch outputs back to the main namespace.

use crate::branch::branch_path;
use crate::error::{DrakeError, Result};
use crate::fsys::FsFacade;
use crate::options::Options;
use crate::select::select_targets;
use crate::ui::Ui;
use crate::workflow::ParseTree;

/// A single pending promotion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Move {
    pub src: String,
    pub dst: String,
}

/// Compute the move list for the selected steps' outputs.
///
/// An output participates when its branch copy exists; order follows the
/// selection order.
pub fn plan_moves(
    tree: &ParseTree,
    targets: &[String],
    options: &Options,
    fs: &FsFacade,
) -> Result<Vec<Move>> {
    let branch = &options.merge_branch;
    let selected = select_targets(tree, targets)?;

    let mut moves = Vec::new();
    for selection in &selected {
        for output in &tree.step(selection.index).outputs {
            let src = branch_path(output, branch);
            if fs.data_in(&src)? {
                moves.push(Move {
                    src,
                    dst: output.clone(),
                });
            }
        }
    }

    Ok(moves)
}

/// Merge the branch into the main namespace, prompting unless `--auto`.
///
/// Each move is `rm` (tolerating absence) followed by `mv`, atomically per
/// file; a failure aborts the remaining moves without rolling back the
/// completed ones.
pub fn merge_branch(
    tree: &ParseTree,
    targets: &[String],
    options: &Options,
    fs: &FsFacade,
    ui: &Ui,
) -> Result<()> {
    let moves = plan_moves(tree, targets, options, fs)?;

    if moves.is_empty() {
        ui.message("Nothing to do.");
        return Ok(());
    }

    ui.message("The following files will be moved:");
    for m in &moves {
        ui.message(&format!("  {} -> {}", m.src, m.dst));
    }

    if !options.auto && !ui.confirm("Confirm?")? {
        return Err(DrakeError::Aborted);
    }

    for m in &moves {
        fs.rm(&m.dst)?;
        fs.mv(&m.src, &m.dst)?;
    }

    ui.success(&format!("Done ({} files moved).", moves.len()));
    Ok(())
}
