//! Target selection.
//!
//! Resolves user target expressions to an ordered list of step selections.
//!
//! Grammar:
//!
//! - `=...` selects every step
//! - a plain name matches step outputs, then tags, then methods, and brings
//!   the step's transitive dependencies along
//! - `%name` matches tags only
//! - `+name` is the explicit form of the dependency-including default
//! - `^name` selects the named step only
//! - `-name` excludes the named step from the selection so far
//! - `!` marks the selection as forced (unconditional build)

use std::collections::HashMap;

use crate::error::{DrakeError, Result};
use crate::workflow::ParseTree;

/// Whether a selected step builds unconditionally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BuildMode {
    Normal,
    Forced,
}

/// How a target expression matched a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    Output,
    Tag,
    Method,
}

impl MatchType {
    /// Output matches are the weakest annotation; tag and method matches
    /// name the step deliberately and survive deduplication.
    fn specificity(self) -> u8 {
        match self {
            MatchType::Output => 0,
            MatchType::Tag | MatchType::Method => 1,
        }
    }
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MatchType::Output => "output",
            MatchType::Tag => "tag",
            MatchType::Method => "method",
        };
        write!(f, "{}", s)
    }
}

/// One selected step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSelection {
    pub index: usize,
    pub build: BuildMode,
    pub match_type: MatchType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    WithDeps,
    Only,
    Exclude,
}

/// Resolve target expressions against a parse tree.
///
/// The result is deduplicated (strongest annotation wins) and ordered so
/// every selected dependency precedes its dependents.
pub fn select_targets(tree: &ParseTree, exprs: &[String]) -> Result<Vec<TargetSelection>> {
    let mut selections: Vec<TargetSelection> = Vec::new();
    let mut positions: HashMap<usize, usize> = HashMap::new();

    for expr in exprs {
        let (mode, forced, name) = parse_expr(expr);

        if name == "=..." {
            for index in 0..tree.steps().len() {
                push(
                    &mut selections,
                    &mut positions,
                    TargetSelection {
                        index,
                        build: if forced { BuildMode::Forced } else { BuildMode::Normal },
                        match_type: MatchType::Output,
                    },
                );
            }
            continue;
        }

        let (matched, match_type) = resolve_name(tree, expr, name)?;

        if mode == Mode::Exclude {
            selections.retain(|s| !matched.contains(&s.index));
            positions.clear();
            for (pos, s) in selections.iter().enumerate() {
                positions.insert(s.index, pos);
            }
            continue;
        }

        let build = if forced { BuildMode::Forced } else { BuildMode::Normal };

        for &index in &matched {
            if mode == Mode::WithDeps {
                for dep in tree.all_dependencies(index) {
                    push(
                        &mut selections,
                        &mut positions,
                        TargetSelection {
                            index: dep,
                            build: BuildMode::Normal,
                            match_type: MatchType::Output,
                        },
                    );
                }
            }
            push(
                &mut selections,
                &mut positions,
                TargetSelection {
                    index,
                    build,
                    match_type,
                },
            );
        }
    }

    let ranks = tree.graph().topological_ranks();
    selections.sort_by_key(|s| ranks[s.index]);

    Ok(selections)
}

/// Merge a selection in, collapsing duplicates onto the strongest annotation.
fn push(
    selections: &mut Vec<TargetSelection>,
    positions: &mut HashMap<usize, usize>,
    selection: TargetSelection,
) {
    match positions.get(&selection.index) {
        Some(&pos) => {
            let existing = &mut selections[pos];
            existing.build = existing.build.max(selection.build);
            if selection.match_type.specificity() > existing.match_type.specificity() {
                existing.match_type = selection.match_type;
            }
        }
        None => {
            positions.insert(selection.index, selections.len());
            selections.push(selection);
        }
    }
}

/// Strip prefixes off a target expression.
fn parse_expr(expr: &str) -> (Mode, bool, &str) {
    let mut mode = Mode::WithDeps;
    let mut forced = false;
    let mut rest = expr;

    loop {
        if let Some(r) = rest.strip_prefix('!') {
            forced = true;
            rest = r;
        } else if let Some(r) = rest.strip_prefix('+') {
            mode = Mode::WithDeps;
            rest = r;
        } else if let Some(r) = rest.strip_prefix('^') {
            mode = Mode::Only;
            rest = r;
        } else if let Some(r) = rest.strip_prefix('-') {
            mode = Mode::Exclude;
            rest = r;
        } else {
            break;
        }
    }

    (mode, forced, rest)
}

/// Resolve a name to step indices: outputs first, then tags, then methods.
fn resolve_name(tree: &ParseTree, expr: &str, name: &str) -> Result<(Vec<usize>, MatchType)> {
    if let Some(tag) = name.strip_prefix('%') {
        let matched = tree.steps_with_tag(tag);
        if matched.is_empty() {
            return Err(DrakeError::InvalidTarget {
                expr: expr.to_string(),
            });
        }
        return Ok((matched, MatchType::Tag));
    }

    let by_output = tree.steps_with_output(name);
    if !by_output.is_empty() {
        return Ok((by_output, MatchType::Output));
    }

    let by_tag = tree.steps_with_tag(name);
    if !by_tag.is_empty() {
        return Ok((by_tag, MatchType::Tag));
    }

    let by_method = tree.steps_with_method(name);
    if !by_method.is_empty() {
        return Ok((by_method, MatchType::Method));
    }

    Err(DrakeError::InvalidTarget {
        expr: expr.to_string(),
    })
}
