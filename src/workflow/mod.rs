//! Step model and parse tree.
//!
//! Passive data produced by the parser: [`Step`]s with their input/output
//! relationships, reusable [`Method`] bodies, and the [`ParseTree`] that owns
//! both plus the implicit dependency graph. Invariants (dense indices, valid
//! method references, acyclicity) are enforced when the tree is built.

pub mod graph;

pub use graph::StepGraph;

use std::collections::HashMap;

use crate::error::{DrakeError, Result};

/// One piece of a command line: literal text or a variable reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Literal(String),
    VarRef(String),
}

/// A single command line as a sequence of fragments.
pub type CommandLine = Vec<Fragment>;

/// How a step combines its own commands with an inherited method body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MethodMode {
    /// Use the method's commands, ignoring the step's own.
    #[default]
    Use,
    /// Method commands first, then the step's.
    Append,
    /// The step's commands replace the method's.
    Replace,
}

impl MethodMode {
    /// Parse the `method-mode` option value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "use" => Some(Self::Use),
            "append" => Some(Self::Append),
            "replace" => Some(Self::Replace),
            _ => None,
        }
    }
}

/// Protocol used when neither step nor method names one.
pub const DEFAULT_PROTOCOL: &str = "shell";

/// Recognized step options.
///
/// Fields are `None` until the workflow file sets them, so merging can tell
/// an explicit choice apart from an untouched default; the effective value
/// comes from the accessor of the same name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StepOptions {
    /// Name of a method to inherit from.
    pub method: Option<String>,
    /// How to combine method and step commands.
    pub method_mode: Option<MethodMode>,
    /// Whether timestamps participate in the staleness decision.
    pub timecheck: Option<bool>,
    /// Execution protocol name.
    pub protocol: Option<String>,
}

impl StepOptions {
    /// Effective method mode, defaulting to [`MethodMode::Use`].
    pub fn method_mode(&self) -> MethodMode {
        self.method_mode.unwrap_or_default()
    }

    /// Effective timecheck flag, on by default.
    pub fn timecheck(&self) -> bool {
        self.timecheck.unwrap_or(true)
    }

    /// Effective protocol name, defaulting to [`DEFAULT_PROTOCOL`].
    pub fn protocol(&self) -> &str {
        self.protocol.as_deref().unwrap_or(DEFAULT_PROTOCOL)
    }

    /// Merge `base` options under `self`: every field the step set wins,
    /// even when the step re-selected a default value.
    pub fn merged_over(&self, base: &StepOptions) -> StepOptions {
        StepOptions {
            method: self.method.clone().or_else(|| base.method.clone()),
            method_mode: self.method_mode.or(base.method_mode),
            timecheck: self.timecheck.or(base.timecheck),
            protocol: self.protocol.clone().or_else(|| base.protocol.clone()),
        }
    }
}

/// The atomic unit of work: inputs, outputs, and a command body.
#[derive(Debug, Clone, Default)]
pub struct Step {
    /// Input file paths, in declaration order.
    pub inputs: Vec<String>,
    /// Output file paths, in declaration order.
    pub outputs: Vec<String>,
    /// Logical input labels, no filesystem presence.
    pub input_tags: Vec<String>,
    /// Logical output labels.
    pub output_tags: Vec<String>,
    /// Variable bindings captured at the step's definition point.
    pub vars: HashMap<String, String>,
    /// Command lines as fragment sequences.
    pub cmds: Vec<CommandLine>,
    /// Recognized options.
    pub opts: StepOptions,
    /// Stable per-step identifier derived from outputs and tags.
    pub dirname: String,
}

/// A reusable command body referenced by name from steps.
#[derive(Debug, Clone, Default)]
pub struct Method {
    pub vars: HashMap<String, String>,
    pub cmds: Vec<CommandLine>,
    pub opts: StepOptions,
}

/// Semantic container for a parsed workflow.
#[derive(Debug, Clone)]
pub struct ParseTree {
    steps: Vec<Step>,
    methods: HashMap<String, Method>,
    graph: StepGraph,
}

impl ParseTree {
    /// Build a tree, deriving the dependency graph from input/output and
    /// tag relationships.
    ///
    /// Fails on unknown method references and on dependency cycles.
    pub fn new(steps: Vec<Step>, methods: HashMap<String, Method>) -> Result<Self> {
        for step in &steps {
            if let Some(name) = &step.opts.method {
                if !methods.contains_key(name) {
                    return Err(DrakeError::UnknownMethod {
                        step: step.dirname.clone(),
                        name: name.clone(),
                    });
                }
            }
        }

        let mut edges = Vec::new();
        for (p, step) in steps.iter().enumerate() {
            for (q, producer) in steps.iter().enumerate() {
                if p == q {
                    continue;
                }
                let file_edge = step
                    .inputs
                    .iter()
                    .any(|i| producer.outputs.iter().any(|o| o == i));
                let tag_edge = step
                    .input_tags
                    .iter()
                    .any(|t| producer.output_tags.iter().any(|ot| ot == t));
                if file_edge || tag_edge {
                    edges.push((p, q));
                }
            }
        }

        let graph = StepGraph::new(steps.len(), &edges)?;

        Ok(Self {
            steps,
            methods,
            graph,
        })
    }

    /// All steps, index is identity.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// The step at `index`.
    pub fn step(&self, index: usize) -> &Step {
        &self.steps[index]
    }

    /// All methods by name.
    pub fn methods(&self) -> &HashMap<String, Method> {
        &self.methods
    }

    /// The dependency graph over step indices.
    pub fn graph(&self) -> &StepGraph {
        &self.graph
    }

    /// Every transitive dependency of `index`, ordered topologically.
    pub fn all_dependencies(&self, index: usize) -> Vec<usize> {
        let ancestors = self.graph.ancestors_of(index);
        let ranks = self.graph.topological_ranks();
        let mut deps: Vec<usize> = ancestors.into_iter().collect();
        deps.sort_by_key(|&i| ranks[i]);
        deps
    }

    /// Indices of steps producing the given output path.
    pub fn steps_with_output(&self, name: &str) -> Vec<usize> {
        self.steps
            .iter()
            .enumerate()
            .filter(|(_, s)| s.outputs.iter().any(|o| o == name))
            .map(|(i, _)| i)
            .collect()
    }

    /// Indices of steps carrying the given output tag.
    pub fn steps_with_tag(&self, tag: &str) -> Vec<usize> {
        self.steps
            .iter()
            .enumerate()
            .filter(|(_, s)| s.output_tags.iter().any(|t| t == tag))
            .map(|(i, _)| i)
            .collect()
    }

    /// Indices of steps inheriting from the given method.
    pub fn steps_with_method(&self, name: &str) -> Vec<usize> {
        self.steps
            .iter()
            .enumerate()
            .filter(|(_, s)| s.opts.method.as_deref() == Some(name))
            .map(|(i, _)| i)
            .collect()
    }
}

/// Derive the stable per-step directory name from outputs and output tags.
///
/// Falls back to the step index for steps with neither.
pub fn step_dirname(outputs: &[String], output_tags: &[String], index: usize) -> String {
    let mut parts: Vec<String> = output_tags.iter().map(|t| format!("%{}", t)).collect();
    parts.extend(outputs.iter().cloned());

    if parts.is_empty() {
        return format!("step-{}", index);
    }

    parts
        .join(",")
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '#' => '_',
            other => other,
        })
        .collect()
}
