//! drake - timestamp-driven data-workflow engine.
//!
//! Given a workflow of named steps, each declaring input files, output
//! files and a command body, drake computes which steps are out-of-date,
//! determines an execution order honoring dependencies, and runs the
//! selected steps through pluggable execution protocols.
//!
//! # Modules
//!
//! - [`branch`] - Branch-namespaced artifact handling
//! - [`cli`] - Command-line interface and orchestration
//! - [`error`] - Error types and result alias
//! - [`fsys`] - Filesystem facade over storage backends
//! - [`materialize`] - Step materialization (variables, inheritance)
//! - [`merge`] - Branch merge coordination
//! - [`options`] - Process-wide run options
//! - [`parser`] - Workflow file parser
//! - [`predict`] - Out-of-date prediction with trigger propagation
//! - [`protocol`] - Execution protocols and their registry
//! - [`runner`] - Ordered step execution
//! - [`select`] - Target expression resolution
//! - [`staleness`] - The staleness oracle
//! - [`ui`] - Terminal output and prompts
//! - [`workflow`] - Step model and parse tree
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use drake::parser::parse_workflow;
//! use drake::protocol::ProtocolRegistry;
//!
//! let registry = ProtocolRegistry::new();
//! let tree = parse_workflow(
//!     "out.csv <- in.csv\n    sort ${INPUT} > ${OUTPUT}\n",
//!     HashMap::new(),
//!     registry.names(),
//! )
//! .unwrap();
//! assert_eq!(tree.steps().len(), 1);
//! ```

pub mod branch;
pub mod cli;
pub mod error;
pub mod fsys;
pub mod materialize;
pub mod merge;
pub mod options;
pub mod parser;
pub mod predict;
pub mod protocol;
pub mod runner;
pub mod select;
pub mod staleness;
pub mod ui;
pub mod workflow;

pub use error::{DrakeError, Result};
