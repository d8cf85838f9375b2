//! Error types for drake operations.
//!
//! This module defines [`DrakeError`], the primary error type used throughout
//! the engine, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Use `DrakeError` for domain-specific errors that need distinct handling
//! - Use `anyhow::Error` (via `DrakeError::Other`) for unexpected errors
//! - All errors should provide actionable messages for users
//!
//! Errors are never swallowed inside the engine; they propagate by `Result`
//! to the CLI boundary, which converts them to stderr plus an exit code.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for drake operations.
#[derive(Debug, Error)]
pub enum DrakeError {
    /// Workflow file not found at the resolved location.
    #[error("Workflow file not found: {path}")]
    WorkflowNotFound { path: PathBuf },

    /// Workflow file failed to parse.
    #[error("Syntax error at line {line_no}: {msg}\n  {text}")]
    Syntax {
        line_no: usize,
        text: String,
        msg: String,
    },

    /// No data exists at one or more step inputs.
    #[error("Missing input(s): {}", paths.join(", "))]
    MissingInput { paths: Vec<String> },

    /// Variable substitution failed during materialization.
    #[error("Undefined variable: {name}")]
    UndefinedVariable { name: String },

    /// The step's protocol requires commands but none survived materialization.
    #[error("Step '{step}' has no commands")]
    EmptyCommands { step: String },

    /// `?`-prefixed inputs are not supported.
    #[error("Step '{step}' uses an optional input, which is not supported")]
    UnsupportedOptionalInput { step: String },

    /// A target expression resolved to nothing.
    #[error("Invalid target: {expr}")]
    InvalidTarget { expr: String },

    /// CLI argument could not be interpreted.
    #[error("Invalid argument: {arg}")]
    InvalidArgument { arg: String },

    /// Referenced method does not exist.
    #[error("Step '{step}' references unknown method '{name}'")]
    UnknownMethod { step: String, name: String },

    /// Referenced protocol is not registered.
    #[error("Unknown protocol: {name}")]
    UnknownProtocol { name: String },

    /// Step dependency cycle detected.
    #[error("Circular dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    /// A protocol reported fatal step failure.
    #[error("Step '{step}' failed: {detail}")]
    ProtocolFailure {
        step: String,
        detail: String,
        exit: Option<i32>,
    },

    /// User declined the confirmation prompt.
    #[error("Aborted.")]
    Aborted,

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DrakeError {
    /// Exit code this error should terminate the process with.
    ///
    /// Protocol failures surface the child's own exit code when it had one;
    /// CLI usage errors use 255; everything else is 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            DrakeError::InvalidArgument { .. } => 255,
            DrakeError::ProtocolFailure { exit: Some(n), .. } => *n,
            _ => 1,
        }
    }
}

/// Result type alias for drake operations.
pub type Result<T> = std::result::Result<T, DrakeError>;
