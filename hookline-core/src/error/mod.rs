use thiserror::Error;

use crate::condition::DecodeError;
use crate::graph::{CycleError, GraphError};

/// Domain error taxonomy surfaced by every hookline operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Adding an include would close a cycle in the include graph.
    #[error("invalid argument: circular include ({0})")]
    CircularReference(CycleError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("dispatch to target {target_id} failed: {reason}")]
    DispatchFailure { target_id: String, reason: String },

    #[error("unimplemented: {0}")]
    Unimplemented(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ActionError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::PreconditionFailed(message.into())
    }

    /// `CircularReference` is a specific kind of invalid argument.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_) | Self::CircularReference(_))
    }
}

impl From<DecodeError> for ActionError {
    fn from(e: DecodeError) -> Self {
        Self::InvalidArgument(e.to_string())
    }
}

impl From<ValidationError> for ActionError {
    fn from(e: ValidationError) -> Self {
        let details = e
            .violations
            .iter()
            .map(|v| format!("{}: {}", v.path, v.message))
            .collect::<Vec<_>>()
            .join("; ");
        Self::InvalidArgument(details)
    }
}

impl From<GraphError> for ActionError {
    fn from(e: GraphError) -> Self {
        match e {
            GraphError::Cycle(c) => Self::CircularReference(c),
            GraphError::TooDeep { .. } => Self::PreconditionFailed(e.to_string()),
            GraphError::InvalidId { .. } => Self::Internal(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("input failed validation ({violations_len} violations)")]
pub struct ValidationError {
    pub violations: Vec<Violation>,
    violations_len: usize,
}

impl ValidationError {
    pub fn new(violations: Vec<Violation>) -> Self {
        let violations_len = violations.len();
        Self {
            violations,
            violations_len,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}
