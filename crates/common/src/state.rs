//! Common state machine error types
//!
//! Shared by every state machine in the workspace.

use thiserror::Error;

use crate::error::Error;

/// Errors that can occur during state transitions
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StateError {
    #[error("Invalid transition: cannot transition from {from} via {event}")]
    InvalidTransition { from: String, event: String },

    #[error("Guard condition failed: {0}")]
    GuardFailed(String),

    #[error("Terminal state: {0} is a terminal state and cannot transition")]
    TerminalState(String),
}

impl From<StateError> for Error {
    fn from(err: StateError) -> Self {
        Error::InvalidState(err.to_string())
    }
}
