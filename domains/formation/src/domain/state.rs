//! State machine for team requests
//!
//! A request starts `pending` and moves exactly once to one of the terminal
//! states. Cancellation is not a stored state: a cancelled request is deleted,
//! which is only permitted while it is still pending.

use serde::{Deserialize, Serialize};
pub use teamforge_common::StateError;

/// Persisted request status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "team_request_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Declined,
    Expired,
}

impl RequestStatus {
    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted | Self::Declined | Self::Expired)
    }

    /// Get all valid next states from current state
    pub fn valid_transitions(&self) -> &'static [RequestStatus] {
        match self {
            Self::Pending => &[Self::Accepted, Self::Declined, Self::Expired],
            Self::Accepted => &[],
            Self::Declined => &[],
            Self::Expired => &[],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::Expired => "expired",
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events that trigger request state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestEvent {
    /// Recipient accepts
    Accept,
    /// Recipient declines
    Decline,
    /// Housekeeping sweep found the request too old
    Expire,
    /// Sender withdraws the request (deletes it)
    Cancel,
}

impl std::fmt::Display for RequestEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accept => write!(f, "accept"),
            Self::Decline => write!(f, "decline"),
            Self::Expire => write!(f, "expire"),
            Self::Cancel => write!(f, "cancel"),
        }
    }
}

/// Outcome of a permitted transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The request moves to this status
    Status(RequestStatus),
    /// The request record is removed
    Deleted,
}

/// Request state machine
pub struct RequestStateMachine;

impl RequestStateMachine {
    /// Attempt a state transition
    pub fn transition(
        current: RequestStatus,
        event: RequestEvent,
    ) -> Result<RequestOutcome, StateError> {
        if current.is_terminal() {
            return Err(StateError::TerminalState(current.to_string()));
        }

        let next = match (current, event) {
            (RequestStatus::Pending, RequestEvent::Accept) => {
                RequestOutcome::Status(RequestStatus::Accepted)
            }
            (RequestStatus::Pending, RequestEvent::Decline) => {
                RequestOutcome::Status(RequestStatus::Declined)
            }
            (RequestStatus::Pending, RequestEvent::Expire) => {
                RequestOutcome::Status(RequestStatus::Expired)
            }
            (RequestStatus::Pending, RequestEvent::Cancel) => RequestOutcome::Deleted,
            _ => {
                return Err(StateError::InvalidTransition {
                    from: current.to_string(),
                    event: event.to_string(),
                });
            }
        };

        Ok(next)
    }

    /// Check if a transition is valid without performing it
    pub fn can_transition(current: RequestStatus, event: RequestEvent) -> bool {
        Self::transition(current, event).is_ok()
    }
}
