//! Formation event notifications
//!
//! Events are published after the transaction that caused them commits.
//! Delivery is best-effort: the engine logs a failed delivery and carries on,
//! the committed state change stands.

pub mod mock;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub use mock::RecordingNotifier;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

/// Something participants may want to hear about
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FormationEvent {
    RequestReceived {
        request_id: Uuid,
        from_participant_id: Uuid,
        to_participant_id: Uuid,
        team_id: Option<Uuid>,
    },
    RequestAccepted {
        request_id: Uuid,
        from_participant_id: Uuid,
        to_participant_id: Uuid,
        team_id: Uuid,
        team_created: bool,
    },
    RequestDeclined {
        request_id: Uuid,
        from_participant_id: Uuid,
        to_participant_id: Uuid,
    },
    RequestCancelled {
        request_id: Uuid,
        from_participant_id: Uuid,
        to_participant_id: Uuid,
    },
    RequestExpired {
        request_id: Uuid,
        from_participant_id: Uuid,
        to_participant_id: Uuid,
    },
    MemberAdded {
        team_id: Uuid,
        participant_id: Uuid,
    },
    MemberRemoved {
        team_id: Uuid,
        participant_id: Uuid,
    },
    LeadershipTransferred {
        team_id: Uuid,
        previous_leader_id: Uuid,
        new_leader_id: Uuid,
    },
    TeamFormed {
        team_id: Uuid,
        leader_id: Uuid,
        member_ids: Vec<Uuid>,
    },
    TeamLocked {
        team_id: Uuid,
    },
    TeamDeleted {
        team_id: Uuid,
        former_member_ids: Vec<Uuid>,
    },
}

impl FormationEvent {
    /// Stable event name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::RequestReceived { .. } => "request_received",
            Self::RequestAccepted { .. } => "request_accepted",
            Self::RequestDeclined { .. } => "request_declined",
            Self::RequestCancelled { .. } => "request_cancelled",
            Self::RequestExpired { .. } => "request_expired",
            Self::MemberAdded { .. } => "member_added",
            Self::MemberRemoved { .. } => "member_removed",
            Self::LeadershipTransferred { .. } => "leadership_transferred",
            Self::TeamFormed { .. } => "team_formed",
            Self::TeamLocked { .. } => "team_locked",
            Self::TeamDeleted { .. } => "team_deleted",
        }
    }

    /// Participants the event should be delivered to
    pub fn recipients(&self) -> Vec<Uuid> {
        match self {
            Self::RequestReceived {
                to_participant_id, ..
            } => vec![*to_participant_id],
            Self::RequestAccepted {
                from_participant_id,
                ..
            }
            | Self::RequestDeclined {
                from_participant_id,
                ..
            } => vec![*from_participant_id],
            Self::RequestCancelled {
                to_participant_id, ..
            } => vec![*to_participant_id],
            Self::RequestExpired {
                from_participant_id,
                to_participant_id,
                ..
            } => vec![*from_participant_id, *to_participant_id],
            Self::MemberAdded { participant_id, .. } | Self::MemberRemoved { participant_id, .. } => {
                vec![*participant_id]
            }
            Self::LeadershipTransferred {
                previous_leader_id,
                new_leader_id,
                ..
            } => vec![*previous_leader_id, *new_leader_id],
            Self::TeamFormed { member_ids, .. } => member_ids.clone(),
            Self::TeamLocked { .. } => Vec::new(),
            Self::TeamDeleted {
                former_member_ids, ..
            } => former_member_ids.clone(),
        }
    }
}

/// Outbound notification channel
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &FormationEvent) -> Result<(), NotificationError>;
}

/// Notifier that writes each event to the log
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

#[async_trait::async_trait]
impl Notifier for TracingNotifier {
    #[mutants::skip] // Only emits a log line
    async fn notify(&self, event: &FormationEvent) -> Result<(), NotificationError> {
        tracing::info!(
            event = event.name(),
            recipients = ?event.recipients(),
            "Formation event"
        );
        Ok(())
    }
}
