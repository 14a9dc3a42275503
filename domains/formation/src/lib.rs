//! Team formation domain: participants, teams, team requests
//!
//! The [`FormationEngine`] owns the request lifecycle and membership rules,
//! scores compatibility and ranks discovery results over any [`EntityStore`].

pub mod domain;
pub mod engine;
pub mod notifications;
pub mod repository;

// Re-export domain types at the crate root for convenience
pub use domain::commands::{
    Decision, DiscoveryFilters, NewParticipant, NewTeam, ParticipantUpdate, TeamUpdate,
};
pub use domain::config::{DiscoveryLimits, FormationConfig, SynergyTable};
pub use domain::entities::*;
pub use domain::scoring::{CompatibilityScorer, MatchScore};
pub use domain::state::{RequestEvent, RequestOutcome, RequestStateMachine, StateError};

pub use engine::{
    DiscoveryResult, FormationEngine, RequestInbox, RequestResolution, RequestSummary, SkillCount,
    StatusCounts, TeamStatistics, TeamStatus, TeamSuggestion, TeammateSuggestion,
};
pub use notifications::{
    FormationEvent, NotificationError, Notifier, RecordingNotifier, TracingNotifier,
};
pub use repository::{EntityStore, MemoryStore, PgStore, StoreTx};
