//! Typed inputs for engine operations
//!
//! Each mutable entity has an explicit update struct listing the fields that
//! may change; everything else is fixed at creation.

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Registration input for a new participant
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewParticipant {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(email)]
    pub email: String,

    /// University registration number (immutable identity field)
    #[validate(length(min = 1, max = 20))]
    pub registration_number: String,

    /// Opaque credential hash produced by the auth collaborator
    #[validate(length(min = 1))]
    pub credential_hash: String,

    #[validate(length(min = 1))]
    pub skills: Vec<String>,
}

/// Mutable participant fields
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParticipantUpdate {
    pub name: Option<String>,
    pub skills: Option<Vec<String>>,
    pub credential_hash: Option<String>,
}

/// Explicit team creation input
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewTeam {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(length(max = 1000))]
    pub description: Option<String>,

    pub leader_id: Uuid,

    /// Falls back to the engine's configured default capacity
    pub capacity: Option<i32>,

    #[serde(default)]
    pub tags: Vec<String>,
}

/// Mutable team fields. Flags have their own leader-only operations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeamUpdate {
    pub name: Option<String>,
    /// `Some("")` clears the description
    pub description: Option<String>,
    pub capacity: Option<i32>,
    pub tags: Option<Vec<String>>,
}

/// Recipient's answer to a pending request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accept,
    Decline,
}

/// Filters narrowing a discovery query
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscoveryFilters {
    /// Candidates must share at least one of these skills
    pub skills: Option<Vec<String>>,
    /// Teams at or above this size are skipped
    pub max_team_size: Option<usize>,
    #[serde(default)]
    pub include_locked_teams: bool,
}
