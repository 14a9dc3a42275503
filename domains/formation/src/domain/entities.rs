//! Domain entities for the team formation engine
//!
//! Participants, teams and team requests, with their validation and the
//! business rules that can be checked on a single record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use teamforge_common::{Error, Result};
use validator::{Validate, ValidateEmail};

use crate::domain::commands::{NewParticipant, NewTeam, ParticipantUpdate, TeamUpdate};
use crate::domain::state::{RequestEvent, RequestOutcome, RequestStateMachine};
pub use crate::domain::state::RequestStatus;
use crate::domain::validation::{
    normalize_skills, normalize_team_tags, validate_display_name, validate_registration_number,
};

/// Capacity of a team created without an explicit one
pub const DEFAULT_TEAM_CAPACITY: i32 = 4;

/// Largest capacity a team may be configured with
pub const MAX_TEAM_CAPACITY: i32 = 10;

/// Maximum length of a request's free-text message, in characters
pub const MAX_MESSAGE_LEN: usize = 500;

/// Participant entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Participant {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub registration_number: String,
    #[serde(skip_serializing, default)]
    pub credential_hash: String,
    pub skills: Vec<String>,
    /// Maintained exclusively by the membership operations
    pub team_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Participant {
    /// Create a new participant with validation
    pub fn new(input: NewParticipant) -> Result<Self> {
        input
            .validate()
            .map_err(|e| Error::Validation(format!("Validation failed: {}", e)))?;
        validate_display_name(&input.name, "Name")?;

        if !validate_registration_number(&input.registration_number) {
            return Err(Error::Validation(
                "Registration number must be 1-20 alphanumeric characters".to_string(),
            ));
        }

        let skills = normalize_skills(input.skills)?;

        let now = Utc::now();
        Ok(Participant {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            email: input.email.trim().to_lowercase(),
            registration_number: input.registration_number.to_uppercase(),
            credential_hash: input.credential_hash,
            skills,
            team_id: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a typed profile update
    pub fn apply_update(&mut self, update: ParticipantUpdate) -> Result<()> {
        if let Some(name) = update.name {
            validate_display_name(&name, "Name")?;
            self.name = name.trim().to_string();
        }
        if let Some(skills) = update.skills {
            self.skills = normalize_skills(skills)?;
        }
        if let Some(credential_hash) = update.credential_hash {
            if credential_hash.is_empty() {
                return Err(Error::Validation(
                    "Credential cannot be empty".to_string(),
                ));
            }
            self.credential_hash = credential_hash;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Skill tags as a set
    pub fn skill_set(&self) -> BTreeSet<&str> {
        self.skills.iter().map(String::as_str).collect()
    }

    pub fn is_unassigned(&self) -> bool {
        self.team_id.is_none()
    }

    /// Validate invariants
    pub fn validate(&self) -> Result<()> {
        if !self.email.validate_email() {
            return Err(Error::Validation("Invalid email format".to_string()));
        }
        validate_display_name(&self.name, "Name")?;
        if self.skills.is_empty() {
            return Err(Error::Validation(
                "Participant must have at least one skill".to_string(),
            ));
        }
        Ok(())
    }
}

/// Team entity
///
/// The member set is not stored on the team: members are the participants
/// whose `team_id` names it. See [`TeamWithMembers`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub leader_id: Uuid,
    pub capacity: i32,
    pub tags: Vec<String>,
    /// No membership changes of any kind
    pub locked: bool,
    /// No new incoming join requests
    pub open_to_requests: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Team {
    /// Create a new team with validation
    pub fn new(input: NewTeam, default_capacity: i32) -> Result<Self> {
        input
            .validate()
            .map_err(|e| Error::Validation(format!("Validation failed: {}", e)))?;
        validate_display_name(&input.name, "Team name")?;

        let capacity = input.capacity.unwrap_or(default_capacity);
        Self::validate_capacity(capacity)?;

        let now = Utc::now();
        Ok(Team {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            description: input.description.filter(|d| !d.trim().is_empty()),
            leader_id: input.leader_id,
            capacity,
            tags: normalize_team_tags(input.tags)?,
            locked: false,
            open_to_requests: true,
            created_at: now,
            updated_at: now,
        })
    }

    /// Validate capacity range
    pub fn validate_capacity(capacity: i32) -> Result<()> {
        if !(1..=MAX_TEAM_CAPACITY).contains(&capacity) {
            return Err(Error::Validation(format!(
                "Team capacity must be between 1 and {}",
                MAX_TEAM_CAPACITY
            )));
        }
        Ok(())
    }

    /// Apply a typed update. `current_size` guards against shrinking below the roster.
    pub fn apply_update(&mut self, update: TeamUpdate, current_size: usize) -> Result<()> {
        if let Some(name) = update.name {
            validate_display_name(&name, "Team name")?;
            self.name = name.trim().to_string();
        }
        if let Some(description) = update.description {
            if description.len() > 1000 {
                return Err(Error::Validation(
                    "Description must be at most 1000 characters".to_string(),
                ));
            }
            self.description = Some(description).filter(|d| !d.trim().is_empty());
        }
        if let Some(capacity) = update.capacity {
            Self::validate_capacity(capacity)?;
            if (capacity as usize) < current_size {
                return Err(Error::InvalidState(format!(
                    "Capacity {} is below the current team size {}",
                    capacity, current_size
                )));
            }
            self.capacity = capacity;
        }
        if let Some(tags) = update.tags {
            self.tags = normalize_team_tags(tags)?;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn is_leader(&self, participant_id: Uuid) -> bool {
        self.leader_id == participant_id
    }

    /// Fail with `Forbidden` unless `requester` leads this team
    pub fn ensure_leader(&self, requester: Uuid) -> Result<()> {
        if !self.is_leader(requester) {
            return Err(Error::Forbidden(
                "Only the team leader can perform this action".to_string(),
            ));
        }
        Ok(())
    }

    /// Fail with `InvalidState` when the team is locked or closed to requests
    pub fn ensure_accepts_requests(&self) -> Result<()> {
        if self.locked {
            return Err(Error::InvalidState(
                "Team is locked and not accepting new members".to_string(),
            ));
        }
        if !self.open_to_requests {
            return Err(Error::InvalidState(
                "Team is not accepting new requests".to_string(),
            ));
        }
        Ok(())
    }

    /// Remaining seats given the current roster size (negative when over capacity)
    pub fn open_slots(&self, current_size: usize) -> i64 {
        i64::from(self.capacity) - current_size as i64
    }

    pub fn is_full(&self, current_size: usize) -> bool {
        self.open_slots(current_size) <= 0
    }
}

/// Team joined with its current roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamWithMembers {
    pub team: Team,
    pub members: Vec<Participant>,
}

impl TeamWithMembers {
    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn open_slots(&self) -> i64 {
        self.team.open_slots(self.size())
    }

    /// Union of all members' skills
    pub fn skill_set(&self) -> BTreeSet<&str> {
        self.members
            .iter()
            .flat_map(|m| m.skills.iter().map(String::as_str))
            .collect()
    }

    /// Validate the membership invariants for this snapshot
    pub fn validate(&self) -> Result<()> {
        if self.size() > self.team.capacity as usize {
            return Err(Error::Internal(format!(
                "Team {} has {} members but capacity {}",
                self.team.id,
                self.size(),
                self.team.capacity
            )));
        }
        if let Some(stray) = self.members.iter().find(|m| m.team_id != Some(self.team.id)) {
            return Err(Error::Internal(format!(
                "Participant {} listed on team {} without a matching reference",
                stray.id, self.team.id
            )));
        }
        if !self.members.is_empty() && !self.members.iter().any(|m| m.id == self.team.leader_id)
        {
            return Err(Error::Internal(format!(
                "Leader of team {} is not a member",
                self.team.id
            )));
        }
        Ok(())
    }
}

/// Team request entity - a proposal from one participant to another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TeamRequest {
    pub id: Uuid,
    pub from_participant_id: Uuid,
    pub to_participant_id: Uuid,
    /// Absent when the request proposes forming a brand-new team
    pub team_id: Option<Uuid>,
    pub message: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl TeamRequest {
    /// Create a new pending request with validation
    pub fn new(
        from_participant_id: Uuid,
        to_participant_id: Uuid,
        team_id: Option<Uuid>,
        message: Option<String>,
    ) -> Result<Self> {
        if from_participant_id == to_participant_id {
            return Err(Error::Validation(
                "Cannot send a team request to yourself".to_string(),
            ));
        }

        let message = message.filter(|m| !m.trim().is_empty());
        if let Some(ref m) = message {
            if m.chars().count() > MAX_MESSAGE_LEN {
                return Err(Error::Validation(format!(
                    "Message must be at most {} characters",
                    MAX_MESSAGE_LEN
                )));
            }
        }

        Ok(TeamRequest {
            id: Uuid::new_v4(),
            from_participant_id,
            to_participant_id,
            team_id,
            message,
            status: RequestStatus::Pending,
            created_at: Utc::now(),
            responded_at: None,
        })
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }

    pub fn involves(&self, participant_id: Uuid) -> bool {
        self.from_participant_id == participant_id || self.to_participant_id == participant_id
    }

    /// Accept the request
    pub fn accept(&mut self, at: DateTime<Utc>) -> Result<()> {
        self.apply_transition(RequestEvent::Accept, at)
    }

    /// Decline the request
    pub fn decline(&mut self, at: DateTime<Utc>) -> Result<()> {
        self.apply_transition(RequestEvent::Decline, at)
    }

    /// Expire the request (housekeeping)
    pub fn expire(&mut self, at: DateTime<Utc>) -> Result<()> {
        self.apply_transition(RequestEvent::Expire, at)
    }

    /// Check that the request may still be withdrawn
    pub fn ensure_cancellable(&self) -> Result<()> {
        RequestStateMachine::transition(self.status, RequestEvent::Cancel)
            .map(|_| ())
            .map_err(|_| {
                Error::InvalidState(format!(
                    "Cannot cancel a request that is already {}",
                    self.status
                ))
            })
    }

    fn apply_transition(&mut self, event: RequestEvent, at: DateTime<Utc>) -> Result<()> {
        match RequestStateMachine::transition(self.status, event) {
            Ok(RequestOutcome::Status(next)) => {
                self.status = next;
                self.responded_at = Some(at);
                Ok(())
            }
            Ok(RequestOutcome::Deleted) => Err(Error::Internal(format!(
                "Event '{}' does not produce a stored status",
                event
            ))),
            Err(_) => Err(Error::InvalidState(format!(
                "Request already {}; cannot {}",
                self.status, event
            ))),
        }
    }

    /// Validate invariants
    pub fn validate(&self) -> Result<()> {
        if self.from_participant_id == self.to_participant_id {
            return Err(Error::Validation(
                "Request sender and recipient must differ".to_string(),
            ));
        }
        // responded_at is set exactly when the request left `pending`
        if self.status.is_terminal() != self.responded_at.is_some() {
            return Err(Error::Validation(
                "Response timestamp must be set exactly for terminal requests".to_string(),
            ));
        }
        if let Some(responded_at) = self.responded_at {
            if responded_at < self.created_at {
                return Err(Error::Validation(
                    "Response cannot precede creation".to_string(),
                ));
            }
        }
        Ok(())
    }
}
