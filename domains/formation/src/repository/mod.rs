//! Entity store seam for the formation engine
//!
//! The engine never holds a database handle of its own. It is given an
//! [`EntityStore`] and runs every read-decide-write sequence inside one
//! [`StoreTx`]: locking reads first, then writes, then `commit`. Dropping a
//! transaction without committing discards its writes.
//!
//! Lock order for implementations with row locks: requests, then teams, then
//! participants (participants in ascending id order).

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use teamforge_common::RepositoryError;
use uuid::Uuid;

use crate::domain::entities::{Participant, Team, TeamRequest, TeamWithMembers};

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = std::result::Result<T, RepositoryError>;

/// Durable storage for participants, teams and team requests
///
/// The non-transactional reads serve discovery and reporting. They see the
/// last committed state and may lag a concurrent writer.
#[async_trait]
pub trait EntityStore: Send + Sync {
    type Tx: StoreTx;

    /// Begin a unit of work
    async fn begin(&self) -> StoreResult<Self::Tx>;

    async fn get_participant(&self, id: Uuid) -> StoreResult<Option<Participant>>;

    /// All participants, oldest first (ties by id)
    async fn list_participants(&self) -> StoreResult<Vec<Participant>>;

    async fn get_team(&self, id: Uuid) -> StoreResult<Option<Team>>;

    /// All teams with their rosters, oldest first (ties by id)
    async fn list_rosters(&self) -> StoreResult<Vec<TeamWithMembers>>;

    async fn team_members(&self, team_id: Uuid) -> StoreResult<Vec<Participant>>;

    async fn get_request(&self, id: Uuid) -> StoreResult<Option<TeamRequest>>;

    /// Requests sent by a participant, newest first
    async fn requests_from(&self, participant_id: Uuid) -> StoreResult<Vec<TeamRequest>>;

    /// Requests received by a participant, newest first
    async fn requests_to(&self, participant_id: Uuid) -> StoreResult<Vec<TeamRequest>>;
}

/// A serialized unit of work against the store
#[async_trait]
pub trait StoreTx: Send + Sized {
    /// Read a participant and hold it until commit
    async fn lock_participant(&mut self, id: Uuid) -> StoreResult<Option<Participant>>;

    /// Read a team and hold it until commit
    async fn lock_team(&mut self, id: Uuid) -> StoreResult<Option<Team>>;

    /// Read a request and hold it until commit
    async fn lock_request(&mut self, id: Uuid) -> StoreResult<Option<TeamRequest>>;

    /// Current roster. Consistent once the team itself is locked.
    async fn members_of(&mut self, team_id: Uuid) -> StoreResult<Vec<Participant>>;

    async fn find_participant_by_email(&mut self, email: &str)
        -> StoreResult<Option<Participant>>;

    async fn find_participant_by_registration_number(
        &mut self,
        registration_number: &str,
    ) -> StoreResult<Option<Participant>>;

    async fn find_team_by_name(&mut self, name: &str) -> StoreResult<Option<Team>>;

    async fn find_pending_request(
        &mut self,
        from_participant_id: Uuid,
        to_participant_id: Uuid,
    ) -> StoreResult<Option<TeamRequest>>;

    /// Pending requests created before `cutoff`, locked
    async fn lock_pending_requests_before(
        &mut self,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<Vec<TeamRequest>>;

    /// Pending requests targeting a team, locked
    async fn lock_pending_requests_for_team(
        &mut self,
        team_id: Uuid,
    ) -> StoreResult<Vec<TeamRequest>>;

    async fn insert_participant(&mut self, participant: &Participant) -> StoreResult<()>;

    /// Persist profile fields (name, skills, credential). The team reference is untouched.
    async fn update_participant(&mut self, participant: &Participant) -> StoreResult<()>;

    async fn delete_participant(&mut self, id: Uuid) -> StoreResult<()>;

    /// Set or clear a participant's team reference
    async fn set_team_reference(
        &mut self,
        participant_id: Uuid,
        team_id: Option<Uuid>,
    ) -> StoreResult<()>;

    async fn insert_team(&mut self, team: &Team) -> StoreResult<()>;

    async fn update_team(&mut self, team: &Team) -> StoreResult<()>;

    /// Remove a team record, clearing any team reference that still names it
    async fn delete_team(&mut self, id: Uuid) -> StoreResult<()>;

    async fn insert_request(&mut self, request: &TeamRequest) -> StoreResult<()>;

    /// Persist status and response timestamp
    async fn update_request(&mut self, request: &TeamRequest) -> StoreResult<()>;

    async fn delete_request(&mut self, id: Uuid) -> StoreResult<()>;

    /// Delete every request sent or received by a participant
    async fn delete_requests_involving(&mut self, participant_id: Uuid) -> StoreResult<u64>;

    /// Publish all writes
    async fn commit(self) -> StoreResult<()>;
}
