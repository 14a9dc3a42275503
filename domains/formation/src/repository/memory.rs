//! In-memory entity store
//!
//! Single-writer: a transaction holds the writer mutex from `begin` until it
//! is committed or dropped, and stages its writes on a private copy of the
//! state. Readers clone the last published snapshot and never wait on a
//! writer. Unique keys mirror the PostgreSQL schema.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use teamforge_common::RepositoryError;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use super::{EntityStore, StoreResult, StoreTx};
use crate::domain::entities::{Participant, RequestStatus, Team, TeamRequest, TeamWithMembers};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    participants: BTreeMap<Uuid, Participant>,
    teams: BTreeMap<Uuid, Team>,
    requests: BTreeMap<Uuid, TeamRequest>,
}

impl MemoryState {
    fn members_of(&self, team_id: Uuid) -> Vec<Participant> {
        sorted_participants(
            self.participants
                .values()
                .filter(|p| p.team_id == Some(team_id))
                .cloned()
                .collect(),
        )
    }

    fn requests_where<F>(&self, predicate: F) -> Vec<TeamRequest>
    where
        F: Fn(&TeamRequest) -> bool,
    {
        let mut requests: Vec<TeamRequest> = self
            .requests
            .values()
            .filter(|r| predicate(r))
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        requests
    }
}

fn sorted_participants(mut participants: Vec<Participant>) -> Vec<Participant> {
    participants.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    participants
}

/// Shared in-memory store. Clones refer to the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    writer: Arc<Mutex<()>>,
    published: Arc<RwLock<Arc<MemoryState>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn snapshot(&self) -> Arc<MemoryState> {
        self.published.read().await.clone()
    }
}

/// Unit of work over a [`MemoryStore`]
pub struct MemoryTx {
    _writer: OwnedMutexGuard<()>,
    working: MemoryState,
    published: Arc<RwLock<Arc<MemoryState>>>,
}

#[async_trait]
impl EntityStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> StoreResult<MemoryTx> {
        let writer = self.writer.clone().lock_owned().await;
        let working = self.snapshot().await.as_ref().clone();
        Ok(MemoryTx {
            _writer: writer,
            working,
            published: self.published.clone(),
        })
    }

    async fn get_participant(&self, id: Uuid) -> StoreResult<Option<Participant>> {
        Ok(self.snapshot().await.participants.get(&id).cloned())
    }

    async fn list_participants(&self) -> StoreResult<Vec<Participant>> {
        let state = self.snapshot().await;
        Ok(sorted_participants(
            state.participants.values().cloned().collect(),
        ))
    }

    async fn get_team(&self, id: Uuid) -> StoreResult<Option<Team>> {
        Ok(self.snapshot().await.teams.get(&id).cloned())
    }

    async fn list_rosters(&self) -> StoreResult<Vec<TeamWithMembers>> {
        let state = self.snapshot().await;
        let mut rosters: Vec<TeamWithMembers> = state
            .teams
            .values()
            .map(|team| TeamWithMembers {
                team: team.clone(),
                members: state.members_of(team.id),
            })
            .collect();
        rosters.sort_by(|a, b| {
            a.team
                .created_at
                .cmp(&b.team.created_at)
                .then(a.team.id.cmp(&b.team.id))
        });
        Ok(rosters)
    }

    async fn team_members(&self, team_id: Uuid) -> StoreResult<Vec<Participant>> {
        Ok(self.snapshot().await.members_of(team_id))
    }

    async fn get_request(&self, id: Uuid) -> StoreResult<Option<TeamRequest>> {
        Ok(self.snapshot().await.requests.get(&id).cloned())
    }

    async fn requests_from(&self, participant_id: Uuid) -> StoreResult<Vec<TeamRequest>> {
        Ok(self
            .snapshot()
            .await
            .requests_where(|r| r.from_participant_id == participant_id))
    }

    async fn requests_to(&self, participant_id: Uuid) -> StoreResult<Vec<TeamRequest>> {
        Ok(self
            .snapshot()
            .await
            .requests_where(|r| r.to_participant_id == participant_id))
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn lock_participant(&mut self, id: Uuid) -> StoreResult<Option<Participant>> {
        Ok(self.working.participants.get(&id).cloned())
    }

    async fn lock_team(&mut self, id: Uuid) -> StoreResult<Option<Team>> {
        Ok(self.working.teams.get(&id).cloned())
    }

    async fn lock_request(&mut self, id: Uuid) -> StoreResult<Option<TeamRequest>> {
        Ok(self.working.requests.get(&id).cloned())
    }

    async fn members_of(&mut self, team_id: Uuid) -> StoreResult<Vec<Participant>> {
        Ok(self.working.members_of(team_id))
    }

    async fn find_participant_by_email(
        &mut self,
        email: &str,
    ) -> StoreResult<Option<Participant>> {
        Ok(self
            .working
            .participants
            .values()
            .find(|p| p.email == email)
            .cloned())
    }

    async fn find_participant_by_registration_number(
        &mut self,
        registration_number: &str,
    ) -> StoreResult<Option<Participant>> {
        Ok(self
            .working
            .participants
            .values()
            .find(|p| p.registration_number == registration_number)
            .cloned())
    }

    async fn find_team_by_name(&mut self, name: &str) -> StoreResult<Option<Team>> {
        Ok(self
            .working
            .teams
            .values()
            .find(|t| t.name == name)
            .cloned())
    }

    async fn find_pending_request(
        &mut self,
        from_participant_id: Uuid,
        to_participant_id: Uuid,
    ) -> StoreResult<Option<TeamRequest>> {
        Ok(self
            .working
            .requests
            .values()
            .find(|r| {
                r.is_pending()
                    && r.from_participant_id == from_participant_id
                    && r.to_participant_id == to_participant_id
            })
            .cloned())
    }

    async fn lock_pending_requests_before(
        &mut self,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<Vec<TeamRequest>> {
        Ok(self
            .working
            .requests_where(|r| r.is_pending() && r.created_at < cutoff))
    }

    async fn lock_pending_requests_for_team(
        &mut self,
        team_id: Uuid,
    ) -> StoreResult<Vec<TeamRequest>> {
        Ok(self
            .working
            .requests_where(|r| r.is_pending() && r.team_id == Some(team_id)))
    }

    async fn insert_participant(&mut self, participant: &Participant) -> StoreResult<()> {
        let duplicate = self.working.participants.values().any(|p| {
            p.id == participant.id
                || p.email == participant.email
                || p.registration_number == participant.registration_number
        });
        if duplicate {
            return Err(RepositoryError::AlreadyExists);
        }
        self.working
            .participants
            .insert(participant.id, participant.clone());
        Ok(())
    }

    async fn update_participant(&mut self, participant: &Participant) -> StoreResult<()> {
        let stored = self
            .working
            .participants
            .get_mut(&participant.id)
            .ok_or(RepositoryError::NotFound)?;
        stored.name = participant.name.clone();
        stored.skills = participant.skills.clone();
        stored.credential_hash = participant.credential_hash.clone();
        stored.updated_at = participant.updated_at;
        Ok(())
    }

    async fn delete_participant(&mut self, id: Uuid) -> StoreResult<()> {
        self.working
            .participants
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn set_team_reference(
        &mut self,
        participant_id: Uuid,
        team_id: Option<Uuid>,
    ) -> StoreResult<()> {
        if let Some(team_id) = team_id {
            if !self.working.teams.contains_key(&team_id) {
                return Err(RepositoryError::InvalidData(format!(
                    "Team {} does not exist",
                    team_id
                )));
            }
        }
        let participant = self
            .working
            .participants
            .get_mut(&participant_id)
            .ok_or(RepositoryError::NotFound)?;
        participant.team_id = team_id;
        participant.updated_at = Utc::now();
        Ok(())
    }

    async fn insert_team(&mut self, team: &Team) -> StoreResult<()> {
        if self
            .working
            .teams
            .values()
            .any(|t| t.id == team.id || t.name == team.name)
        {
            return Err(RepositoryError::AlreadyExists);
        }
        self.working.teams.insert(team.id, team.clone());
        Ok(())
    }

    async fn update_team(&mut self, team: &Team) -> StoreResult<()> {
        if self
            .working
            .teams
            .values()
            .any(|t| t.id != team.id && t.name == team.name)
        {
            return Err(RepositoryError::AlreadyExists);
        }
        let stored = self
            .working
            .teams
            .get_mut(&team.id)
            .ok_or(RepositoryError::NotFound)?;
        *stored = team.clone();
        Ok(())
    }

    async fn delete_team(&mut self, id: Uuid) -> StoreResult<()> {
        self.working
            .teams
            .remove(&id)
            .ok_or(RepositoryError::NotFound)?;
        for participant in self.working.participants.values_mut() {
            if participant.team_id == Some(id) {
                participant.team_id = None;
            }
        }
        Ok(())
    }

    async fn insert_request(&mut self, request: &TeamRequest) -> StoreResult<()> {
        let duplicate = self.working.requests.values().any(|r| {
            r.id == request.id
                || (request.status == RequestStatus::Pending
                    && r.is_pending()
                    && r.from_participant_id == request.from_participant_id
                    && r.to_participant_id == request.to_participant_id)
        });
        if duplicate {
            return Err(RepositoryError::AlreadyExists);
        }
        self.working.requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn update_request(&mut self, request: &TeamRequest) -> StoreResult<()> {
        let stored = self
            .working
            .requests
            .get_mut(&request.id)
            .ok_or(RepositoryError::NotFound)?;
        stored.status = request.status;
        stored.responded_at = request.responded_at;
        Ok(())
    }

    async fn delete_request(&mut self, id: Uuid) -> StoreResult<()> {
        self.working
            .requests
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn delete_requests_involving(&mut self, participant_id: Uuid) -> StoreResult<u64> {
        let before = self.working.requests.len();
        self.working
            .requests
            .retain(|_, r| !r.involves(participant_id));
        Ok((before - self.working.requests.len()) as u64)
    }

    async fn commit(self) -> StoreResult<()> {
        let MemoryTx {
            _writer,
            working,
            published,
        } = self;
        *published.write().await = Arc::new(working);
        // The writer guard is released only after the new state is visible
        drop(_writer);
        Ok(())
    }
}
