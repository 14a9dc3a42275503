//! Participant registry and team administration

use teamforge_common::{Error, Result};
use uuid::Uuid;

use super::{require_participant, require_team, FormationEngine};
use crate::domain::commands::{NewParticipant, NewTeam, ParticipantUpdate, TeamUpdate};
use crate::domain::entities::{Participant, Team, TeamWithMembers};
use crate::notifications::FormationEvent;
use crate::repository::{EntityStore, StoreTx};

impl<S: EntityStore> FormationEngine<S> {
    /// Register a new participant
    pub async fn register_participant(&self, input: NewParticipant) -> Result<Participant> {
        let participant = Participant::new(input)?;

        let mut tx = self.store.begin().await?;
        if tx
            .find_participant_by_email(&participant.email)
            .await?
            .is_some()
        {
            return Err(Error::Conflict("Email is already registered".to_string()));
        }
        if tx
            .find_participant_by_registration_number(&participant.registration_number)
            .await?
            .is_some()
        {
            return Err(Error::Conflict(
                "Registration number is already registered".to_string(),
            ));
        }
        tx.insert_participant(&participant).await?;
        tx.commit().await?;

        tracing::info!(participant_id = %participant.id, "Participant registered");
        Ok(participant)
    }

    /// Apply a profile update
    pub async fn update_participant(
        &self,
        participant_id: Uuid,
        update: ParticipantUpdate,
    ) -> Result<Participant> {
        let mut tx = self.store.begin().await?;
        let mut participant = require_participant(&mut tx, participant_id).await?;
        participant.apply_update(update)?;
        tx.update_participant(&participant).await?;
        tx.commit().await?;

        tracing::info!(participant_id = %participant_id, "Participant updated");
        Ok(participant)
    }

    /// Remove a participant and every request they sent or received
    ///
    /// A leader whose team still has other members must transfer leadership
    /// first. A leader who is the last member takes the team with them.
    pub async fn remove_participant(&self, participant_id: Uuid) -> Result<()> {
        let snapshot = self
            .store
            .get_participant(participant_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Participant {} not found", participant_id)))?;

        let mut tx = self.store.begin().await?;
        let deleted_requests = tx.delete_requests_involving(participant_id).await?;
        let (team, team_requests) = match snapshot.team_id {
            Some(team_id) => {
                tx.lock_pending_requests_for_team(team_id).await?;
                let team = require_team(&mut tx, team_id).await?;
                // Re-read under the team lock: picks up requests committed in between
                let requests = tx.lock_pending_requests_for_team(team_id).await?;
                (Some(team), requests)
            }
            None => (None, Vec::new()),
        };

        let participant = require_participant(&mut tx, participant_id).await?;
        if participant.team_id != snapshot.team_id {
            return Err(Error::Conflict(
                "Participant's team changed concurrently; retry".to_string(),
            ));
        }

        let mut events = Vec::new();
        if let Some(team) = team {
            if team.is_leader(participant_id) {
                let members = tx.members_of(team.id).await?;
                if members.len() > 1 {
                    return Err(Error::InvalidState(
                        "Team leader cannot be removed while the team has other members"
                            .to_string(),
                    ));
                }
                let now = chrono::Utc::now();
                for mut request in team_requests {
                    request.expire(now)?;
                    tx.update_request(&request).await?;
                    events.push(FormationEvent::RequestExpired {
                        request_id: request.id,
                        from_participant_id: request.from_participant_id,
                        to_participant_id: request.to_participant_id,
                    });
                }
                tx.delete_team(team.id).await?;
                events.push(FormationEvent::TeamDeleted {
                    team_id: team.id,
                    former_member_ids: vec![participant_id],
                });
            } else {
                tx.set_team_reference(participant_id, None).await?;
            }
        }

        tx.delete_participant(participant_id).await?;
        tx.commit().await?;

        tracing::info!(
            participant_id = %participant_id,
            deleted_requests,
            "Participant removed"
        );
        self.publish(events).await;
        Ok(())
    }

    /// Create a team with its leader as the first member
    pub async fn create_team(&self, input: NewTeam) -> Result<TeamWithMembers> {
        let team = Team::new(input, self.config.default_team_capacity)?;

        let mut tx = self.store.begin().await?;
        if tx.find_team_by_name(&team.name).await?.is_some() {
            return Err(Error::Conflict(format!(
                "Team name '{}' is already taken",
                team.name
            )));
        }

        let leader = require_participant(&mut tx, team.leader_id).await?;
        if !leader.is_unassigned() {
            return Err(Error::Conflict(
                "Leader is already a member of another team".to_string(),
            ));
        }

        tx.insert_team(&team).await?;
        tx.set_team_reference(leader.id, Some(team.id)).await?;
        let members = tx.members_of(team.id).await?;
        tx.commit().await?;

        tracing::info!(team_id = %team.id, leader_id = %leader.id, "Team created");
        self.publish(vec![FormationEvent::TeamFormed {
            team_id: team.id,
            leader_id: leader.id,
            member_ids: vec![leader.id],
        }])
        .await;

        Ok(TeamWithMembers { team, members })
    }

    /// Apply a typed team update (leader only)
    pub async fn update_team(
        &self,
        team_id: Uuid,
        requester: Uuid,
        update: TeamUpdate,
    ) -> Result<Team> {
        let mut tx = self.store.begin().await?;
        let mut team = require_team(&mut tx, team_id).await?;
        team.ensure_leader(requester)?;

        let size = tx.members_of(team_id).await?.len();
        team.apply_update(update, size)?;

        if let Some(existing) = tx.find_team_by_name(&team.name).await? {
            if existing.id != team_id {
                return Err(Error::Conflict(format!(
                    "Team name '{}' is already taken",
                    team.name
                )));
            }
        }

        tx.update_team(&team).await?;
        tx.commit().await?;

        tracing::info!(team_id = %team_id, "Team updated");
        Ok(team)
    }
}
