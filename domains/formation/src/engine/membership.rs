//! Membership manager
//!
//! The only code that writes a participant's team reference. Every check on
//! size, flags and references happens after the team row is locked, so the
//! decision and the write share one consistent view.

use chrono::Utc;
use teamforge_common::{Error, Result};
use uuid::Uuid;

use super::{require_participant, require_team, FormationEngine};
use crate::domain::entities::{Team, TeamWithMembers};
use crate::notifications::FormationEvent;
use crate::repository::{EntityStore, StoreTx};

/// Add a participant to a team inside an open transaction
///
/// Fails with `Conflict` when the participant already has a team, the team is
/// locked, or the team is at capacity.
pub(crate) async fn attach_member<T: StoreTx>(
    tx: &mut T,
    team_id: Uuid,
    participant_id: Uuid,
) -> Result<Team> {
    let team = require_team(tx, team_id).await?;
    let participant = require_participant(tx, participant_id).await?;

    if let Some(current) = participant.team_id {
        return Err(Error::Conflict(if current == team_id {
            "Participant is already a member of this team".to_string()
        } else {
            "Participant is already a member of another team".to_string()
        }));
    }
    if team.locked {
        return Err(Error::Conflict("Team is locked".to_string()));
    }

    let size = tx.members_of(team_id).await?.len();
    if team.is_full(size) {
        return Err(Error::Conflict(format!(
            "Team is at capacity ({} members)",
            team.capacity
        )));
    }

    tx.set_team_reference(participant_id, Some(team_id)).await?;
    Ok(team)
}

impl<S: EntityStore> FormationEngine<S> {
    /// Add a participant to a team
    pub async fn add_member(&self, team_id: Uuid, participant_id: Uuid) -> Result<TeamWithMembers> {
        let mut tx = self.store.begin().await?;
        let team = attach_member(&mut tx, team_id, participant_id).await?;
        let members = tx.members_of(team_id).await?;
        tx.commit().await?;

        tracing::info!(
            team_id = %team_id,
            participant_id = %participant_id,
            size = members.len(),
            "Member added"
        );
        self.publish(vec![FormationEvent::MemberAdded {
            team_id,
            participant_id,
        }])
        .await;

        Ok(TeamWithMembers { team, members })
    }

    /// Remove a non-leader member from a team
    pub async fn remove_member(
        &self,
        team_id: Uuid,
        participant_id: Uuid,
    ) -> Result<TeamWithMembers> {
        let mut tx = self.store.begin().await?;
        let team = require_team(&mut tx, team_id).await?;

        if team.locked {
            return Err(Error::InvalidState(
                "Team is locked; membership cannot change".to_string(),
            ));
        }
        if team.is_leader(participant_id) {
            return Err(Error::InvalidState(
                "Team leader cannot leave; transfer leadership first".to_string(),
            ));
        }

        let participant = require_participant(&mut tx, participant_id).await?;
        if participant.team_id != Some(team_id) {
            return Err(Error::InvalidState(
                "Participant is not a member of this team".to_string(),
            ));
        }

        tx.set_team_reference(participant_id, None).await?;
        let members = tx.members_of(team_id).await?;
        tx.commit().await?;

        tracing::info!(
            team_id = %team_id,
            participant_id = %participant_id,
            size = members.len(),
            "Member removed"
        );
        self.publish(vec![FormationEvent::MemberRemoved {
            team_id,
            participant_id,
        }])
        .await;

        Ok(TeamWithMembers { team, members })
    }

    /// Hand leadership to another current member
    pub async fn transfer_leadership(&self, team_id: Uuid, new_leader_id: Uuid) -> Result<Team> {
        let mut tx = self.store.begin().await?;
        let mut team = require_team(&mut tx, team_id).await?;

        let members = tx.members_of(team_id).await?;
        if !members.iter().any(|m| m.id == new_leader_id) {
            return Err(Error::InvalidState(
                "New leader must be a current member of the team".to_string(),
            ));
        }
        if team.is_leader(new_leader_id) {
            return Ok(team);
        }

        let previous_leader_id = team.leader_id;
        team.leader_id = new_leader_id;
        team.updated_at = Utc::now();
        tx.update_team(&team).await?;
        tx.commit().await?;

        tracing::info!(
            team_id = %team_id,
            previous_leader_id = %previous_leader_id,
            new_leader_id = %new_leader_id,
            "Leadership transferred"
        );
        self.publish(vec![FormationEvent::LeadershipTransferred {
            team_id,
            previous_leader_id,
            new_leader_id,
        }])
        .await;

        Ok(team)
    }

    /// Set the `locked` flag (leader only)
    pub async fn lock_team(&self, team_id: Uuid, requester: Uuid, locked: bool) -> Result<Team> {
        let mut tx = self.store.begin().await?;
        let mut team = require_team(&mut tx, team_id).await?;
        team.ensure_leader(requester)?;

        let changed = team.locked != locked;
        if changed {
            team.locked = locked;
            team.updated_at = Utc::now();
            tx.update_team(&team).await?;
        }
        tx.commit().await?;

        tracing::info!(team_id = %team_id, locked, "Team lock flag set");
        if changed && locked {
            self.publish(vec![FormationEvent::TeamLocked { team_id }]).await;
        }
        Ok(team)
    }

    /// Set the `open_to_requests` flag (leader only)
    pub async fn set_open_to_requests(
        &self,
        team_id: Uuid,
        requester: Uuid,
        open: bool,
    ) -> Result<Team> {
        let mut tx = self.store.begin().await?;
        let mut team = require_team(&mut tx, team_id).await?;
        team.ensure_leader(requester)?;

        if team.open_to_requests != open {
            team.open_to_requests = open;
            team.updated_at = Utc::now();
            tx.update_team(&team).await?;
        }
        tx.commit().await?;

        tracing::info!(team_id = %team_id, open_to_requests = open, "Team request flag set");
        Ok(team)
    }

    /// Delete a team, detaching its members and expiring requests that target it
    pub async fn delete_team(&self, team_id: Uuid) -> Result<()> {
        let mut tx = self.store.begin().await?;
        tx.lock_pending_requests_for_team(team_id).await?;
        require_team(&mut tx, team_id).await?;
        // Re-read under the team lock: picks up requests committed in between
        let pending = tx.lock_pending_requests_for_team(team_id).await?;

        let former_member_ids: Vec<Uuid> = tx
            .members_of(team_id)
            .await?
            .into_iter()
            .map(|m| m.id)
            .collect();

        let now = Utc::now();
        let mut events = Vec::with_capacity(pending.len() + 1);
        for mut request in pending {
            request.expire(now)?;
            tx.update_request(&request).await?;
            events.push(FormationEvent::RequestExpired {
                request_id: request.id,
                from_participant_id: request.from_participant_id,
                to_participant_id: request.to_participant_id,
            });
        }

        tx.delete_team(team_id).await?;
        tx.commit().await?;

        tracing::info!(
            team_id = %team_id,
            detached = former_member_ids.len(),
            expired_requests = events.len(),
            "Team deleted"
        );
        events.push(FormationEvent::TeamDeleted {
            team_id,
            former_member_ids,
        });
        self.publish(events).await;
        Ok(())
    }
}
