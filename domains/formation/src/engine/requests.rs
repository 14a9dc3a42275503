//! Request lifecycle controller

use chrono::{Duration, Utc};
use serde::Serialize;
use teamforge_common::{Error, Result};
use uuid::Uuid;

use super::membership::attach_member;
use super::{require_participant_pair, require_team, FormationEngine};
use crate::domain::commands::{Decision, NewTeam};
use crate::domain::entities::{Participant, Team, TeamRequest, TeamWithMembers};
use crate::notifications::FormationEvent;
use crate::repository::{EntityStore, StoreTx};

/// Longest slice of each participant name used in a generated team name
const NAME_PART_MAX_CHARS: usize = 40;

/// Outcome of answering a request
#[derive(Debug, Clone, Serialize)]
pub struct RequestResolution {
    pub request: TeamRequest,
    /// The team the sender ended up in (accepted requests only)
    pub team: Option<TeamWithMembers>,
    /// Whether acceptance formed a brand-new team
    pub team_created: bool,
}

fn name_part(name: &str) -> String {
    name.chars().take(NAME_PART_MAX_CHARS).collect()
}

/// Candidate names for a team formed by two participants
pub(crate) fn formed_team_name(from: &Participant, to: &Participant, attempt: usize) -> String {
    let base = format!("Team {} & {}", name_part(&from.name), name_part(&to.name));
    if attempt <= 1 {
        base
    } else {
        format!("{} ({})", base, attempt)
    }
}

impl<S: EntityStore> FormationEngine<S> {
    /// Send a request from one participant to another, optionally for a team
    pub async fn create_request(
        &self,
        from_participant_id: Uuid,
        to_participant_id: Uuid,
        team_id: Option<Uuid>,
        message: Option<String>,
    ) -> Result<TeamRequest> {
        let request = TeamRequest::new(from_participant_id, to_participant_id, team_id, message)?;

        // Team row first for lock order; its flags are checked last
        let mut tx = self.store.begin().await?;
        let team = match team_id {
            Some(team_id) => Some(require_team(&mut tx, team_id).await?),
            None => None,
        };
        require_participant_pair(&mut tx, from_participant_id, to_participant_id).await?;

        if tx
            .find_pending_request(from_participant_id, to_participant_id)
            .await?
            .is_some()
        {
            return Err(Error::Conflict(
                "A pending request to this participant already exists".to_string(),
            ));
        }
        if let Some(team) = &team {
            team.ensure_accepts_requests()?;
        }

        tx.insert_request(&request).await?;
        tx.commit().await?;

        tracing::info!(
            request_id = %request.id,
            from_participant_id = %from_participant_id,
            to_participant_id = %to_participant_id,
            team_id = ?team_id,
            "Team request created"
        );
        self.publish(vec![FormationEvent::RequestReceived {
            request_id: request.id,
            from_participant_id,
            to_participant_id,
            team_id,
        }])
        .await;

        Ok(request)
    }

    /// Accept or decline a pending request (recipient only)
    ///
    /// Acceptance and its team resolution commit together. If the sender
    /// cannot be placed the request stays pending.
    pub async fn respond(
        &self,
        request_id: Uuid,
        responder: Uuid,
        decision: Decision,
    ) -> Result<RequestResolution> {
        let mut tx = self.store.begin().await?;
        let mut request = tx
            .lock_request(request_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Request {} not found", request_id)))?;

        if request.to_participant_id != responder {
            return Err(Error::Forbidden(
                "Only the recipient can respond to this request".to_string(),
            ));
        }

        let now = Utc::now();
        match decision {
            Decision::Decline => {
                request.decline(now)?;
                tx.update_request(&request).await?;
                tx.commit().await?;

                tracing::info!(request_id = %request_id, "Team request declined");
                self.publish(vec![FormationEvent::RequestDeclined {
                    request_id,
                    from_participant_id: request.from_participant_id,
                    to_participant_id: request.to_participant_id,
                }])
                .await;

                Ok(RequestResolution {
                    request,
                    team: None,
                    team_created: false,
                })
            }
            Decision::Accept => {
                request.accept(now)?;

                let (team, team_created) = match request.team_id {
                    Some(team_id) => {
                        let team =
                            attach_member(&mut tx, team_id, request.from_participant_id).await?;
                        (team, false)
                    }
                    None => {
                        let team = self
                            .form_team(
                                &mut tx,
                                request.from_participant_id,
                                request.to_participant_id,
                            )
                            .await?;
                        (team, true)
                    }
                };

                tx.update_request(&request).await?;
                let members = tx.members_of(team.id).await?;
                tx.commit().await?;

                tracing::info!(
                    request_id = %request_id,
                    team_id = %team.id,
                    team_created,
                    size = members.len(),
                    "Team request accepted"
                );

                let mut events = vec![FormationEvent::RequestAccepted {
                    request_id,
                    from_participant_id: request.from_participant_id,
                    to_participant_id: request.to_participant_id,
                    team_id: team.id,
                    team_created,
                }];
                if team_created {
                    events.push(FormationEvent::TeamFormed {
                        team_id: team.id,
                        leader_id: team.leader_id,
                        member_ids: members.iter().map(|m| m.id).collect(),
                    });
                }
                self.publish(events).await;

                Ok(RequestResolution {
                    request,
                    team: Some(TeamWithMembers { team, members }),
                    team_created,
                })
            }
        }
    }

    /// Create a team led by `from` with `to` as the second member
    async fn form_team(
        &self,
        tx: &mut S::Tx,
        from_participant_id: Uuid,
        to_participant_id: Uuid,
    ) -> Result<Team> {
        let (from, to) =
            require_participant_pair(tx, from_participant_id, to_participant_id).await?;
        if !from.is_unassigned() || !to.is_unassigned() {
            return Err(Error::Conflict(
                "Both participants must be without a team to form a new one".to_string(),
            ));
        }

        let mut attempt = 1;
        let name = loop {
            let candidate = formed_team_name(&from, &to, attempt);
            if tx.find_team_by_name(&candidate).await?.is_none() {
                break candidate;
            }
            attempt += 1;
        };

        let team = Team::new(
            NewTeam {
                name,
                description: Some(format!("Team formed by {} and {}", from.name, to.name)),
                leader_id: from.id,
                capacity: None,
                tags: Vec::new(),
            },
            self.config.default_team_capacity,
        )?;
        if team.is_full(1) {
            return Err(Error::Conflict(format!(
                "Default team capacity {} cannot hold both participants",
                team.capacity
            )));
        }

        tx.insert_team(&team).await?;
        tx.set_team_reference(from.id, Some(team.id)).await?;
        tx.set_team_reference(to.id, Some(team.id)).await?;
        Ok(team)
    }

    /// Withdraw a pending request (sender only). The request is deleted.
    pub async fn cancel_request(&self, request_id: Uuid, canceller: Uuid) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let request = tx
            .lock_request(request_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Request {} not found", request_id)))?;

        if request.from_participant_id != canceller {
            return Err(Error::Forbidden(
                "Only the sender can cancel this request".to_string(),
            ));
        }
        request.ensure_cancellable()?;

        tx.delete_request(request_id).await?;
        tx.commit().await?;

        tracing::info!(request_id = %request_id, "Team request cancelled");
        self.publish(vec![FormationEvent::RequestCancelled {
            request_id,
            from_participant_id: request.from_participant_id,
            to_participant_id: request.to_participant_id,
        }])
        .await;
        Ok(())
    }

    /// Expire every pending request created more than `max_age` ago
    pub async fn expire_stale(&self, max_age: Duration) -> Result<u64> {
        let now = Utc::now();
        let cutoff = now - max_age;

        let mut tx = self.store.begin().await?;
        let stale = tx.lock_pending_requests_before(cutoff).await?;

        let mut events = Vec::with_capacity(stale.len());
        for mut request in stale {
            request.expire(now)?;
            tx.update_request(&request).await?;
            events.push(FormationEvent::RequestExpired {
                request_id: request.id,
                from_participant_id: request.from_participant_id,
                to_participant_id: request.to_participant_id,
            });
        }
        tx.commit().await?;

        let expired = events.len() as u64;
        tracing::info!(expired, cutoff = %cutoff, "Expired stale team requests");
        self.publish(events).await;
        Ok(expired)
    }
}
