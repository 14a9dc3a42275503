//! Read-only queries: lookups, team status and statistics, request inbox

use std::collections::BTreeMap;

use serde::Serialize;
use teamforge_common::{Error, Result};
use uuid::Uuid;

use super::FormationEngine;
use crate::domain::entities::{Participant, RequestStatus, TeamRequest, TeamWithMembers};
use crate::repository::EntityStore;

/// Number of incoming requests listed in a summary
pub const RECENT_REQUESTS_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillCount {
    pub skill: String,
    pub participants: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TeamStatistics {
    pub total_teams: usize,
    pub full_teams: usize,
    pub empty_teams: usize,
    pub teams_with_members: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamStatus {
    pub team_id: Uuid,
    pub name: String,
    pub leader_id: Uuid,
    pub size: usize,
    pub capacity: i32,
    pub open_slots: i64,
    pub locked: bool,
    pub open_to_requests: bool,
    /// Distinct skills across the roster, sorted
    pub skill_coverage: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestInbox {
    pub incoming: Vec<TeamRequest>,
    pub outgoing: Vec<TeamRequest>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub accepted: usize,
    pub declined: usize,
    pub expired: usize,
}

impl StatusCounts {
    fn tally(requests: &[TeamRequest]) -> Self {
        let mut counts = Self::default();
        for request in requests {
            match request.status {
                RequestStatus::Pending => counts.pending += 1,
                RequestStatus::Accepted => counts.accepted += 1,
                RequestStatus::Declined => counts.declined += 1,
                RequestStatus::Expired => counts.expired += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.pending + self.accepted + self.declined + self.expired
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestSummary {
    pub incoming: StatusCounts,
    pub outgoing: StatusCounts,
    /// Pending requests still awaiting this participant's answer
    pub unread: usize,
    pub recent_incoming: Vec<TeamRequest>,
}

impl<S: EntityStore> FormationEngine<S> {
    pub async fn participant(&self, participant_id: Uuid) -> Result<Participant> {
        self.store
            .get_participant(participant_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Participant {} not found", participant_id)))
    }

    /// A team with its current roster
    pub async fn team(&self, team_id: Uuid) -> Result<TeamWithMembers> {
        let team = self
            .store
            .get_team(team_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Team {} not found", team_id)))?;
        let members = self.store.team_members(team_id).await?;
        Ok(TeamWithMembers { team, members })
    }

    pub async fn unassigned_participants(&self) -> Result<Vec<Participant>> {
        let participants = self.store.list_participants().await?;
        Ok(participants
            .into_iter()
            .filter(Participant::is_unassigned)
            .collect())
    }

    pub async fn participants_with_skill(&self, skill: &str) -> Result<Vec<Participant>> {
        let skill = skill.trim().to_lowercase();
        let participants = self.store.list_participants().await?;
        Ok(participants
            .into_iter()
            .filter(|p| p.skills.iter().any(|s| *s == skill))
            .collect())
    }

    /// How many participants list each skill, most common first (ties by name)
    pub async fn skill_distribution(&self) -> Result<Vec<SkillCount>> {
        let participants = self.store.list_participants().await?;
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for participant in &participants {
            for skill in &participant.skills {
                *counts.entry(skill.clone()).or_default() += 1;
            }
        }

        let mut distribution: Vec<SkillCount> = counts
            .into_iter()
            .map(|(skill, participants)| SkillCount {
                skill,
                participants,
            })
            .collect();
        distribution.sort_by(|a, b| b.participants.cmp(&a.participants));
        Ok(distribution)
    }

    pub async fn team_statistics(&self) -> Result<TeamStatistics> {
        let rosters = self.store.list_rosters().await?;
        let mut stats = TeamStatistics {
            total_teams: rosters.len(),
            ..Default::default()
        };
        for roster in &rosters {
            if roster.members.is_empty() {
                stats.empty_teams += 1;
            } else {
                stats.teams_with_members += 1;
            }
            if roster.team.is_full(roster.size()) {
                stats.full_teams += 1;
            }
        }
        Ok(stats)
    }

    pub async fn team_status(&self, team_id: Uuid) -> Result<TeamStatus> {
        let roster = self.team(team_id).await?;
        let skill_coverage = roster
            .skill_set()
            .into_iter()
            .map(str::to_string)
            .collect();
        Ok(TeamStatus {
            team_id: roster.team.id,
            name: roster.team.name.clone(),
            leader_id: roster.team.leader_id,
            size: roster.size(),
            capacity: roster.team.capacity,
            open_slots: roster.open_slots(),
            locked: roster.team.locked,
            open_to_requests: roster.team.open_to_requests,
            skill_coverage,
        })
    }

    /// Requests received and sent by a participant, newest first
    pub async fn requests_for(&self, participant_id: Uuid) -> Result<RequestInbox> {
        self.participant(participant_id).await?;
        let incoming = self.store.requests_to(participant_id).await?;
        let outgoing = self.store.requests_from(participant_id).await?;
        Ok(RequestInbox { incoming, outgoing })
    }

    pub async fn request_summary(&self, participant_id: Uuid) -> Result<RequestSummary> {
        let RequestInbox { incoming, outgoing } = self.requests_for(participant_id).await?;
        let incoming_counts = StatusCounts::tally(&incoming);
        let outgoing_counts = StatusCounts::tally(&outgoing);

        Ok(RequestSummary {
            unread: incoming_counts.pending,
            incoming: incoming_counts,
            outgoing: outgoing_counts,
            recent_incoming: incoming.into_iter().take(RECENT_REQUESTS_LIMIT).collect(),
        })
    }
}
