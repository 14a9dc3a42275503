//! Discovery engine
//!
//! Read-only: works from the store's last committed state without taking
//! locks. A team that filled up a moment ago may still be suggested.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;
use teamforge_common::{Error, Result};
use uuid::Uuid;

use super::FormationEngine;
use crate::domain::commands::DiscoveryFilters;
use crate::domain::entities::{Participant, TeamWithMembers};
use crate::domain::scoring::{skill_diversity, skill_overlap};
use crate::repository::EntityStore;

#[derive(Debug, Clone, Serialize)]
pub struct TeammateSuggestion {
    pub participant: Participant,
    pub compatibility_score: u32,
    pub reasons: Vec<String>,
    pub skill_diversity: usize,
    pub skill_overlap: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamSuggestion {
    pub team: TeamWithMembers,
    pub open_slots: i64,
    pub compatibility_score: u32,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryResult {
    pub potential_teammates: Vec<TeammateSuggestion>,
    pub available_teams: Vec<TeamSuggestion>,
    pub total_participants: usize,
    pub total_teams: usize,
}

/// Normalised skill filter; `None` when absent or empty
fn skill_filter(filters: &DiscoveryFilters) -> Option<BTreeSet<String>> {
    let tags: BTreeSet<String> = filters
        .skills
        .as_ref()?
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    (!tags.is_empty()).then_some(tags)
}

impl<S: EntityStore> FormationEngine<S> {
    /// Ranked teammates and teams for a participant
    pub async fn discover(
        &self,
        participant_id: Uuid,
        filters: &DiscoveryFilters,
    ) -> Result<DiscoveryResult> {
        let requester = self
            .store
            .get_participant(participant_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Participant {} not found", participant_id)))?;

        let participants = self.store.list_participants().await?;
        let rosters = self.store.list_rosters().await?;

        let total_participants = participants.len();
        let total_teams = rosters.len();

        let potential_teammates = self.rank_teammates(&requester, participants, &rosters, filters);
        let available_teams = self.rank_teams(&requester, rosters, filters);

        tracing::debug!(
            participant_id = %participant_id,
            teammates = potential_teammates.len(),
            teams = available_teams.len(),
            "Discovery completed"
        );

        Ok(DiscoveryResult {
            potential_teammates,
            available_teams,
            total_participants,
            total_teams,
        })
    }

    fn rank_teammates(
        &self,
        requester: &Participant,
        participants: Vec<Participant>,
        rosters: &[TeamWithMembers],
        filters: &DiscoveryFilters,
    ) -> Vec<TeammateSuggestion> {
        let locked_teams: HashSet<Uuid> = rosters
            .iter()
            .filter(|r| r.team.locked)
            .map(|r| r.team.id)
            .collect();
        let required = skill_filter(filters);
        let limits = &self.config.discovery;

        let mut suggestions: Vec<TeammateSuggestion> = participants
            .into_iter()
            .filter(|p| p.id != requester.id)
            .filter(|p| p.team_id.map_or(true, |t| !locked_teams.contains(&t)))
            .filter(|p| match &required {
                Some(tags) => p.skills.iter().any(|s| tags.contains(s)),
                None => true,
            })
            .filter_map(|candidate| {
                let score = self.scorer.score(requester, &candidate);
                if score.score < limits.min_score {
                    return None;
                }
                Some(TeammateSuggestion {
                    skill_diversity: skill_diversity(requester, &candidate),
                    skill_overlap: skill_overlap(requester, &candidate),
                    participant: candidate,
                    compatibility_score: score.score,
                    reasons: score.reasons,
                })
            })
            .collect();

        // Stable: ties keep store order
        suggestions.sort_by(|a, b| b.compatibility_score.cmp(&a.compatibility_score));
        suggestions.truncate(limits.max_teammates);
        suggestions
    }

    fn rank_teams(
        &self,
        requester: &Participant,
        rosters: Vec<TeamWithMembers>,
        filters: &DiscoveryFilters,
    ) -> Vec<TeamSuggestion> {
        let mut suggestions: Vec<TeamSuggestion> = rosters
            .into_iter()
            .filter(|r| r.team.open_to_requests)
            .filter(|r| !r.team.locked || filters.include_locked_teams)
            .filter(|r| filters.max_team_size.map_or(true, |max| r.size() < max))
            .filter(|r| r.open_slots() > 0)
            .map(|roster| {
                let score = self.scorer.score_against_team(requester, &roster);
                TeamSuggestion {
                    open_slots: roster.open_slots(),
                    team: roster,
                    compatibility_score: score.score,
                    reasons: score.reasons,
                }
            })
            .collect();

        suggestions.sort_by(|a, b| b.compatibility_score.cmp(&a.compatibility_score));
        suggestions.truncate(self.config.discovery.max_teams);
        suggestions
    }
}
