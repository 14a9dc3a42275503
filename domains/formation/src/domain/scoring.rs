//! Compatibility scorer
//!
//! Pure, deterministic ranking over skill sets. Every bonus appends a reason
//! in evaluation order, and callers rely on that order.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::domain::config::SynergyTable;
use crate::domain::entities::{Participant, TeamWithMembers};

/// Score given when either side has no recorded skills
pub const BASELINE_SCORE: u32 = 5;
/// Score given to an empty team
pub const NEW_TEAM_SCORE: u32 = 5;

const DIVERSITY_WEIGHT: u32 = 2;
const DIVERSITY_CAP: u32 = 10;
const OVERLAP_CAP: u32 = 5;
const WIDE_COVERAGE_THRESHOLD: usize = 8;
const WIDE_COVERAGE_BONUS: u32 = 3;
const GOOD_COVERAGE_THRESHOLD: usize = 5;
const GOOD_COVERAGE_BONUS: u32 = 2;
const PROBLEM_SOLVING_SYNERGY_BONUS: u32 = 4;
const LEADERSHIP_SYNERGY_BONUS: u32 = 3;
const GAP_THRESHOLD: usize = 10;
const GAP_BONUS: u32 = 3;
const SMALL_TEAM_BONUS: u32 = 4;
const MEDIUM_TEAM_BONUS: u32 = 3;
const COMPLETES_TEAM_BONUS: u32 = 2;

pub const REASON_NO_SKILL_DATA: &str = "Skills information not available";
pub const REASON_WIDE_COVERAGE: &str = "Wide skill coverage";
pub const REASON_GOOD_COVERAGE: &str = "Good skill coverage";
pub const REASON_PROBLEM_SOLVING_SYNERGY: &str = "Problem-solving + Technical skills synergy";
pub const REASON_LEADERSHIP_SYNERGY: &str = "Leadership + Collaboration synergy";
pub const REASON_NEW_TEAM: &str = "New team formation";
pub const REASON_FILLS_GAPS: &str = "Fills skill gaps in team";
pub const REASON_SMALL_TEAM: &str = "Perfect for small team";
pub const REASON_MEDIUM_TEAM: &str = "Good for medium team";
pub const REASON_COMPLETES_TEAM: &str = "Completes team";

/// A numeric score with the reasons that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchScore {
    pub score: u32,
    pub reasons: Vec<String>,
}

impl MatchScore {
    fn empty() -> Self {
        Self {
            score: 0,
            reasons: Vec::new(),
        }
    }

    fn fixed(score: u32, reason: &str) -> Self {
        Self {
            score,
            reasons: vec![reason.to_string()],
        }
    }

    fn award(&mut self, points: u32, reason: impl Into<String>) {
        self.score += points;
        self.reasons.push(reason.into());
    }
}

fn intersects(skills: &BTreeSet<&str>, table: &BTreeSet<String>) -> bool {
    table.iter().any(|tag| skills.contains(tag.as_str()))
}

/// Number of skills `b` brings that `a` lacks
pub fn skill_diversity(a: &Participant, b: &Participant) -> usize {
    let a = a.skill_set();
    b.skill_set().difference(&a).count()
}

/// Number of skills `a` and `b` share
pub fn skill_overlap(a: &Participant, b: &Participant) -> usize {
    let a = a.skill_set();
    b.skill_set().intersection(&a).count()
}

/// Scores participant pairs and participant/team pairs
#[derive(Debug, Clone, Default)]
pub struct CompatibilityScorer {
    synergy: SynergyTable,
}

impl CompatibilityScorer {
    pub fn new(synergy: SynergyTable) -> Self {
        Self { synergy }
    }

    /// How well `b` complements `a`. Directional: problem-solving tags are
    /// only looked up on `a`, technical tags only on `b`.
    pub fn score(&self, a: &Participant, b: &Participant) -> MatchScore {
        let a_skills = a.skill_set();
        let b_skills = b.skill_set();

        if a_skills.is_empty() || b_skills.is_empty() {
            return MatchScore::fixed(BASELINE_SCORE, REASON_NO_SKILL_DATA);
        }

        let mut result = MatchScore::empty();

        let new_skills = b_skills.difference(&a_skills).count();
        if new_skills > 0 {
            let points = (new_skills as u32 * DIVERSITY_WEIGHT).min(DIVERSITY_CAP);
            result.award(points, format!("Adds {} new skills to team", new_skills));
        }

        let shared_skills = a_skills.intersection(&b_skills).count();
        if shared_skills > 0 {
            let points = (shared_skills as u32).min(OVERLAP_CAP);
            result.award(
                points,
                format!("Shares {} skills for better collaboration", shared_skills),
            );
        }

        let coverage = a_skills.union(&b_skills).count();
        if coverage >= WIDE_COVERAGE_THRESHOLD {
            result.award(WIDE_COVERAGE_BONUS, REASON_WIDE_COVERAGE);
        } else if coverage >= GOOD_COVERAGE_THRESHOLD {
            result.award(GOOD_COVERAGE_BONUS, REASON_GOOD_COVERAGE);
        }

        if intersects(&a_skills, &self.synergy.problem_solving)
            && intersects(&b_skills, &self.synergy.technical)
        {
            result.award(PROBLEM_SOLVING_SYNERGY_BONUS, REASON_PROBLEM_SOLVING_SYNERGY);
        }

        if intersects(&a_skills, &self.synergy.leadership)
            && intersects(&b_skills, &self.synergy.leadership)
        {
            result.award(LEADERSHIP_SYNERGY_BONUS, REASON_LEADERSHIP_SYNERGY);
        }

        result
    }

    /// How well `participant` fits into `team`. Smaller teams rank higher.
    pub fn score_against_team(&self, participant: &Participant, team: &TeamWithMembers) -> MatchScore {
        if team.members.is_empty() {
            return MatchScore::fixed(NEW_TEAM_SCORE, REASON_NEW_TEAM);
        }

        let mut result = MatchScore::empty();
        let team_skills = team.skill_set();
        let own_skills = participant.skill_set();

        if !own_skills.is_empty() {
            let new_skills = own_skills.difference(&team_skills).count();
            if new_skills > 0 {
                result.award(
                    new_skills as u32 * DIVERSITY_WEIGHT,
                    format!("Adds {} new skills to team", new_skills),
                );
                if team_skills.len() < GAP_THRESHOLD {
                    result.award(GAP_BONUS, REASON_FILLS_GAPS);
                }
            }
        }

        let open_slots = team.open_slots();
        if open_slots == 1 {
            result.award(COMPLETES_TEAM_BONUS, REASON_COMPLETES_TEAM);
        } else if open_slots > 1 {
            if team.size() == 1 {
                result.award(SMALL_TEAM_BONUS, REASON_SMALL_TEAM);
            } else {
                result.award(MEDIUM_TEAM_BONUS, REASON_MEDIUM_TEAM);
            }
        }

        result
    }
}
