//! Engine tuning: default capacity, scorer lookup table, discovery limits

use std::collections::BTreeSet;

use teamforge_common::Config;

use crate::domain::entities::DEFAULT_TEAM_CAPACITY;

/// Tag sets that drive the scorer's synergy bonuses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynergyTable {
    /// Checked against the first participant only
    pub problem_solving: BTreeSet<String>,
    /// Checked against the second participant only
    pub technical: BTreeSet<String>,
    /// Must intersect both participants
    pub leadership: BTreeSet<String>,
}

fn tag_set(tags: &[&str]) -> BTreeSet<String> {
    tags.iter().map(|t| t.to_string()).collect()
}

impl Default for SynergyTable {
    fn default() -> Self {
        Self {
            problem_solving: tag_set(&["problem_solving", "algorithms", "creative_thinking"]),
            technical: tag_set(&["algebra", "geometry", "algorithms", "pattern_recognition"]),
            leadership: tag_set(&["leadership", "team_collaboration"]),
        }
    }
}

/// Discovery result limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryLimits {
    /// Teammate candidates scoring below this are dropped
    pub min_score: u32,
    pub max_teammates: usize,
    pub max_teams: usize,
}

impl Default for DiscoveryLimits {
    fn default() -> Self {
        Self {
            min_score: 5,
            max_teammates: 20,
            max_teams: 15,
        }
    }
}

/// Configuration consumed by [`crate::FormationEngine`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormationConfig {
    pub default_team_capacity: i32,
    pub synergy: SynergyTable,
    pub discovery: DiscoveryLimits,
}

impl Default for FormationConfig {
    fn default() -> Self {
        Self {
            default_team_capacity: DEFAULT_TEAM_CAPACITY,
            synergy: SynergyTable::default(),
            discovery: DiscoveryLimits::default(),
        }
    }
}

impl From<&Config> for FormationConfig {
    fn from(config: &Config) -> Self {
        let mut synergy = SynergyTable::default();
        if let Some(ref tags) = config.synergy_problem_solving_tags {
            synergy.problem_solving = tags.iter().cloned().collect();
        }
        if let Some(ref tags) = config.synergy_technical_tags {
            synergy.technical = tags.iter().cloned().collect();
        }
        if let Some(ref tags) = config.synergy_leadership_tags {
            synergy.leadership = tags.iter().cloned().collect();
        }

        Self {
            default_team_capacity: config.default_team_capacity,
            synergy,
            discovery: DiscoveryLimits::default(),
        }
    }
}
