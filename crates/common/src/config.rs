//! Configuration management following 12-factor app principles
//!
//! All configuration is loaded from environment variables to ensure
//! clean separation between code and config.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Upper bound for `REQUEST_MAX_AGE_DAYS` (ten years)
pub const MAX_REQUEST_AGE_DAYS: i64 = 3650;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database connection URL (PostgreSQL)
    pub database_url: String,

    /// Capacity given to teams created without an explicit one
    pub default_team_capacity: i32,

    /// Age after which a pending request is expired by the sweeper
    pub request_max_age_days: i64,
    pub sweep_interval_secs: u64,

    /// Overrides for the scorer's synergy lookup table (None keeps the defaults)
    pub synergy_problem_solving_tags: Option<Vec<String>>,
    pub synergy_technical_tags: Option<Vec<String>>,
    pub synergy_leadership_tags: Option<Vec<String>>,

    /// Runtime configuration
    pub rust_log: String,
    pub log_format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default_team_capacity = lookup("DEFAULT_TEAM_CAPACITY")
            .unwrap_or_else(|| "4".to_string())
            .parse::<i32>()
            .map_err(|e| anyhow::anyhow!("DEFAULT_TEAM_CAPACITY must be an integer: {}", e))?;
        // A team formed by an accepted request starts with two members
        if !(2..=10).contains(&default_team_capacity) {
            return Err(anyhow::anyhow!(
                "DEFAULT_TEAM_CAPACITY must be between 2 and 10"
            ));
        }

        let request_max_age_days = lookup("REQUEST_MAX_AGE_DAYS")
            .unwrap_or_else(|| "7".to_string())
            .parse::<i64>()
            .map_err(|e| anyhow::anyhow!("REQUEST_MAX_AGE_DAYS must be an integer: {}", e))?;
        if !(1..=MAX_REQUEST_AGE_DAYS).contains(&request_max_age_days) {
            return Err(anyhow::anyhow!(
                "REQUEST_MAX_AGE_DAYS must be between 1 and {}",
                MAX_REQUEST_AGE_DAYS
            ));
        }

        let config = Self {
            database_url: lookup("DATABASE_URL")
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required"))?,

            default_team_capacity,

            request_max_age_days,
            sweep_interval_secs: lookup("SWEEP_INTERVAL_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),

            synergy_problem_solving_tags: lookup("SYNERGY_PROBLEM_SOLVING_TAGS")
                .map(|v| parse_tag_list(&v)),
            synergy_technical_tags: lookup("SYNERGY_TECHNICAL_TAGS").map(|v| parse_tag_list(&v)),
            synergy_leadership_tags: lookup("SYNERGY_LEADERSHIP_TAGS")
                .map(|v| parse_tag_list(&v)),

            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            log_format: lookup("LOG_FORMAT").unwrap_or_else(|| "pretty".to_string()),
        };

        Ok(config)
    }
}

/// Split a comma-separated tag list, dropping blanks and normalising case
pub fn parse_tag_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect()
}
