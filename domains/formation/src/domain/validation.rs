//! Validation helpers and constants for participant and team input

use regex::Regex;
use teamforge_common::{Error, Result};

/// Maximum number of skill tags a participant can record
pub const MAX_SKILLS: usize = 20;

/// Maximum length of a single skill or team tag
pub const MAX_TAG_LEN: usize = 50;

/// Maximum length of a participant or team name, in characters
pub const MAX_DISPLAY_NAME_CHARS: usize = 100;

/// Maximum number of descriptive tags on a team
pub const MAX_TEAM_TAGS: usize = 10;

lazy_static::lazy_static! {
    /// Skill tag regex: lowercase alphanumeric start, then alphanumerics, `_` or `-`
    pub static ref SKILL_TAG_REGEX: Regex =
        Regex::new(r"^[a-z0-9][a-z0-9_-]*$").unwrap();

    /// Registration number regex: 1-20 ASCII alphanumerics
    pub static ref REGISTRATION_NUMBER_REGEX: Regex =
        Regex::new(r"^[A-Za-z0-9]{1,20}$").unwrap();
}

/// Validate a single (already normalised) tag
pub fn validate_tag(tag: &str) -> bool {
    tag.len() <= MAX_TAG_LEN && SKILL_TAG_REGEX.is_match(tag)
}

/// Validate a registration number
pub fn validate_registration_number(value: &str) -> bool {
    REGISTRATION_NUMBER_REGEX.is_match(value)
}

/// Lower-case, trim and de-duplicate tags, keeping first-seen order
fn normalize(tags: Vec<String>) -> Result<Vec<String>> {
    let mut seen = Vec::with_capacity(tags.len());
    for raw in tags {
        let tag = raw.trim().to_lowercase();
        if !validate_tag(&tag) {
            return Err(Error::Validation(format!("Invalid tag '{}'", raw)));
        }
        if !seen.contains(&tag) {
            seen.push(tag);
        }
    }
    Ok(seen)
}

/// Normalise a participant's skill tags: non-empty, at most [`MAX_SKILLS`]
pub fn normalize_skills(skills: Vec<String>) -> Result<Vec<String>> {
    let skills = normalize(skills)?;
    if skills.is_empty() {
        return Err(Error::Validation(
            "At least one skill must be selected".to_string(),
        ));
    }
    if skills.len() > MAX_SKILLS {
        return Err(Error::Validation(format!(
            "Maximum {} skills allowed",
            MAX_SKILLS
        )));
    }
    Ok(skills)
}

/// Normalise a team's descriptive tags: at most [`MAX_TEAM_TAGS`], may be empty
pub fn normalize_team_tags(tags: Vec<String>) -> Result<Vec<String>> {
    let tags = normalize(tags)?;
    if tags.len() > MAX_TEAM_TAGS {
        return Err(Error::Validation(format!(
            "Maximum {} team tags allowed",
            MAX_TEAM_TAGS
        )));
    }
    Ok(tags)
}

/// Validate a display name (participant or team)
pub fn validate_display_name(name: &str, what: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() || name.chars().count() > MAX_DISPLAY_NAME_CHARS {
        return Err(Error::Validation(format!(
            "{} must be 1-{} characters",
            what, MAX_DISPLAY_NAME_CHARS
        )));
    }
    Ok(())
}
