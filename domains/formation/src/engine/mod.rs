//! Formation engine
//!
//! One engine value wraps an explicitly passed [`EntityStore`] together with
//! its configuration, scorer and notifier. Mutating operations each run a
//! single store transaction: locking reads, checks, writes, commit. Events
//! are published only after the commit succeeded.

pub mod discovery;
pub mod membership;
pub mod registry;
pub mod reports;
pub mod requests;

use std::sync::Arc;

use teamforge_common::{Error, Result};
use uuid::Uuid;

use crate::domain::config::FormationConfig;
use crate::domain::entities::{Participant, Team};
use crate::domain::scoring::CompatibilityScorer;
use crate::notifications::{FormationEvent, Notifier, TracingNotifier};
use crate::repository::{EntityStore, StoreTx};

pub use discovery::{DiscoveryResult, TeamSuggestion, TeammateSuggestion};
pub use reports::{RequestInbox, RequestSummary, SkillCount, StatusCounts, TeamStatistics, TeamStatus};
pub use requests::RequestResolution;

pub struct FormationEngine<S: EntityStore> {
    store: S,
    config: FormationConfig,
    scorer: CompatibilityScorer,
    notifier: Arc<dyn Notifier>,
}

impl<S: EntityStore> FormationEngine<S> {
    pub fn new(store: S, config: FormationConfig) -> Self {
        let scorer = CompatibilityScorer::new(config.synergy.clone());
        Self {
            store,
            config,
            scorer,
            notifier: Arc::new(TracingNotifier),
        }
    }

    /// Replace the default log-only notifier
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &FormationConfig {
        &self.config
    }

    pub fn scorer(&self) -> &CompatibilityScorer {
        &self.scorer
    }

    /// Deliver events after commit. Failures are logged and swallowed.
    async fn publish(&self, events: Vec<FormationEvent>) {
        for event in events {
            if let Err(e) = self.notifier.notify(&event).await {
                tracing::error!(error = %e, event = event.name(), "Failed to deliver notification");
            }
        }
    }
}

/// Lock a team row or fail with `NotFound`
pub(crate) async fn require_team<T: StoreTx>(tx: &mut T, team_id: Uuid) -> Result<Team> {
    tx.lock_team(team_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Team {} not found", team_id)))
}

/// Lock a participant row or fail with `NotFound`
pub(crate) async fn require_participant<T: StoreTx>(
    tx: &mut T,
    participant_id: Uuid,
) -> Result<Participant> {
    tx.lock_participant(participant_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Participant {} not found", participant_id)))
}

/// Lock two participants in ascending id order, returned as `(first, second)`
pub(crate) async fn require_participant_pair<T: StoreTx>(
    tx: &mut T,
    first: Uuid,
    second: Uuid,
) -> Result<(Participant, Participant)> {
    if first <= second {
        let a = require_participant(tx, first).await?;
        let b = require_participant(tx, second).await?;
        Ok((a, b))
    } else {
        let b = require_participant(tx, second).await?;
        let a = require_participant(tx, first).await?;
        Ok((a, b))
    }
}
