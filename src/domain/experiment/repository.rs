//! Experiment repository trait

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::{Alternative, Experiment};
use super::result::AlternativeCounts;
use crate::domain::DomainError;

/// Storage-backed operations on experiments and their alternatives
///
/// Counter reads always go to storage; nothing is cached on the entities.
#[async_trait]
pub trait ExperimentRepository: Send + Sync + Debug {
    /// Load an experiment by name, `NotFound` if it was never saved
    async fn find(&self, name: &str) -> Result<Experiment, DomainError>;

    /// Load an experiment, creating and saving it from the declarations when missing
    ///
    /// `salt` only applies on creation; an existing experiment keeps its stored salt.
    async fn find_or_create(
        &self,
        name: &str,
        declarations: &[String],
        salt: Option<&str>,
    ) -> Result<Experiment, DomainError>;

    /// Persist the start time and alternative list
    async fn save(&self, experiment: &Experiment) -> Result<(), DomainError>;

    /// Get the forced winner, if any
    async fn winner(&self, experiment: &Experiment) -> Result<Option<Alternative>, DomainError>;

    /// Force a winner; `None` clears it
    async fn set_winner(
        &self,
        experiment: &Experiment,
        winner: Option<&str>,
    ) -> Result<(), DomainError>;

    /// Pick the alternative for a client: the winner if set, else its hash bucket
    async fn next_alternative(
        &self,
        experiment: &Experiment,
        client_id: &str,
    ) -> Result<Alternative, DomainError>;

    /// Delete every alternative's counters and clear the winner
    async fn reset(&self, experiment: &Experiment) -> Result<(), DomainError>;

    /// Read the participation counter, 0 if absent
    async fn participant_count(&self, alternative: &Alternative) -> Result<u64, DomainError>;

    /// Read the completion counter, 0 if absent
    async fn completed_count(&self, alternative: &Alternative) -> Result<u64, DomainError>;

    /// Add one participation, returning the new count
    async fn increment_participation(
        &self,
        alternative: &Alternative,
    ) -> Result<u64, DomainError>;

    /// Add one completion, returning the new count
    async fn increment_completion(&self, alternative: &Alternative) -> Result<u64, DomainError>;

    /// Remove the alternative's counters entirely
    async fn delete_alternative(&self, alternative: &Alternative) -> Result<bool, DomainError>;

    /// Read both counters of an alternative
    async fn counts(&self, alternative: &Alternative) -> Result<AlternativeCounts, DomainError> {
        Ok(AlternativeCounts::new(
            self.participant_count(alternative).await?,
            self.completed_count(alternative).await?,
        ))
    }

    /// Sum of participations over all alternatives
    async fn total_participants(&self, experiment: &Experiment) -> Result<u64, DomainError> {
        let mut total = 0;

        for alternative in experiment.alternatives() {
            total += self.participant_count(alternative).await?;
        }

        Ok(total)
    }

    /// Sum of completions over all alternatives
    async fn total_completed(&self, experiment: &Experiment) -> Result<u64, DomainError> {
        let mut total = 0;

        for alternative in experiment.alternatives() {
            total += self.completed_count(alternative).await?;
        }

        Ok(total)
    }
}
