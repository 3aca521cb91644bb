//! Participation service for split testing
//!
//! Orchestrates participation, completion and reporting for one visitor,
//! applying the exclusion policy before anything is counted.

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::experiment::{
    Alternative, AlternativeCounts, AlternativeStatistics, Experiment, ExperimentRepository,
};
use crate::domain::storage::Storage;
use crate::domain::visitor::{VisitorContext, VisitorFilter};
use crate::domain::DomainError;
use crate::infrastructure::experiment::{
    calculate_statistics, ConsistentHasher, StorageExperimentRepository,
};

/// Participation API bound to a single visitor
#[derive(Debug)]
pub struct ParticipationService<R: ExperimentRepository = StorageExperimentRepository> {
    repository: Arc<R>,
    visitor: VisitorContext,
    filter: VisitorFilter,
}

impl ParticipationService<StorageExperimentRepository> {
    /// Create a service over a storage adapter
    pub fn new(storage: Arc<dyn Storage>, visitor: VisitorContext, filter: VisitorFilter) -> Self {
        Self::with_repository(
            Arc::new(StorageExperimentRepository::new(storage)),
            visitor,
            filter,
        )
    }
}

impl<R: ExperimentRepository> ParticipationService<R> {
    /// Create a service over any experiment repository
    pub fn with_repository(repository: Arc<R>, visitor: VisitorContext, filter: VisitorFilter) -> Self {
        Self {
            repository,
            visitor,
            filter,
        }
    }

    fn is_excluded(&self) -> bool {
        self.filter.is_excluded(&self.visitor)
    }

    // Winner already checked by the caller
    fn bucket<'a>(&self, experiment: &'a Experiment) -> &'a Alternative {
        let alternative = ConsistentHasher::random_alternative(experiment, self.visitor.client_id());

        debug!(
            experiment = %experiment.name(),
            alternative = %alternative.name(),
            client_id = %self.visitor.client_id(),
            "Bucketed client"
        );

        alternative
    }

    async fn find(&self, experiment_name: &str) -> Result<Experiment, DomainError> {
        self.repository.find(experiment_name).await
    }

    /// Enter the visitor into an experiment, creating it on first use
    ///
    /// Alternatives are declared as `"name"` or `"name=weight"`; the first is
    /// the control. Excluded visitors get the control and a forced winner is
    /// returned as-is, both without counting a participation.
    pub async fn participate(
        &self,
        experiment_name: &str,
        alternatives: &[String],
    ) -> Result<String, DomainError> {
        self.participate_with_salt(experiment_name, alternatives, None)
            .await
    }

    /// Like `participate`, hashing with `salt` instead of the name when the
    /// experiment is created by this call
    pub async fn participate_with_salt(
        &self,
        experiment_name: &str,
        alternatives: &[String],
        salt: Option<&str>,
    ) -> Result<String, DomainError> {
        let experiment = self
            .repository
            .find_or_create(experiment_name, alternatives, salt)
            .await?;

        if self.is_excluded() {
            debug!(
                experiment = %experiment_name,
                client_id = %self.visitor.client_id(),
                "Visitor excluded, serving control"
            );
            return Ok(experiment.control().name().to_string());
        }

        if let Some(winner) = self.repository.winner(&experiment).await? {
            return Ok(winner.name().to_string());
        }

        let alternative = self.bucket(&experiment);
        self.repository.increment_participation(alternative).await?;

        Ok(alternative.name().to_string())
    }

    /// Record a conversion for the visitor's alternative
    ///
    /// Returns `None` without counting when the visitor is excluded or a winner
    /// is set. Fails with `NotFound` if the experiment was never entered.
    pub async fn complete(&self, experiment_name: &str) -> Result<Option<String>, DomainError> {
        if self.is_excluded() {
            return Ok(None);
        }

        let experiment = self.find(experiment_name).await?;

        if self.repository.winner(&experiment).await?.is_some() {
            return Ok(None);
        }

        let alternative = self.bucket(&experiment);
        self.repository.increment_completion(alternative).await?;

        Ok(Some(alternative.name().to_string()))
    }

    /// Force every visitor onto one alternative
    pub async fn set_winner(
        &self,
        experiment_name: &str,
        winner_name: &str,
    ) -> Result<(), DomainError> {
        let experiment = self.find(experiment_name).await?;
        self.repository
            .set_winner(&experiment, Some(winner_name))
            .await
    }

    pub async fn clear_winner(&self, experiment_name: &str) -> Result<(), DomainError> {
        let experiment = self.find(experiment_name).await?;
        self.repository.set_winner(&experiment, None).await
    }

    /// Name of the forced winner, if any
    pub async fn winner(&self, experiment_name: &str) -> Result<Option<String>, DomainError> {
        let experiment = self.find(experiment_name).await?;

        Ok(self
            .repository
            .winner(&experiment)
            .await?
            .map(|winner| winner.name().to_string()))
    }

    /// Per-alternative statistics, highest z-score first
    pub async fn get_statistics(
        &self,
        experiment_name: &str,
    ) -> Result<Vec<AlternativeStatistics>, DomainError> {
        let experiment = self.find(experiment_name).await?;

        let mut rows = Vec::with_capacity(experiment.alternatives().len());
        let mut control = AlternativeCounts::default();

        for alternative in experiment.alternatives() {
            let counts = self.repository.counts(alternative).await?;
            let is_control = experiment.is_control(alternative);

            if is_control {
                control = counts;
            }

            rows.push((alternative.name().to_string(), counts, is_control));
        }

        Ok(calculate_statistics(&rows, control))
    }

    pub async fn get_total_completed(&self, experiment_name: &str) -> Result<u64, DomainError> {
        let experiment = self.find(experiment_name).await?;
        self.repository.total_completed(&experiment).await
    }

    pub async fn get_total_participants(&self, experiment_name: &str) -> Result<u64, DomainError> {
        let experiment = self.find(experiment_name).await?;
        self.repository.total_participants(&experiment).await
    }

    /// Drop all counters and the winner, keeping the definition
    pub async fn reset_experiment(&self, experiment_name: &str) -> Result<(), DomainError> {
        let experiment = self.find(experiment_name).await?;
        self.repository.reset(&experiment).await?;

        info!(experiment = %experiment_name, "Statistics reset");

        Ok(())
    }
}
