//! Storage-backed experiment repository implementation

use async_trait::async_trait;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::consistent_hashing::ConsistentHasher;
use crate::domain::experiment::{
    Alternative, Experiment, ExperimentRepository, ExperimentValidationError,
    COMPLETED_COUNT_FIELD, PARTICIPANT_COUNT_FIELD, WINNER_NAME_FIELD,
};
use crate::domain::storage::{EntityType, Storage, StorageEntity};
use crate::domain::DomainError;

/// Experiment repository over the key/field storage port
#[derive(Debug, Clone)]
pub struct StorageExperimentRepository {
    storage: Arc<dyn Storage>,
}

impl StorageExperimentRepository {
    /// Create a new storage-backed repository
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    async fn read_counter(&self, alternative: &Alternative, field: &str) -> Result<u64, DomainError> {
        let raw = self
            .storage
            .get(alternative.entity_type(), alternative.storage_key(), field)
            .await?;

        match raw {
            None => Ok(0),
            Some(value) if value.is_empty() => Ok(0),
            Some(value) => value
                .trim()
                .parse::<i64>()
                .map(|n| n.max(0) as u64)
                .map_err(|e| {
                    DomainError::storage(format!(
                        "Counter '{}' of '{}' is not an integer: {}",
                        field,
                        alternative.key(),
                        e
                    ))
                }),
        }
    }

    async fn bump_counter(&self, alternative: &Alternative, field: &str) -> Result<u64, DomainError> {
        let value = self
            .storage
            .increment(alternative.entity_type(), alternative.storage_key(), field, 1)
            .await?;

        Ok(value.max(0) as u64)
    }
}

#[async_trait]
impl ExperimentRepository for StorageExperimentRepository {
    async fn find(&self, name: &str) -> Result<Experiment, DomainError> {
        let fields = self.storage.load(EntityType::Experiment, name).await?;
        Experiment::from_fields(name, &fields)
    }

    async fn find_or_create(
        &self,
        name: &str,
        declarations: &[String],
        salt: Option<&str>,
    ) -> Result<Experiment, DomainError> {
        match self.find(name).await {
            Ok(experiment) => Ok(experiment),
            Err(e) if e.is_not_found() => {
                let mut experiment = Experiment::new(name, declarations)?;

                if let Some(salt) = salt {
                    experiment = experiment.with_salt(salt);
                }

                self.save(&experiment).await?;

                info!(
                    experiment = %name,
                    alternatives = ?experiment.alternative_names(),
                    "Experiment created"
                );

                Ok(experiment)
            }
            Err(e) => Err(e),
        }
    }

    async fn save(&self, experiment: &Experiment) -> Result<(), DomainError> {
        self.storage
            .save(
                experiment.entity_type(),
                experiment.storage_key(),
                &experiment.to_fields(),
            )
            .await
    }

    async fn winner(&self, experiment: &Experiment) -> Result<Option<Alternative>, DomainError> {
        let winner_name = self
            .storage
            .get(
                experiment.entity_type(),
                experiment.storage_key(),
                WINNER_NAME_FIELD,
            )
            .await?;

        let Some(winner_name) = winner_name.filter(|n| !n.is_empty()) else {
            return Ok(None);
        };

        match experiment.alternative(&winner_name) {
            Some(alternative) => Ok(Some(alternative.clone())),
            None => {
                warn!(
                    experiment = %experiment.name(),
                    winner = %winner_name,
                    "Stored winner is not an alternative of the experiment, ignoring it"
                );
                Ok(None)
            }
        }
    }

    async fn set_winner(
        &self,
        experiment: &Experiment,
        winner: Option<&str>,
    ) -> Result<(), DomainError> {
        let winner = winner.unwrap_or_default();

        if !winner.is_empty() && experiment.alternative(winner).is_none() {
            return Err(ExperimentValidationError::UnknownAlternative(winner.to_string()).into());
        }

        self.storage
            .set(
                experiment.entity_type(),
                experiment.storage_key(),
                WINNER_NAME_FIELD,
                winner,
            )
            .await?;

        if winner.is_empty() {
            info!(experiment = %experiment.name(), "Winner cleared");
        } else {
            info!(experiment = %experiment.name(), winner = %winner, "Winner set");
        }

        Ok(())
    }

    async fn next_alternative(
        &self,
        experiment: &Experiment,
        client_id: &str,
    ) -> Result<Alternative, DomainError> {
        if let Some(winner) = self.winner(experiment).await? {
            return Ok(winner);
        }

        let alternative = ConsistentHasher::random_alternative(experiment, client_id);

        debug!(
            experiment = %experiment.name(),
            alternative = %alternative.name(),
            client_id = %client_id,
            "Bucketed client"
        );

        Ok(alternative.clone())
    }

    async fn reset(&self, experiment: &Experiment) -> Result<(), DomainError> {
        for alternative in experiment.alternatives() {
            self.delete_alternative(alternative).await?;
        }

        self.set_winner(experiment, None).await?;

        info!(experiment = %experiment.name(), "Experiment reset");

        Ok(())
    }

    async fn participant_count(&self, alternative: &Alternative) -> Result<u64, DomainError> {
        self.read_counter(alternative, PARTICIPANT_COUNT_FIELD).await
    }

    async fn completed_count(&self, alternative: &Alternative) -> Result<u64, DomainError> {
        self.read_counter(alternative, COMPLETED_COUNT_FIELD).await
    }

    async fn increment_participation(
        &self,
        alternative: &Alternative,
    ) -> Result<u64, DomainError> {
        self.bump_counter(alternative, PARTICIPANT_COUNT_FIELD).await
    }

    async fn increment_completion(&self, alternative: &Alternative) -> Result<u64, DomainError> {
        self.bump_counter(alternative, COMPLETED_COUNT_FIELD).await
    }

    async fn delete_alternative(&self, alternative: &Alternative) -> Result<bool, DomainError> {
        self.storage
            .delete(alternative.entity_type(), alternative.storage_key())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::storage::MockStorage;
    use crate::infrastructure::storage::InMemoryStorage;

    fn declarations(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn create_repository() -> StorageExperimentRepository {
        StorageExperimentRepository::new(Arc::new(InMemoryStorage::new()))
    }

    #[tokio::test]
    async fn test_find_missing_experiment() {
        let repo = create_repository();

        let err = repo.find("missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_find_or_create_persists_definition() {
        let repo = create_repository();

        let created = repo
            .find_or_create("E", &declarations(&["CONTROL", "A", "B=2"]), None)
            .await
            .unwrap();
        let found = repo.find("E").await.unwrap();

        assert_eq!(found.alternative_names(), vec!["CONTROL", "A", "B"]);
        assert_eq!(found.total_weight(), 4);
        assert_eq!(
            found.start_time().timestamp_millis(),
            created.start_time().timestamp_millis()
        );
    }

    #[tokio::test]
    async fn test_find_or_create_keeps_existing_definition() {
        let repo = create_repository();

        repo.find_or_create("E", &declarations(&["CONTROL", "A"]), None)
            .await
            .unwrap();
        let again = repo
            .find_or_create("E", &declarations(&["OTHER", "SET"]), None)
            .await
            .unwrap();

        assert_eq!(again.alternative_names(), vec!["CONTROL", "A"]);
    }

    #[tokio::test]
    async fn test_find_or_create_persists_salt_on_creation_only() {
        let repo = create_repository();

        let created = repo
            .find_or_create("E", &declarations(&["CONTROL", "A"]), Some("spring-launch"))
            .await
            .unwrap();
        assert_eq!(created.salt(), "spring-launch");
        assert_eq!(repo.find("E").await.unwrap().salt(), "spring-launch");

        let again = repo
            .find_or_create("E", &declarations(&["CONTROL", "A"]), Some("other"))
            .await
            .unwrap();
        assert_eq!(again.salt(), "spring-launch");
    }

    #[tokio::test]
    async fn test_find_or_create_rejects_invalid_declarations() {
        let repo = create_repository();

        let err = repo
            .find_or_create("E", &declarations(&["A", "A"]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
        assert!(repo.find("E").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_counters() {
        let repo = create_repository();
        let experiment = repo
            .find_or_create("E", &declarations(&["CONTROL", "A"]), None)
            .await
            .unwrap();
        let alt = &experiment.alternatives()[1];

        assert_eq!(repo.participant_count(alt).await.unwrap(), 0);
        assert_eq!(repo.completed_count(alt).await.unwrap(), 0);

        assert_eq!(repo.increment_participation(alt).await.unwrap(), 1);
        assert_eq!(repo.increment_participation(alt).await.unwrap(), 2);
        assert_eq!(repo.increment_completion(alt).await.unwrap(), 1);

        let counts = repo.counts(alt).await.unwrap();
        assert_eq!(counts.participants, 2);
        assert_eq!(counts.completed, 1);

        assert_eq!(repo.total_participants(&experiment).await.unwrap(), 2);
        assert_eq!(repo.total_completed(&experiment).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_winner_round_trip() {
        let repo = create_repository();
        let experiment = repo
            .find_or_create("E", &declarations(&["CONTROL", "A", "B"]), None)
            .await
            .unwrap();

        assert!(repo.winner(&experiment).await.unwrap().is_none());

        repo.set_winner(&experiment, Some("B")).await.unwrap();
        assert_eq!(repo.winner(&experiment).await.unwrap().unwrap().name(), "B");

        repo.set_winner(&experiment, Some("")).await.unwrap();
        assert!(repo.winner(&experiment).await.unwrap().is_none());

        repo.set_winner(&experiment, Some("A")).await.unwrap();
        repo.set_winner(&experiment, None).await.unwrap();
        assert!(repo.winner(&experiment).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_unknown_winner() {
        let repo = create_repository();
        let experiment = repo
            .find_or_create("E", &declarations(&["CONTROL", "A"]), None)
            .await
            .unwrap();

        let err = repo.set_winner(&experiment, Some("Z")).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_next_alternative_prefers_winner() {
        let repo = create_repository();
        let experiment = repo
            .find_or_create("E", &declarations(&["CONTROL", "A", "B"]), None)
            .await
            .unwrap();

        let bucketed = repo.next_alternative(&experiment, "c1").await.unwrap();
        assert_eq!(
            bucketed.name(),
            ConsistentHasher::random_alternative(&experiment, "c1").name()
        );

        repo.set_winner(&experiment, Some("A")).await.unwrap();

        for i in 0..50 {
            let alt = repo
                .next_alternative(&experiment, &format!("client-{}", i))
                .await
                .unwrap();
            assert_eq!(alt.name(), "A");
        }
    }

    #[tokio::test]
    async fn test_reset_clears_counters_and_winner() {
        let repo = create_repository();
        let experiment = repo
            .find_or_create("E", &declarations(&["CONTROL", "A"]), None)
            .await
            .unwrap();

        for alt in experiment.alternatives() {
            repo.increment_participation(alt).await.unwrap();
            repo.increment_completion(alt).await.unwrap();
        }
        repo.set_winner(&experiment, Some("A")).await.unwrap();

        repo.reset(&experiment).await.unwrap();

        assert_eq!(repo.total_participants(&experiment).await.unwrap(), 0);
        assert_eq!(repo.total_completed(&experiment).await.unwrap(), 0);
        assert!(repo.winner(&experiment).await.unwrap().is_none());

        // The definition survives
        let found = repo.find("E").await.unwrap();
        assert_eq!(found.alternative_names(), vec!["CONTROL", "A"]);
    }

    #[tokio::test]
    async fn test_corrupt_counter_is_storage_error() {
        let mut mock = MockStorage::new();
        mock.expect_get()
            .returning(|_, _, _| Ok(Some("many".to_string())));

        let repo = StorageExperimentRepository::new(Arc::new(mock));
        let experiment = Experiment::new("E", &["CONTROL"]).unwrap();

        let err = repo
            .participant_count(experiment.control())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Storage { .. }));
    }

    #[tokio::test]
    async fn test_storage_failure_propagates_from_find_or_create() {
        let mut mock = MockStorage::new();
        mock.expect_load()
            .returning(|_, _| Err(DomainError::storage("connection reset")));
        mock.expect_save().never();

        let repo = StorageExperimentRepository::new(Arc::new(mock));

        let err = repo
            .find_or_create("E", &declarations(&["CONTROL"]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Storage { .. }));
    }
}
