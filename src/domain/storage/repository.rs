//! Storage port definition

use std::fmt::Debug;

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::domain::DomainError;

use super::entity::{EntityType, FieldMap};

/// Key/field value store used by experiments and alternatives
///
/// Every record is a flat map of string fields addressed by
/// `(entity_type, key)`. Implementations must make `increment` atomic per
/// field; callers issue no locking or transactions around it.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Storage: Send + Sync + Debug {
    /// Reads a single field, `None` if the key or field is absent
    async fn get(
        &self,
        entity_type: EntityType,
        key: &str,
        field: &str,
    ) -> Result<Option<String>, DomainError>;

    /// Writes a single field; an empty value removes the field
    async fn set(
        &self,
        entity_type: EntityType,
        key: &str,
        field: &str,
        value: &str,
    ) -> Result<(), DomainError>;

    /// Atomically adds `amount` to an integer field, returning the new value
    async fn increment(
        &self,
        entity_type: EntityType,
        key: &str,
        field: &str,
        amount: i64,
    ) -> Result<i64, DomainError>;

    /// Upserts every field of `fields` under the key
    async fn save(
        &self,
        entity_type: EntityType,
        key: &str,
        fields: &FieldMap,
    ) -> Result<(), DomainError>;

    /// Loads every field under the key, `NotFound` if the key is absent
    async fn load(&self, entity_type: EntityType, key: &str) -> Result<FieldMap, DomainError>;

    /// Sets each named field to zero
    async fn reset(
        &self,
        entity_type: EntityType,
        key: &str,
        fields: &[String],
    ) -> Result<(), DomainError>;

    /// Removes all fields for the key, returns true if anything was removed
    async fn delete(&self, entity_type: EntityType, key: &str) -> Result<bool, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_mock_storage_load_not_found() {
        let mut mock = MockStorage::new();
        mock.expect_load()
            .with(eq(EntityType::Experiment), eq("missing"))
            .returning(|_, key| Err(DomainError::not_found(format!("'{}' not found", key))));

        let result = mock.load(EntityType::Experiment, "missing").await;
        assert!(result.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_mock_storage_increment() {
        let mut mock = MockStorage::new();
        mock.expect_increment().returning(|_, _, _, amount| Ok(amount));

        let value = mock
            .increment(EntityType::Alternative, "exp:a", "participant_count", 1)
            .await
            .unwrap();
        assert_eq!(value, 1);
    }
}
