//! In-memory storage implementation

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::domain::storage::{EntityType, FieldMap, Storage};
use crate::domain::DomainError;

/// Thread-safe in-memory key/field storage
///
/// Useful for testing and development. Data is lost when the process terminates.
/// Increments run under the write lock, which makes them atomic per field.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    records: RwLock<HashMap<String, FieldMap>>,
}

impl InMemoryStorage {
    /// Creates a new empty in-memory storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    /// Check if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record_key(entity_type: EntityType, key: &str) -> String {
        format!("{}:{}", entity_type.as_str(), key)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, FieldMap>>, DomainError> {
        self.records
            .read()
            .map_err(|e| DomainError::storage(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, FieldMap>>, DomainError> {
        self.records
            .write()
            .map_err(|e| DomainError::storage(format!("Failed to acquire write lock: {}", e)))
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn get(
        &self,
        entity_type: EntityType,
        key: &str,
        field: &str,
    ) -> Result<Option<String>, DomainError> {
        let records = self.read()?;

        Ok(records
            .get(&Self::record_key(entity_type, key))
            .and_then(|fields| fields.get(field))
            .cloned())
    }

    async fn set(
        &self,
        entity_type: EntityType,
        key: &str,
        field: &str,
        value: &str,
    ) -> Result<(), DomainError> {
        let record_key = Self::record_key(entity_type, key);
        let mut records = self.write()?;

        if value.is_empty() {
            if let Some(fields) = records.get_mut(&record_key) {
                fields.remove(field);

                if fields.is_empty() {
                    records.remove(&record_key);
                }
            }
        } else {
            records
                .entry(record_key)
                .or_default()
                .insert(field.to_string(), value.to_string());
        }

        Ok(())
    }

    async fn increment(
        &self,
        entity_type: EntityType,
        key: &str,
        field: &str,
        amount: i64,
    ) -> Result<i64, DomainError> {
        let mut records = self.write()?;
        let fields = records
            .entry(Self::record_key(entity_type, key))
            .or_default();

        let current = match fields.get(field) {
            Some(raw) => raw.parse::<i64>().map_err(|e| {
                DomainError::storage(format!(
                    "Field '{}' of '{}' is not an integer: {}",
                    field, key, e
                ))
            })?,
            None => 0,
        };

        let next = current + amount;
        fields.insert(field.to_string(), next.to_string());

        Ok(next)
    }

    async fn save(
        &self,
        entity_type: EntityType,
        key: &str,
        fields: &FieldMap,
    ) -> Result<(), DomainError> {
        let mut records = self.write()?;

        records
            .entry(Self::record_key(entity_type, key))
            .or_default()
            .extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));

        Ok(())
    }

    async fn load(&self, entity_type: EntityType, key: &str) -> Result<FieldMap, DomainError> {
        let records = self.read()?;

        records
            .get(&Self::record_key(entity_type, key))
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("'{}' not found", key)))
    }

    async fn reset(
        &self,
        entity_type: EntityType,
        key: &str,
        fields: &[String],
    ) -> Result<(), DomainError> {
        let mut records = self.write()?;
        let record = records
            .entry(Self::record_key(entity_type, key))
            .or_default();

        for field in fields {
            record.insert(field.clone(), "0".to_string());
        }

        Ok(())
    }

    async fn delete(&self, entity_type: EntityType, key: &str) -> Result<bool, DomainError> {
        let mut records = self.write()?;

        Ok(records
            .remove(&Self::record_key(entity_type, key))
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn fields(pairs: &[(&str, &str)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let storage = InMemoryStorage::new();

        storage
            .set(EntityType::Experiment, "E", "winner_name", "A")
            .await
            .unwrap();

        let value = storage
            .get(EntityType::Experiment, "E", "winner_name")
            .await
            .unwrap();
        assert_eq!(value, Some("A".to_string()));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let storage = InMemoryStorage::new();

        let value = storage
            .get(EntityType::Experiment, "E", "winner_name")
            .await
            .unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_set_empty_removes_field() {
        let storage = InMemoryStorage::new();

        storage
            .save(EntityType::Experiment, "E", &fields(&[("a", "1"), ("b", "2")]))
            .await
            .unwrap();
        storage
            .set(EntityType::Experiment, "E", "a", "")
            .await
            .unwrap();

        let loaded = storage.load(EntityType::Experiment, "E").await.unwrap();
        assert_eq!(loaded, fields(&[("b", "2")]));
    }

    #[tokio::test]
    async fn test_entity_types_are_namespaced() {
        let storage = InMemoryStorage::new();

        storage
            .set(EntityType::Experiment, "same", "f", "experiment")
            .await
            .unwrap();
        storage
            .set(EntityType::Alternative, "same", "f", "alternative")
            .await
            .unwrap();

        assert_eq!(
            storage.get(EntityType::Experiment, "same", "f").await.unwrap(),
            Some("experiment".to_string())
        );
        assert_eq!(
            storage.get(EntityType::Alternative, "same", "f").await.unwrap(),
            Some("alternative".to_string())
        );
    }

    #[tokio::test]
    async fn test_increment() {
        let storage = InMemoryStorage::new();

        assert_eq!(
            storage
                .increment(EntityType::Alternative, "E:A", "participant_count", 1)
                .await
                .unwrap(),
            1
        );
        assert_eq!(
            storage
                .increment(EntityType::Alternative, "E:A", "participant_count", 5)
                .await
                .unwrap(),
            6
        );
    }

    #[tokio::test]
    async fn test_increment_non_integer_field() {
        let storage = InMemoryStorage::new();

        storage
            .set(EntityType::Alternative, "E:A", "participant_count", "lots")
            .await
            .unwrap();

        let err = storage
            .increment(EntityType::Alternative, "E:A", "participant_count", 1)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Storage { .. }));
    }

    #[tokio::test]
    async fn test_save_merges_fields() {
        let storage = InMemoryStorage::new();

        storage
            .save(EntityType::Experiment, "E", &fields(&[("a", "1")]))
            .await
            .unwrap();
        storage
            .save(EntityType::Experiment, "E", &fields(&[("b", "2")]))
            .await
            .unwrap();

        let loaded = storage.load(EntityType::Experiment, "E").await.unwrap();
        assert_eq!(loaded, fields(&[("a", "1"), ("b", "2")]));
    }

    #[tokio::test]
    async fn test_load_missing_is_not_found() {
        let storage = InMemoryStorage::new();

        let err = storage.load(EntityType::Experiment, "E").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_reset_zeroes_fields() {
        let storage = InMemoryStorage::new();

        storage
            .save(
                EntityType::Alternative,
                "E:A",
                &fields(&[("participant_count", "7"), ("completed_count", "3")]),
            )
            .await
            .unwrap();
        storage
            .reset(
                EntityType::Alternative,
                "E:A",
                &["participant_count".to_string(), "completed_count".to_string()],
            )
            .await
            .unwrap();

        let loaded = storage.load(EntityType::Alternative, "E:A").await.unwrap();
        assert_eq!(
            loaded,
            fields(&[("participant_count", "0"), ("completed_count", "0")])
        );
    }

    #[tokio::test]
    async fn test_delete() {
        let storage = InMemoryStorage::new();

        storage
            .set(EntityType::Alternative, "E:A", "participant_count", "1")
            .await
            .unwrap();

        assert!(storage.delete(EntityType::Alternative, "E:A").await.unwrap());
        assert!(!storage.delete(EntityType::Alternative, "E:A").await.unwrap());
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_increments() {
        let storage = Arc::new(InMemoryStorage::new());
        let mut handles = vec![];

        for _ in 0..100 {
            let storage = Arc::clone(&storage);
            handles.push(tokio::spawn(async move {
                storage
                    .increment(EntityType::Alternative, "E:A", "participant_count", 1)
                    .await
                    .unwrap();
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        let value = storage
            .get(EntityType::Alternative, "E:A", "participant_count")
            .await
            .unwrap();
        assert_eq!(value, Some("100".to_string()));
        assert_eq!(storage.len(), 1);
    }
}
