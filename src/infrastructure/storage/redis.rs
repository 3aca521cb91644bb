//! Redis storage implementation
//!
//! Each `(entity_type, key)` record is one Redis hash; fields map onto hash
//! fields, so increments use `HINCRBY` and are atomic per field.

use std::fmt;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use crate::domain::storage::{EntityType, FieldMap, Storage};
use crate::domain::DomainError;

/// Configuration for Redis storage
#[derive(Debug, Clone)]
pub struct RedisStorageConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Key prefix for namespacing
    pub key_prefix: Option<String>,
}

impl Default for RedisStorageConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: None,
        }
    }
}

impl RedisStorageConfig {
    /// Creates a new configuration with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Sets the key prefix
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }
}

/// Redis hash-field storage
#[derive(Clone)]
pub struct RedisStorage {
    connection: ConnectionManager,
    config: RedisStorageConfig,
}

impl fmt::Debug for RedisStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStorage")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisStorage {
    /// Creates a new Redis storage connection
    pub async fn new(config: RedisStorageConfig) -> Result<Self, DomainError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| DomainError::storage(format!("Failed to create Redis client: {}", e)))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self { connection, config })
    }

    fn hash_key(&self, entity_type: EntityType, key: &str) -> String {
        hash_key(self.config.key_prefix.as_deref(), entity_type, key)
    }
}

fn hash_key(prefix: Option<&str>, entity_type: EntityType, key: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}:{}:{}", prefix, entity_type.as_str(), key),
        None => format!("{}:{}", entity_type.as_str(), key),
    }
}

#[async_trait]
impl Storage for RedisStorage {
    async fn get(
        &self,
        entity_type: EntityType,
        key: &str,
        field: &str,
    ) -> Result<Option<String>, DomainError> {
        let hash_key = self.hash_key(entity_type, key);
        let mut conn = self.connection.clone();

        let value: Option<String> = conn.hget(&hash_key, field).await.map_err(|e| {
            DomainError::storage(format!("Failed to get field '{}' of '{}': {}", field, key, e))
        })?;

        Ok(value)
    }

    async fn set(
        &self,
        entity_type: EntityType,
        key: &str,
        field: &str,
        value: &str,
    ) -> Result<(), DomainError> {
        let hash_key = self.hash_key(entity_type, key);
        let mut conn = self.connection.clone();

        if value.is_empty() {
            let _: i64 = conn.hdel(&hash_key, field).await.map_err(|e| {
                DomainError::storage(format!(
                    "Failed to remove field '{}' of '{}': {}",
                    field, key, e
                ))
            })?;
        } else {
            let _: i64 = conn.hset(&hash_key, field, value).await.map_err(|e| {
                DomainError::storage(format!("Failed to set field '{}' of '{}': {}", field, key, e))
            })?;
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
        let hash_key = self.hash_key(entity_type, key);
        let mut conn = self.connection.clone();

        let new_value: i64 = conn.hincr(&hash_key, field, amount).await.map_err(|e| {
            DomainError::storage(format!(
                "Failed to increment field '{}' of '{}': {}",
                field, key, e
            ))
        })?;

        Ok(new_value)
    }

    async fn save(
        &self,
        entity_type: EntityType,
        key: &str,
        fields: &FieldMap,
    ) -> Result<(), DomainError> {
        if fields.is_empty() {
            return Ok(());
        }

        let hash_key = self.hash_key(entity_type, key);
        let mut conn = self.connection.clone();
        let items: Vec<(&str, &str)> = fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        let _: () = conn
            .hset_multiple(&hash_key, &items)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to save '{}': {}", key, e)))?;

        Ok(())
    }

    async fn load(&self, entity_type: EntityType, key: &str) -> Result<FieldMap, DomainError> {
        let hash_key = self.hash_key(entity_type, key);
        let mut conn = self.connection.clone();

        let fields: FieldMap = conn
            .hgetall(&hash_key)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to load '{}': {}", key, e)))?;

        // Redis has no empty hashes: an absent key reads back as an empty map
        if fields.is_empty() {
            return Err(DomainError::not_found(format!("'{}' not found", key)));
        }

        Ok(fields)
    }

    async fn reset(
        &self,
        entity_type: EntityType,
        key: &str,
        fields: &[String],
    ) -> Result<(), DomainError> {
        let zeroed: FieldMap = fields
            .iter()
            .map(|field| (field.clone(), "0".to_string()))
            .collect();

        self.save(entity_type, key, &zeroed).await
    }

    async fn delete(&self, entity_type: EntityType, key: &str) -> Result<bool, DomainError> {
        let hash_key = self.hash_key(entity_type, key);
        let mut conn = self.connection.clone();

        let deleted: i64 = conn
            .del(&hash_key)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to delete '{}': {}", key, e)))?;

        Ok(deleted > 0)
    }
}
