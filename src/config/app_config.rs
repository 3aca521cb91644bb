use std::path::Path;

use serde::Deserialize;

use crate::domain::visitor::{VisitorFilter, DEFAULT_ROBOT_PATTERN};
use crate::domain::DomainError;
use crate::infrastructure::storage::{
    PostgresConfig, RedisStorageConfig, StorageConfig, StorageType,
};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub storage: StorageSettings,
    pub exclusion: ExclusionConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Storage backend selection
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// "memory", "redis" or "postgres"
    #[serde(rename = "type")]
    pub storage_type: String,
    pub url: Option<String>,
    /// Redis key namespace
    pub key_prefix: Option<String>,
    /// PostgreSQL table
    pub table_name: Option<String>,
}

/// Visitors whose traffic is never counted
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExclusionConfig {
    /// Case-insensitive user agent regex; empty disables robot detection
    pub robot_user_agent_pattern: String,
    pub ignored_ip_addresses: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            storage_type: "memory".to_string(),
            url: None,
            key_prefix: None,
            table_name: None,
        }
    }
}

impl Default for ExclusionConfig {
    fn default() -> Self {
        Self {
            robot_user_agent_pattern: DEFAULT_ROBOT_PATTERN.to_string(),
            ignored_ip_addresses: Vec::new(),
        }
    }
}

impl StorageSettings {
    /// Resolve into an adapter configuration
    pub fn to_storage_config(&self) -> Result<StorageConfig, DomainError> {
        let storage_type: StorageType = self.storage_type.parse()?;

        match storage_type {
            StorageType::InMemory => Ok(StorageConfig::InMemory),
            StorageType::Redis => {
                let mut config = RedisStorageConfig::new(self.require_url(storage_type)?);

                if let Some(prefix) = &self.key_prefix {
                    config = config.with_key_prefix(prefix);
                }

                Ok(StorageConfig::Redis(config))
            }
            StorageType::Postgres => {
                let mut config = PostgresConfig::new(self.require_url(storage_type)?);

                if let Some(table_name) = &self.table_name {
                    config = config.with_table_name(table_name);
                }

                Ok(StorageConfig::Postgres(config))
            }
        }
    }

    fn require_url(&self, storage_type: StorageType) -> Result<&str, DomainError> {
        self.url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                DomainError::configuration(format!("storage.url is required for {}", storage_type))
            })
    }
}

impl ExclusionConfig {
    pub fn build_filter(&self) -> Result<VisitorFilter, DomainError> {
        VisitorFilter::new(
            &self.robot_user_agent_pattern,
            self.ignored_ip_addresses.clone(),
        )
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config")
    }

    /// Load `default` and `local` files from `dir`, then `SPLIT__*` env overrides
    ///
    /// Missing files are fine; a file that exists but cannot be parsed is an error.
    pub fn load_from(dir: impl AsRef<Path>) -> Result<Self, config::ConfigError> {
        let default_file = dir.as_ref().join("default");
        let local_file = dir.as_ref().join("local");

        let config = config::Config::builder()
            .add_source(config::File::with_name(&default_file.to_string_lossy()).required(false))
            .add_source(config::File::with_name(&local_file.to_string_lossy()).required(false))
            .add_source(
                config::Environment::with_prefix("SPLIT")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("exclusion.ignored_ip_addresses")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
