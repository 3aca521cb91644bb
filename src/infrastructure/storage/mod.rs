//! Storage infrastructure - Storage implementations

mod factory;
mod in_memory;
mod postgres;
mod redis;

pub use factory::{StorageConfig, StorageFactory, StorageType};
pub use in_memory::InMemoryStorage;
pub use postgres::{PostgresConfig, PostgresStorage, DEFAULT_TABLE_NAME};
pub use redis::{RedisStorage, RedisStorageConfig};
