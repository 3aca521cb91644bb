//! Storage entity traits and types

use std::collections::BTreeMap;
use std::fmt;

/// Field name to value mapping persisted under a single key
pub type FieldMap = BTreeMap<String, String>;

/// Kinds of records kept in the store
///
/// Adapters use the entity type to namespace keys, so an experiment and an
/// alternative never collide even when their keys are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    /// Experiment definition record
    Experiment,
    /// Per-alternative counter record
    Alternative,
}

impl EntityType {
    /// Returns the stable name used in storage keys
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Experiment => "experiment",
            Self::Alternative => "alternative",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for types that are persisted through the storage port
pub trait StorageEntity {
    /// The record kind
    fn entity_type(&self) -> EntityType;

    /// The key identifying this entity within its type
    fn storage_key(&self) -> &str;
}
