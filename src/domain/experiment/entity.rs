//! Experiment domain entities

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::warn;

use super::validation::{
    parse_alternative_declaration, validate_experiment_name, ExperimentValidationError,
    KEY_SEPARATOR, LIST_SEPARATOR,
};
use crate::domain::storage::{EntityType, FieldMap, StorageEntity};
use crate::domain::DomainError;

/// Field holding the forced winner's name
pub const WINNER_NAME_FIELD: &str = "winner_name";
/// Field holding the creation time in milliseconds since the epoch
pub const START_TIME_FIELD: &str = "experiment_start_time";
/// Field holding the pipe-delimited alternative names
pub const ALTERNATIVE_NAMES_FIELD: &str = "alternative_names";
/// Field holding the pipe-delimited alternative weights
pub const ALTERNATIVE_WEIGHTS_FIELD: &str = "alternative_weights";
/// Field holding the hash salt override
pub const SALT_FIELD: &str = "salt";
/// Field holding an alternative's participation counter
pub const PARTICIPANT_COUNT_FIELD: &str = "participant_count";
/// Field holding an alternative's completion counter
pub const COMPLETED_COUNT_FIELD: &str = "completed_count";

/// Separator between the parts of the bucketing hash input
pub const HASH_INPUT_SEPARATOR: char = '|';

// ============================================================================
// Alternative
// ============================================================================

/// One arm of an experiment
///
/// Counters are not held here; they live in storage under [`Alternative::key`]
/// and are read through the experiment repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alternative {
    name: String,
    weight: u32,
    key: String,
}

impl Alternative {
    fn new(experiment_name: &str, name: String, weight: u32) -> Self {
        let key = format!("{}{}{}", experiment_name, KEY_SEPARATOR, name);
        Self { name, weight, key }
    }

    /// Get the alternative name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the allocation weight
    pub fn weight(&self) -> u32 {
        self.weight
    }

    /// Composite key `experiment:alternative`
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl StorageEntity for Alternative {
    fn entity_type(&self) -> EntityType {
        EntityType::Alternative
    }

    fn storage_key(&self) -> &str {
        &self.key
    }
}

// ============================================================================
// Experiment
// ============================================================================

/// A named split test with an ordered set of alternatives
///
/// The first alternative is the control. Order is significant: it drives both
/// the weighted walk and the hash input, so it is preserved exactly as
/// declared or loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Experiment {
    name: String,
    alternatives: Vec<Alternative>,
    salt: Option<String>,
    start_time: DateTime<Utc>,
}

impl Experiment {
    /// Create a new experiment from alternative declarations (`name` or `name=weight`)
    pub fn new<S: AsRef<str>>(
        name: impl Into<String>,
        declarations: &[S],
    ) -> Result<Self, ExperimentValidationError> {
        let name = name.into();
        validate_experiment_name(&name)?;

        let parsed = declarations
            .iter()
            .map(|d| parse_alternative_declaration(d.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_parts(name, parsed)
    }

    fn from_parts(
        name: String,
        parsed: Vec<(String, u32)>,
    ) -> Result<Self, ExperimentValidationError> {
        if parsed.is_empty() {
            return Err(ExperimentValidationError::NoAlternatives);
        }

        let mut seen = HashSet::new();

        for (alt_name, _) in &parsed {
            if !seen.insert(alt_name.as_str()) {
                return Err(ExperimentValidationError::DuplicateAlternative(
                    alt_name.clone(),
                ));
            }
        }

        let alternatives = parsed
            .into_iter()
            .map(|(alt_name, weight)| Alternative::new(&name, alt_name, weight))
            .collect();

        Ok(Self {
            name,
            alternatives,
            salt: None,
            start_time: Utc::now(),
        })
    }

    /// Rebuild an experiment from its persisted fields
    pub fn from_fields(name: &str, fields: &FieldMap) -> Result<Self, DomainError> {
        let corrupt = |what: &str| {
            DomainError::storage(format!("Experiment '{}' record is corrupt: {}", name, what))
        };

        let names: Vec<&str> = fields
            .get(ALTERNATIVE_NAMES_FIELD)
            .ok_or_else(|| corrupt("missing alternative names"))?
            .split(LIST_SEPARATOR)
            .collect();

        let weights: Vec<u32> = match fields.get(ALTERNATIVE_WEIGHTS_FIELD) {
            Some(raw) if !raw.is_empty() => raw
                .split(LIST_SEPARATOR)
                .map(|w| w.parse::<u32>().ok().filter(|w| *w >= 1))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| corrupt("invalid alternative weights"))?,
            _ => vec![1; names.len()],
        };

        if weights.len() != names.len() {
            return Err(corrupt("alternative names and weights differ in length"));
        }

        let start_millis = fields
            .get(START_TIME_FIELD)
            .and_then(|raw| raw.parse::<i64>().ok())
            .ok_or_else(|| corrupt("missing start time"))?;

        let start_time = DateTime::from_timestamp_millis(start_millis)
            .ok_or_else(|| corrupt("start time out of range"))?;

        let parsed = names
            .into_iter()
            .map(str::to_string)
            .zip(weights)
            .collect();

        let mut experiment = Self::from_parts(name.to_string(), parsed)?;
        experiment.start_time = start_time;
        experiment.salt = fields.get(SALT_FIELD).filter(|s| !s.is_empty()).cloned();

        Ok(experiment)
    }

    /// Fields persisted by `save`
    pub fn to_fields(&self) -> FieldMap {
        let separator = LIST_SEPARATOR.to_string();
        let mut fields = FieldMap::new();

        fields.insert(
            START_TIME_FIELD.to_string(),
            self.start_time.timestamp_millis().to_string(),
        );
        fields.insert(
            ALTERNATIVE_NAMES_FIELD.to_string(),
            self.alternative_names().join(&separator),
        );
        fields.insert(
            ALTERNATIVE_WEIGHTS_FIELD.to_string(),
            self.alternatives
                .iter()
                .map(|a| a.weight.to_string())
                .collect::<Vec<_>>()
                .join(&separator),
        );

        if let Some(salt) = &self.salt {
            fields.insert(SALT_FIELD.to_string(), salt.clone());
        }

        fields
    }

    // Builder methods

    /// Use a salt other than the name as hash input
    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        let salt = salt.into();
        self.salt = if salt.is_empty() { None } else { Some(salt) };
        self
    }

    // Getters

    /// Get the experiment name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the hash salt, which defaults to the name
    pub fn salt(&self) -> &str {
        self.salt.as_deref().unwrap_or(&self.name)
    }

    /// Get when the experiment was created
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Get all alternatives in declaration order
    pub fn alternatives(&self) -> &[Alternative] {
        &self.alternatives
    }

    /// Get the control alternative (always the first one)
    pub fn control(&self) -> &Alternative {
        &self.alternatives[0]
    }

    /// Check if the alternative is this experiment's control
    pub fn is_control(&self, alternative: &Alternative) -> bool {
        self.control().name == alternative.name
    }

    /// Find an alternative by name
    pub fn alternative(&self, name: &str) -> Option<&Alternative> {
        self.alternatives.iter().find(|a| a.name == name)
    }

    /// Get alternative names in order
    pub fn alternative_names(&self) -> Vec<&str> {
        self.alternatives.iter().map(|a| a.name.as_str()).collect()
    }

    /// Sum of all alternative weights
    pub fn total_weight(&self) -> u64 {
        self.alternatives.iter().map(|a| u64::from(a.weight)).sum()
    }

    // Assignment

    /// Build the string hashed to place a client in a bucket
    ///
    /// Joins the salt, every alternative name and the JSON-encoded client id.
    pub fn hash_input(&self, client_id: &str) -> String {
        let client = serde_json::Value::String(client_id.to_string()).to_string();
        let separator = HASH_INPUT_SEPARATOR.to_string();

        std::iter::once(self.salt())
            .chain(self.alternatives.iter().map(|a| a.name.as_str()))
            .chain(std::iter::once(client.as_str()))
            .collect::<Vec<_>>()
            .join(&separator)
    }

    /// Select an alternative for a normalized point in [0, 1)
    ///
    /// Scales the point by the total weight and walks the alternatives in
    /// order, subtracting each weight until the remainder is no longer positive.
    pub fn alternative_for_point(&self, point01: f64) -> &Alternative {
        let mut point = self.total_weight() as f64 * point01;

        for alternative in &self.alternatives {
            point -= f64::from(alternative.weight);

            if point <= 0.0 {
                return alternative;
            }
        }

        warn!(
            experiment = %self.name,
            point01 = point01,
            "Weighted walk exhausted alternatives, using last alternative"
        );

        &self.alternatives[self.alternatives.len() - 1]
    }
}

impl StorageEntity for Experiment {
    fn entity_type(&self) -> EntityType {
        EntityType::Experiment
    }

    fn storage_key(&self) -> &str {
        &self.name
    }
}
