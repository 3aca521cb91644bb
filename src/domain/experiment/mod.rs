//! Experiment domain module for split testing
//!
//! This module provides the experiment and alternative model, the weighted
//! bucketing walk, and the result types used for significance reporting.

mod entity;
mod repository;
mod result;
mod validation;

// Re-export all public types
pub use entity::{
    Alternative, Experiment, ALTERNATIVE_NAMES_FIELD, ALTERNATIVE_WEIGHTS_FIELD,
    COMPLETED_COUNT_FIELD, HASH_INPUT_SEPARATOR, PARTICIPANT_COUNT_FIELD, SALT_FIELD,
    START_TIME_FIELD, WINNER_NAME_FIELD,
};
pub use repository::ExperimentRepository;
pub use result::{AlternativeCounts, AlternativeStatistics, ConfidenceLevel};
pub use validation::{
    parse_alternative_declaration, validate_alternative_name, validate_experiment_name,
    ExperimentValidationError, MAX_NAME_LENGTH,
};
