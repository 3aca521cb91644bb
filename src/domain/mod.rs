//! Domain layer - Core business logic and entities

pub mod error;
pub mod experiment;
pub mod storage;
pub mod visitor;

pub use error::DomainError;
pub use experiment::{
    Alternative, AlternativeCounts, AlternativeStatistics, ConfidenceLevel, Experiment,
    ExperimentRepository, ExperimentValidationError,
};
pub use storage::{EntityType, FieldMap, Storage, StorageEntity};
pub use visitor::{VisitorContext, VisitorFilter};
