//! Infrastructure layer for experiment split testing
//!
//! Provides the storage-backed repository, bucketing and statistics.

mod consistent_hashing;
mod statistical;
mod storage_repository;

pub use consistent_hashing::ConsistentHasher;
pub use statistical::{calculate_statistics, compare_confidence, confidence_level, z_score};
pub use storage_repository::StorageExperimentRepository;
