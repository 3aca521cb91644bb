//! PMP Split
//!
//! Deterministic split and multivariate testing with support for:
//! - Weighted alternatives bucketed by a salted SHA-256 hash of the client id
//! - Forced winners and visitor exclusion (robots, ignored IP addresses)
//! - Two-proportion z-test statistics against the control
//! - In-memory, Redis and PostgreSQL storage backends

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::{
    AlternativeStatistics, ConfidenceLevel, DomainError, Experiment, Storage, VisitorContext,
    VisitorFilter,
};
pub use infrastructure::services::ParticipationService;
pub use infrastructure::storage::{StorageConfig, StorageFactory};
