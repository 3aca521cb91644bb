//! Infrastructure layer - Storage adapters, bucketing, statistics and services

pub mod experiment;
pub mod logging;
pub mod services;
pub mod storage;
