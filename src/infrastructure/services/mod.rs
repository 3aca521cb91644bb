//! Infrastructure services

mod participation_service;

pub use participation_service::ParticipationService;
