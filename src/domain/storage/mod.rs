//! Storage domain - key/field persistence port

mod entity;
mod repository;

pub use entity::{EntityType, FieldMap, StorageEntity};
pub use repository::Storage;

#[cfg(test)]
pub use repository::MockStorage;
