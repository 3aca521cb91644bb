//! Visitor domain - caller context and exclusion policy

mod context;
mod exclusion;

pub use context::VisitorContext;
pub use exclusion::{VisitorFilter, DEFAULT_ROBOT_PATTERN};
