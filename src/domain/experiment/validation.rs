//! Experiment validation utilities

use thiserror::Error;

use crate::domain::DomainError;

/// Maximum length for experiment and alternative names
pub const MAX_NAME_LENGTH: usize = 128;

/// Separator of the persisted alternative list
pub const LIST_SEPARATOR: char = '|';

/// Separator of the composite alternative key
pub const KEY_SEPARATOR: char = ':';

/// Validation errors for experiments and alternatives
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExperimentValidationError {
    #[error("Experiment name cannot be empty")]
    EmptyName,

    #[error("Experiment name exceeds maximum length of {0} characters")]
    NameTooLong(usize),

    #[error("Experiment name contains reserved character: '{0}'")]
    ReservedNameCharacter(char),

    #[error("Alternative name cannot be empty")]
    EmptyAlternativeName,

    #[error("Alternative name exceeds maximum length of {0} characters")]
    AlternativeNameTooLong(usize),

    #[error("Alternative name contains reserved character: '{0}'")]
    ReservedAlternativeCharacter(char),

    #[error("Experiment must have at least one alternative")]
    NoAlternatives,

    #[error("Duplicate alternative name: '{0}'")]
    DuplicateAlternative(String),

    #[error("Alternative '{name}' has invalid weight '{weight}', must be an integer >= 1")]
    InvalidWeight { name: String, weight: String },

    #[error("Alternative '{0}' is not part of the experiment")]
    UnknownAlternative(String),
}

impl From<ExperimentValidationError> for DomainError {
    fn from(error: ExperimentValidationError) -> Self {
        DomainError::validation(error.to_string())
    }
}

fn reserved_char(name: &str) -> Option<char> {
    name.chars()
        .find(|ch| *ch == LIST_SEPARATOR || *ch == KEY_SEPARATOR)
}

/// Validate an experiment name
pub fn validate_experiment_name(name: &str) -> Result<(), ExperimentValidationError> {
    if name.is_empty() {
        return Err(ExperimentValidationError::EmptyName);
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ExperimentValidationError::NameTooLong(MAX_NAME_LENGTH));
    }

    if let Some(ch) = reserved_char(name) {
        return Err(ExperimentValidationError::ReservedNameCharacter(ch));
    }

    Ok(())
}

/// Validate an alternative name
pub fn validate_alternative_name(name: &str) -> Result<(), ExperimentValidationError> {
    if name.is_empty() {
        return Err(ExperimentValidationError::EmptyAlternativeName);
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ExperimentValidationError::AlternativeNameTooLong(
            MAX_NAME_LENGTH,
        ));
    }

    if let Some(ch) = reserved_char(name) {
        return Err(ExperimentValidationError::ReservedAlternativeCharacter(ch));
    }

    Ok(())
}

/// Parse an alternative declaration of the form `name` or `name=weight`
pub fn parse_alternative_declaration(
    declaration: &str,
) -> Result<(String, u32), ExperimentValidationError> {
    let (name, weight) = match declaration.rsplit_once('=') {
        Some((name, raw_weight)) => {
            let weight = raw_weight
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|w| *w >= 1)
                .ok_or_else(|| ExperimentValidationError::InvalidWeight {
                    name: name.to_string(),
                    weight: raw_weight.to_string(),
                })?;
            (name.trim(), weight)
        }
        None => (declaration.trim(), 1),
    };

    validate_alternative_name(name)?;

    Ok((name.to_string(), weight))
}
