//! Experiment result types for counters and statistical reporting

use std::fmt;

use serde::{Serialize, Serializer};

// ============================================================================
// AlternativeCounts
// ============================================================================

/// Persisted counters of one alternative
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AlternativeCounts {
    /// Number of recorded participations
    pub participants: u64,
    /// Number of recorded completions
    pub completed: u64,
}

impl AlternativeCounts {
    /// Create counts from raw values
    pub fn new(participants: u64, completed: u64) -> Self {
        Self {
            participants,
            completed,
        }
    }

    /// `completed / participants`, or 0 when nobody participated
    ///
    /// Completions are counted independently of participations, so the
    /// result may exceed 1 if callers complete more often than they participate.
    pub fn conversion_rate(&self) -> f64 {
        if self.participants == 0 {
            0.0
        } else {
            self.completed as f64 / self.participants as f64
        }
    }
}

// ============================================================================
// ConfidenceLevel
// ============================================================================

/// Significance tier derived from the magnitude of a z-score
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfidenceLevel {
    /// The z-score is zero: no measurable change
    NoChange,
    /// The z-score could not be computed (not a number)
    NotAvailable,
    /// Below the 90% threshold
    NoConfidence,
    /// Confidence percentage (90, 95, 99 or 99.9)
    Percent(f64),
}

impl ConfidenceLevel {
    /// Numeric confidence; `None` for no change or an undefined score
    pub fn as_percent(&self) -> Option<f64> {
        match self {
            Self::NoChange | Self::NotAvailable => None,
            Self::NoConfidence => Some(0.0),
            Self::Percent(p) => Some(*p),
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoChange => write!(f, "no change"),
            Self::NotAvailable => write!(f, "N/A"),
            Self::NoConfidence => write!(f, "no confidence"),
            Self::Percent(p) => write!(f, "{}% confidence", p),
        }
    }
}

impl Serialize for ConfidenceLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_percent().serialize(serializer)
    }
}

// ============================================================================
// AlternativeStatistics
// ============================================================================

/// Reporting row for one alternative
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternativeStatistics {
    /// Alternative name
    pub name: String,
    /// Participation counter
    pub participant_count: u64,
    /// Completion counter
    pub completed_count: u64,
    /// Completion over participation
    pub conversion_rate: f64,
    /// Two-proportion z-score against the control
    pub z_score: f64,
    /// Confidence tier of the z-score
    pub confidence_level: ConfidenceLevel,
    /// Human-readable confidence tier
    pub confidence_level_string: String,
}

impl AlternativeStatistics {
    /// Assemble a reporting row
    pub fn new(
        name: impl Into<String>,
        counts: AlternativeCounts,
        z_score: f64,
        confidence_level: ConfidenceLevel,
    ) -> Self {
        Self {
            name: name.into(),
            participant_count: counts.participants,
            completed_count: counts.completed,
            conversion_rate: counts.conversion_rate(),
            z_score,
            confidence_level,
            confidence_level_string: confidence_level.to_string(),
        }
    }
}
