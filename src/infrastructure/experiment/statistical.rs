//! Statistical analysis functions for split testing
//!
//! Provides a two-proportion z-test of each alternative against the control
//! and maps the score onto fixed confidence tiers.

use std::cmp::Ordering;

use crate::domain::experiment::{AlternativeCounts, AlternativeStatistics, ConfidenceLevel};

/// Upper bounds of |z| and the confidence they map to, in ascending order
const Z_SCORE_CONFIDENCE_LEVELS: [(f64, Option<f64>); 6] = [
    (0.0, None),
    (1.64, Some(0.0)),
    (1.96, Some(90.0)),
    (2.57, Some(95.0)),
    (3.29, Some(99.0)),
    (f64::INFINITY, Some(99.9)),
];

/// Two-proportion z-score of an alternative against the control
///
/// Returns 0 when there is no signal: the alternative is the control, either
/// side has no participants, or the combined variance is zero. A NaN result
/// is possible when completions exceed participations.
pub fn z_score(alternative: AlternativeCounts, control: AlternativeCounts, is_control: bool) -> f64 {
    if is_control || alternative.participants == 0 || control.participants == 0 {
        return 0.0;
    }

    let p_alt = alternative.conversion_rate();
    let p_ctrl = control.conversion_rate();

    let variance_alt = p_alt * (1.0 - p_alt) / alternative.participants as f64;
    let variance_ctrl = p_ctrl * (1.0 - p_ctrl) / control.participants as f64;
    let variance = variance_alt + variance_ctrl;

    if variance == 0.0 {
        return 0.0;
    }

    (p_alt - p_ctrl) / variance.sqrt()
}

/// Map a z-score onto its confidence tier
///
/// The first breakpoint (ascending) whose bound is at least |z| wins.
pub fn confidence_level(z_score: f64) -> ConfidenceLevel {
    if z_score.is_nan() {
        return ConfidenceLevel::NotAvailable;
    }

    let z_abs = z_score.abs();

    let tier = Z_SCORE_CONFIDENCE_LEVELS
        .iter()
        .find(|(limit, _)| z_abs <= *limit)
        .map(|(_, confidence)| *confidence);

    match tier {
        Some(None) => ConfidenceLevel::NoChange,
        Some(Some(p)) if p == 0.0 => ConfidenceLevel::NoConfidence,
        Some(Some(p)) => ConfidenceLevel::Percent(p),
        None => ConfidenceLevel::NotAvailable,
    }
}

/// Build reporting rows for alternatives, most significant first
///
/// `rows` holds each alternative's name, counts and whether it is the control,
/// in experiment order. Ties keep experiment order; NaN scores sort last.
pub fn calculate_statistics(
    rows: &[(String, AlternativeCounts, bool)],
    control: AlternativeCounts,
) -> Vec<AlternativeStatistics> {
    let mut results: Vec<AlternativeStatistics> = rows
        .iter()
        .map(|(name, counts, is_control)| {
            let z = z_score(*counts, control, *is_control);
            AlternativeStatistics::new(name.clone(), *counts, z, confidence_level(z))
        })
        .collect();

    results.sort_by(|a, b| sort_key(b.z_score).total_cmp(&sort_key(a.z_score)));

    results
}

fn sort_key(z: f64) -> f64 {
    if z.is_nan() { f64::NEG_INFINITY } else { z }
}

/// Compare two tiers by strength; undefined tiers rank lowest
pub fn compare_confidence(a: ConfidenceLevel, b: ConfidenceLevel) -> Ordering {
    let rank = |level: ConfidenceLevel| match level {
        ConfidenceLevel::NotAvailable => -2.0,
        ConfidenceLevel::NoChange => -1.0,
        other => other.as_percent().unwrap_or(0.0),
    };

    rank(a).total_cmp(&rank(b))
}
