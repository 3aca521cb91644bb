//! Consistent hashing for experiment alternative assignment
//!
//! Ensures the same client always lands on the same alternative for a given
//! experiment salt and alternative set, across calls and process restarts.

use sha2::{Digest, Sha256};

use crate::domain::experiment::{Alternative, Experiment};

/// Number of leading hex digits of the digest used as the seed (52 bits)
const SEED_HEX_DIGITS: usize = 13;

/// Largest seed value, used to normalize the seed into [0, 1]
const SEED_SCALE: f64 = 0xF_FFFF_FFFF_FFFF_u64 as f64;

/// Consistent hasher for experiment assignments
#[derive(Debug, Clone, Copy)]
pub struct ConsistentHasher;

impl ConsistentHasher {
    /// Parse the first 13 hex digits of the SHA-256 digest of `input`
    pub fn seed(input: &str) -> u64 {
        let digest = hex::encode(Sha256::digest(input.as_bytes()));

        u64::from_str_radix(&digest[..SEED_HEX_DIGITS], 16).unwrap_or(0)
    }

    /// Normalize the seed of `input` onto the unit interval
    pub fn point(input: &str) -> f64 {
        Self::seed(input) as f64 / SEED_SCALE
    }

    /// Deterministically pick an alternative for a client, ignoring any winner
    pub fn random_alternative<'a>(experiment: &'a Experiment, client_id: &str) -> &'a Alternative {
        let point = Self::point(&experiment.hash_input(client_id));
        experiment.alternative_for_point(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn create_experiment(declarations: &[&str]) -> Experiment {
        Experiment::new("E", declarations).unwrap()
    }

    fn frequencies(experiment: &Experiment, samples: usize) -> HashMap<String, usize> {
        let mut counts = HashMap::new();

        for i in 0..samples {
            let alt = ConsistentHasher::random_alternative(experiment, &format!("client-{}", i));
            *counts.entry(alt.name().to_string()).or_insert(0) += 1;
        }

        counts
    }

    #[test]
    fn test_seed_uses_first_13_hex_digits() {
        // sha256("abc") = ba7816bf8f01cfea414140de5dae2223...
        assert_eq!(ConsistentHasher::seed("abc"), 0xba7816bf8f01c);
    }

    #[test]
    fn test_point_in_unit_interval() {
        for i in 0..1000 {
            let point = ConsistentHasher::point(&format!("input-{}", i));
            assert!((0.0..=1.0).contains(&point), "point out of range: {}", point);
        }
    }

    #[test]
    fn test_consistent_hash_same_input() {
        let p1 = ConsistentHasher::point("E|CONTROL|A|B|\"c1\"");
        let p2 = ConsistentHasher::point("E|CONTROL|A|B|\"c1\"");
        assert_eq!(p1, p2, "Same inputs should produce same point");
    }

    #[test]
    fn test_determinism_across_calls() {
        let experiment = create_experiment(&["CONTROL", "A", "B"]);
        let first = ConsistentHasher::random_alternative(&experiment, "test-client-12345");

        for _ in 0..100 {
            let alt = ConsistentHasher::random_alternative(&experiment, "test-client-12345");
            assert_eq!(alt.name(), first.name(), "Assignment should be deterministic");
        }

        // A freshly built experiment with the same definition agrees
        let rebuilt = create_experiment(&["CONTROL", "A", "B"]);
        let again = ConsistentHasher::random_alternative(&rebuilt, "test-client-12345");
        assert_eq!(again.name(), first.name());
    }

    #[test]
    fn test_salt_changes_hash_input() {
        let experiment = create_experiment(&["CONTROL", "A", "B"]);
        let salted = create_experiment(&["CONTROL", "A", "B"]).with_salt("other");

        let moved = (0..200)
            .filter(|i| {
                let client = format!("client-{}", i);
                ConsistentHasher::random_alternative(&experiment, &client).name()
                    != ConsistentHasher::random_alternative(&salted, &client).name()
            })
            .count();

        assert!(moved > 0, "A different salt should re-bucket some clients");
    }

    #[test]
    fn test_equal_weight_distribution() {
        let experiment = create_experiment(&["CONTROL", "A", "B"]);
        let counts = frequencies(&experiment, 3000);

        // Each alternative should get roughly 1000 of 3000
        for name in ["CONTROL", "A", "B"] {
            let count = counts.get(name).copied().unwrap_or(0);
            assert!(count > 850, "{} has too few clients: {}", name, count);
            assert!(count < 1150, "{} has too many clients: {}", name, count);
        }
    }

    #[test]
    fn test_weighted_distribution() {
        let experiment = create_experiment(&["CONTROL", "B=3"]);
        let counts = frequencies(&experiment, 4000);

        // Expect 25% control, 75% B
        let control = counts.get("CONTROL").copied().unwrap_or(0);
        let treatment = counts.get("B").copied().unwrap_or(0);

        assert_eq!(control + treatment, 4000);
        assert!(control > 850 && control < 1150, "control={}", control);
        assert!(treatment > 2850 && treatment < 3150, "treatment={}", treatment);
    }

    #[test]
    fn test_single_alternative_always_selected() {
        let experiment = create_experiment(&["ONLY"]);

        for i in 0..100 {
            let alt = ConsistentHasher::random_alternative(&experiment, &format!("c{}", i));
            assert_eq!(alt.name(), "ONLY");
        }
    }
}
