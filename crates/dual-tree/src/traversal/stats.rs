//! Counters describing the work done by a traversal.

use core::{fmt, iter::Sum, ops::AddAssign};

use serde::{Deserialize, Serialize};

/// Counters describing the work done by a traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalStats {
    /// The number of node pairs visited.
    pub pair_visits: usize,
    /// The number of node pairs pruned.
    pub prunes: usize,
    /// The number of exhaustive leaf-leaf comparisons.
    pub base_cases: usize,
    /// The number of node pairs resolved by random sampling.
    pub samples: usize,
    /// The number of point pairs compared while sampling.
    pub sampled_pairs: usize,
    /// The total number of point-to-point distances computed.
    pub distance_evaluations: usize,
}

impl TraversalStats {
    /// All counters at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pair_visits: 0,
            prunes: 0,
            base_cases: 0,
            samples: 0,
            sampled_pairs: 0,
            distance_evaluations: 0,
        }
    }
}

impl AddAssign for TraversalStats {
    fn add_assign(&mut self, rhs: Self) {
        self.pair_visits += rhs.pair_visits;
        self.prunes += rhs.prunes;
        self.base_cases += rhs.base_cases;
        self.samples += rhs.samples;
        self.sampled_pairs += rhs.sampled_pairs;
        self.distance_evaluations += rhs.distance_evaluations;
    }
}

impl Sum for TraversalStats {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::new(), |mut acc, s| {
            acc += s;
            acc
        })
    }
}

impl fmt::Display for TraversalStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pair visits, {} prunes, {} base cases, {} samples ({} pairs), {} distance evaluations",
            self.pair_visits, self.prunes, self.base_cases, self.samples, self.sampled_pairs, self.distance_evaluations
        )
    }
}

#[cfg(test)]
mod tests {
    use super::TraversalStats;

    #[test]
    fn sum_adds_every_counter() {
        let a = TraversalStats {
            pair_visits: 3,
            prunes: 1,
            base_cases: 2,
            samples: 0,
            sampled_pairs: 0,
            distance_evaluations: 10,
        };
        let b = TraversalStats {
            samples: 1,
            sampled_pairs: 4,
            ..a
        };
        let total = [a, b].into_iter().sum::<TraversalStats>();
        assert_eq!(total.pair_visits, 6);
        assert_eq!(total.samples, 1);
        assert_eq!(total.sampled_pairs, 4);
        assert_eq!(total.distance_evaluations, 20);
    }
}
