//! Per-query neighbor lists returned by the searches.

use serde::{Deserialize, Serialize};

use crate::{traversal::TraversalStats, Permutation, Result};

/// The neighbors found for every query point.
///
/// Query points and reference indices are both in tree order. Use
/// [`PerQueryResults::into_original_order`] to translate both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerQueryResults {
    /// `(reference index, distance)` pairs of every query point, nearest
    /// first.
    neighbors: Vec<Vec<(usize, f64)>>,
    /// The counters of the traversal that produced the results.
    stats: TraversalStats,
}

impl PerQueryResults {
    /// Bundles neighbor lists with the counters that produced them.
    pub(crate) fn new(neighbors: Vec<Vec<(usize, f64)>>, stats: TraversalStats) -> Self {
        Self { neighbors, stats }
    }

    /// The neighbors of every query point, in tree order.
    #[must_use]
    pub fn neighbors(&self) -> &[Vec<(usize, f64)>] {
        &self.neighbors
    }

    /// The neighbors of the query point at tree position `index`.
    #[must_use]
    pub fn neighbors_of(&self, index: usize) -> &[(usize, f64)] {
        &self.neighbors[index]
    }

    /// The number of query points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    /// Whether there are no query points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// The counters of the traversal.
    #[must_use]
    pub const fn stats(&self) -> &TraversalStats {
        &self.stats
    }

    /// Consumes the results, returning the neighbor lists in tree order.
    #[must_use]
    pub fn into_neighbors(self) -> Vec<Vec<(usize, f64)>> {
        self.neighbors
    }

    /// Consumes the results, returning the neighbor lists indexed by the
    /// original index of each query point and holding original reference
    /// indices.
    ///
    /// # Errors
    ///
    /// * If `query` does not have one entry per query point.
    pub fn into_original_order(self, query: &Permutation, reference: &Permutation) -> Result<Vec<Vec<(usize, f64)>>> {
        let translated = self
            .neighbors
            .into_iter()
            .map(|hits| {
                hits.into_iter()
                    .map(|(r, d)| (reference.original_index(r), d))
                    .collect()
            })
            .collect();
        query.to_original(translated)
    }
}

#[cfg(test)]
mod tests {
    use crate::{traversal::TraversalStats, Permutation};

    use super::PerQueryResults;

    #[test]
    fn original_order_translates_both_sides() {
        // Query tree order [b, a], reference tree order [y, z, x].
        let query = Permutation::from_old_from_new(vec![1, 0]).unwrap();
        let reference = Permutation::from_old_from_new(vec![1, 2, 0]).unwrap();
        let results = PerQueryResults::new(vec![vec![(0, 1.0)], vec![(2, 2.0), (1, 3.0)]], TraversalStats::new());

        let original = results.into_original_order(&query, &reference).unwrap();
        assert_eq!(original, vec![vec![(0, 2.0), (2, 3.0)], vec![(1, 1.0)]]);
    }
}
