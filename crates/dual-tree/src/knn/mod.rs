//! Exact and approximate k-nearest-neighbor search between two trees.
//!
//! With a relative error `e`, the reported `k`-th neighbor distance of every
//! query point is at most `1 + e` times the true one. With `e = 0` the search
//! is exact.

mod neighbors;
mod results;
mod rules;

pub use neighbors::NeighborList;
pub use results::PerQueryResults;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    traversal::{self, DualTreeTraversal, TraversalStats},
    BoundingVolume, Metric, Node, Result, Tree, TreeError,
};

use rules::KnnRules;

/// Parameters for a k-nearest-neighbor search.
///
/// # Example
///
/// ```rust
/// use dual_tree::{knn::KnnSearch, metric::Euclidean, KdTree, PointSet, TreeBuilder};
///
/// let points = PointSet::from_rows(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [5.0, 5.0], [5.0, 6.0]]).unwrap();
/// let tree: KdTree = KdTree::new(points, Euclidean, &TreeBuilder::new(1)).unwrap();
///
/// // A monochromatic search: nobody is their own neighbor.
/// let results = KnnSearch::new(1).search(&tree, &tree).unwrap();
/// let neighbors = results.into_original_order(tree.permutation(), tree.permutation()).unwrap();
///
/// assert_eq!(neighbors[0][0].1, 1.0);
/// assert_eq!(neighbors[3], vec![(4, 1.0)]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KnnSearch {
    /// The number of neighbors to find.
    k: usize,
    /// The allowed relative error of the reported distances.
    relative_error: f64,
}

impl Default for KnnSearch {
    fn default() -> Self {
        Self::new(1)
    }
}

impl KnnSearch {
    /// An exact search for `k` neighbors.
    #[must_use]
    pub const fn new(k: usize) -> Self {
        Self { k, relative_error: 0.0 }
    }

    /// Sets the number of neighbors.
    #[must_use]
    pub const fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Sets the allowed relative error, in `[0, 1)`.
    #[must_use]
    pub const fn with_relative_error(mut self, relative_error: f64) -> Self {
        self.relative_error = relative_error;
        self
    }

    /// The number of neighbors.
    #[must_use]
    pub const fn k(&self) -> usize {
        self.k
    }

    /// The allowed relative error.
    #[must_use]
    pub const fn relative_error(&self) -> f64 {
        self.relative_error
    }

    /// Finds the `k` nearest reference points of every query point.
    ///
    /// If `query` and `reference` are the same tree, a point is never
    /// reported as its own neighbor.
    ///
    /// # Arguments
    ///
    /// * `query` - The tree over the query points.
    /// * `reference` - The tree over the reference points. Its metric is
    ///   used for all distances.
    ///
    /// # Returns
    ///
    /// The neighbors of every query point, in the tree order of the query
    /// points, with reference indices in the tree order of the reference
    /// points.
    ///
    /// # Errors
    ///
    /// * If `k` is zero or exceeds the number of candidate neighbors.
    /// * If the relative error is outside `[0, 1)`.
    /// * If the two trees have different dimensionality.
    pub fn search<B: BoundingVolume, M: Metric, P, Q>(
        &self,
        query: &Tree<B, M, P>,
        reference: &Tree<B, M, Q>,
    ) -> Result<PerQueryResults> {
        let exclude_self = self.validate(query, reference)?;
        let (neighbors, stats) = self.traverse(query.root(), query, reference, exclude_self);
        self.log_summary(&stats);
        Ok(PerQueryResults::new(neighbors, stats))
    }

    /// Parallel version of [`KnnSearch::search`].
    ///
    /// The query tree is cut into disjoint sub-trees which are traversed
    /// against the full reference tree in parallel.
    ///
    /// # Errors
    ///
    /// See [`KnnSearch::search`].
    pub fn par_search<B: BoundingVolume, M: Metric, P: Send + Sync, Q: Send + Sync>(
        &self,
        query: &Tree<B, M, P>,
        reference: &Tree<B, M, Q>,
    ) -> Result<PerQueryResults> {
        let exclude_self = self.validate(query, reference)?;
        let parts = traversal::parallel_frontier(query.root())
            .into_par_iter()
            .map(|root| self.traverse(root, query, reference, exclude_self))
            .collect::<Vec<_>>();

        let mut neighbors = Vec::with_capacity(query.len());
        let mut stats = TraversalStats::new();
        for (part, part_stats) in parts {
            neighbors.extend(part);
            stats += part_stats;
        }
        self.log_summary(&stats);
        Ok(PerQueryResults::new(neighbors, stats))
    }

    /// Checks the arguments. Returns whether the search is monochromatic.
    fn validate<B, M, P, Q>(&self, query: &Tree<B, M, P>, reference: &Tree<B, M, Q>) -> Result<bool> {
        traversal::check_relative_error(self.relative_error)?;
        traversal::check_dims(query.points(), reference.points())?;

        let exclude_self = traversal::same_buffer(query.points().coords(), reference.points().coords());
        let candidates = if exclude_self {
            reference.len() - 1
        } else {
            reference.len()
        };
        if self.k == 0 || self.k > candidates {
            return Err(TreeError::invalid(format!(
                "k must be in 1..={candidates} for this search, got {}",
                self.k
            )));
        }
        Ok(exclude_self)
    }

    /// Runs one traversal of the query sub-tree rooted at `root`.
    fn traverse<B: BoundingVolume, M: Metric, P, Q>(
        &self,
        root: &Node<B>,
        query: &Tree<B, M, P>,
        reference: &Tree<B, M, Q>,
        exclude_self: bool,
    ) -> (Vec<Vec<(usize, f64)>>, TraversalStats) {
        let mut rules = KnnRules::new(
            query.points(),
            reference.points(),
            reference.metric(),
            root,
            self.k,
            self.relative_error,
            exclude_self,
        );
        let stats = DualTreeTraversal::new(reference.metric()).run(root, reference.root(), &mut rules);
        (rules.into_neighbors(), stats)
    }

    /// Logs the counters of a finished search.
    fn log_summary(&self, stats: &TraversalStats) {
        ftlog::debug!(
            "{}-NN search with relative error {}: {stats}",
            self.k,
            self.relative_error
        );
    }
}
