//! Rank-approximate nearest-neighbor search.
//!
//! Instead of the true nearest neighbors, a rank-approximate search returns,
//! with probability at least `1 - alpha`, neighbors that are among the true
//! `r + k` nearest, where the rank tolerance `r` is a percentage of the
//! reference set. Reference nodes are either pruned by distance, compared
//! exhaustively, or replaced by a uniform random sample, and a query node
//! stops looking once every one of its points has accounted for enough
//! samples.

mod rules;
mod sampler;

pub use sampler::{
    failure_probability, failure_probability_k, hoeffding_sample_size, minimum_sample_size,
    RankApproximationSampler,
};

use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    knn::PerQueryResults,
    traversal::{self, DualTreeTraversal, TraversalStats},
    BoundingVolume, Metric, Node, Result, Tree, TreeError,
};

use rules::RankApproxRules;

/// Parameters for a rank-approximate k-nearest-neighbor search.
///
/// # Example
///
/// ```rust
/// use dual_tree::{metric::Euclidean, rank_approx::RankApproxSearch, KdTree, PointSet, TreeBuilder};
/// use rand::{rngs::StdRng, SeedableRng};
///
/// let rows = (0..2000).map(|i| [f64::from(i % 50), f64::from(i / 50)]).collect::<Vec<_>>();
/// let tree: KdTree = KdTree::new(PointSet::from_rows(&rows).unwrap(), Euclidean, &TreeBuilder::new(10)).unwrap();
///
/// let search = RankApproxSearch::new(1).with_rank_tolerance_percent(5.0).with_alpha(0.05);
/// let mut rng = StdRng::seed_from_u64(42);
/// let results = search.search(&tree, &tree, &mut rng).unwrap();
///
/// assert_eq!(results.len(), 2000);
/// assert!(results.neighbors().iter().all(|hits| hits.len() == 1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankApproxSearch {
    /// The number of neighbors to find.
    k: usize,
    /// The rank tolerance as a percentage of the reference set.
    rank_tolerance_percent: f64,
    /// The allowed failure probability.
    alpha: f64,
    /// The largest number of points sampled from one reference node.
    sample_limit: usize,
}

impl Default for RankApproxSearch {
    fn default() -> Self {
        Self {
            k: 1,
            rank_tolerance_percent: 5.0,
            alpha: 0.05,
            sample_limit: 20,
        }
    }
}

impl RankApproxSearch {
    /// A search for `k` neighbors with the default tolerance, failure
    /// probability and sample limit.
    #[must_use]
    pub fn new(k: usize) -> Self {
        Self {
            k,
            ..Self::default()
        }
    }

    /// Sets the number of neighbors.
    #[must_use]
    pub const fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Sets the rank tolerance, as a percentage of the reference set in
    /// `[0, 100)`.
    #[must_use]
    pub const fn with_rank_tolerance_percent(mut self, rank_tolerance_percent: f64) -> Self {
        self.rank_tolerance_percent = rank_tolerance_percent;
        self
    }

    /// Sets the allowed failure probability, in `(0, 1)`.
    #[must_use]
    pub const fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the largest number of points sampled from one reference node.
    #[must_use]
    pub const fn with_sample_limit(mut self, sample_limit: usize) -> Self {
        self.sample_limit = sample_limit;
        self
    }

    /// The number of neighbors.
    #[must_use]
    pub const fn k(&self) -> usize {
        self.k
    }

    /// The rank tolerance percentage.
    #[must_use]
    pub const fn rank_tolerance_percent(&self) -> f64 {
        self.rank_tolerance_percent
    }

    /// The allowed failure probability.
    #[must_use]
    pub const fn alpha(&self) -> f64 {
        self.alpha
    }

    /// The largest number of points sampled from one reference node.
    #[must_use]
    pub const fn sample_limit(&self) -> usize {
        self.sample_limit
    }

    /// Finds rank-approximate `k` nearest neighbors of every query point.
    ///
    /// If `query` and `reference` are the same tree, a point is never
    /// reported as its own neighbor.
    ///
    /// # Arguments
    ///
    /// * `query` - The tree over the query points.
    /// * `reference` - The tree over the reference points.
    /// * `rng` - The source of randomness for sampling.
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
    /// * If the tolerance, `alpha` or the sample limit is out of range.
    /// * If the trees have different dimensionality.
    pub fn search<B: BoundingVolume, M: Metric, P, Q, R: Rng>(
        &self,
        query: &Tree<B, M, P>,
        reference: &Tree<B, M, Q>,
        rng: &mut R,
    ) -> Result<PerQueryResults> {
        let (sampler, exclude_self) = self.prepare(query, reference)?;
        let (neighbors, stats) = self.traverse(query.root(), query, reference, &sampler, exclude_self, rng);
        self.log_summary(&sampler, &stats);
        Ok(PerQueryResults::new(neighbors, stats))
    }

    /// Parallel version of [`RankApproxSearch::search`].
    ///
    /// Every query sub-tree handed to a task samples with its own `StdRng`,
    /// seeded from `seed` and the sub-tree, so results are reproducible for
    /// a fixed seed and thread count.
    ///
    /// # Errors
    ///
    /// See [`RankApproxSearch::search`].
    pub fn par_search<B: BoundingVolume, M: Metric, P: Send + Sync, Q: Send + Sync>(
        &self,
        query: &Tree<B, M, P>,
        reference: &Tree<B, M, Q>,
        seed: u64,
    ) -> Result<PerQueryResults> {
        let (sampler, exclude_self) = self.prepare(query, reference)?;
        let parts = traversal::parallel_frontier(query.root())
            .into_par_iter()
            .map(|root| {
                let mut rng = StdRng::seed_from_u64(seed ^ (root.id() as u64));
                self.traverse(root, query, reference, &sampler, exclude_self, &mut rng)
            })
            .collect::<Vec<_>>();

        let mut neighbors = Vec::with_capacity(query.len());
        let mut stats = TraversalStats::new();
        for (part, part_stats) in parts {
            neighbors.extend(part);
            stats += part_stats;
        }
        self.log_summary(&sampler, &stats);
        Ok(PerQueryResults::new(neighbors, stats))
    }

    /// Checks the arguments and builds the sampler. Also returns whether the
    /// search is monochromatic.
    fn prepare<B, M, P, Q>(
        &self,
        query: &Tree<B, M, P>,
        reference: &Tree<B, M, Q>,
    ) -> Result<(RankApproximationSampler, bool)> {
        traversal::check_dims(query.points(), reference.points())?;
        if self.sample_limit == 0 {
            return Err(TreeError::invalid("the sample limit must be positive"));
        }

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

        let sampler = RankApproximationSampler::new(candidates, self.rank_tolerance_percent, self.alpha, self.k)?;
        Ok((sampler, exclude_self))
    }

    /// Runs one traversal of the query sub-tree rooted at `root`.
    fn traverse<B: BoundingVolume, M: Metric, P, Q, R: Rng>(
        &self,
        root: &Node<B>,
        query: &Tree<B, M, P>,
        reference: &Tree<B, M, Q>,
        sampler: &RankApproximationSampler,
        exclude_self: bool,
        rng: &mut R,
    ) -> (Vec<Vec<(usize, f64)>>, TraversalStats) {
        let mut rules = RankApproxRules::new(
            query.points(),
            reference.points(),
            reference.metric(),
            sampler,
            self.sample_limit,
            rng,
            root,
            exclude_self,
        );
        let stats = DualTreeTraversal::new(reference.metric()).run(root, reference.root(), &mut rules);
        (rules.into_neighbors(), stats)
    }

    /// Logs the counters of a finished search.
    fn log_summary(&self, sampler: &RankApproximationSampler, stats: &TraversalStats) {
        ftlog::debug!(
            "Rank-approximate {}-NN search (rank {} of {}, alpha {}, {} samples): {stats}",
            self.k,
            sampler.target_rank(),
            sampler.set_size(),
            self.alpha,
            sampler.min_samples()
        );
    }
}

/// Finds rank-approximate `k` nearest neighbors of every query point.
///
/// # Errors
///
/// See [`RankApproxSearch::search`].
#[allow(clippy::too_many_arguments)]
pub fn search_approx<B: BoundingVolume, M: Metric, P, Q, R: Rng>(
    query: &Tree<B, M, P>,
    reference: &Tree<B, M, Q>,
    k: usize,
    rank_tolerance_percent: f64,
    alpha: f64,
    sample_limit: usize,
    rng: &mut R,
) -> Result<PerQueryResults> {
    RankApproxSearch::new(k)
        .with_rank_tolerance_percent(rank_tolerance_percent)
        .with_alpha(alpha)
        .with_sample_limit(sample_limit)
        .search(query, reference, rng)
}
