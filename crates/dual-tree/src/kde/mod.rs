//! Kernel sums between two trees, with finite-difference pruning.
//!
//! For every query point `q` the traversal estimates
//! `sum_r w_r K(d(q, r))` over all reference points `r` with weights `w_r`.
//! A pair of nodes is pruned when replacing the contribution of every
//! reference point by the midpoint of its possible range keeps the
//! accumulated error of every query point below `relative_error` times its
//! lower bound. Each query point gets a lower bound, an estimate and an
//! upper bound, and the estimate is within `relative_error` of the true sum.

mod kernel;
mod rules;

pub use kernel::{Epanechnikov, Gaussian, Kernel};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    dataset::{PointSet, Weighted},
    traversal::{self, DualTreeTraversal, TraversalStats},
    utils, BoundingVolume, Metric, Node, Permutation, Result, Tree, TreeError,
};

use rules::{Delta, KdeRules};

/// Parameters for a kernel sum.
///
/// # Example
///
/// ```rust
/// use dual_tree::{kde::{Gaussian, KernelSum}, metric::Euclidean, KdTree, PointSet, TreeBuilder};
///
/// let rows = (0..200).map(|i| [f64::from(i % 20), f64::from(i / 20)]).collect::<Vec<_>>();
/// let tree: KdTree = KdTree::new(PointSet::from_rows(&rows).unwrap(), Euclidean, &TreeBuilder::new(8)).unwrap();
/// let kernel = Gaussian::new(2.0).unwrap();
///
/// let sums = KernelSum::new(0.01).sum(&tree, &tree, &kernel).unwrap();
/// for i in 0..sums.len() {
///     assert!(sums.lower()[i] <= sums.estimate()[i] && sums.estimate()[i] <= sums.upper()[i]);
/// }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KernelSum {
    /// The allowed relative error of every estimate.
    relative_error: f64,
}

impl KernelSum {
    /// A kernel sum with the given relative error, in `[0, 1)`.
    #[must_use]
    pub const fn new(relative_error: f64) -> Self {
        Self { relative_error }
    }

    /// Sets the allowed relative error.
    #[must_use]
    pub const fn with_relative_error(mut self, relative_error: f64) -> Self {
        self.relative_error = relative_error;
        self
    }

    /// The allowed relative error.
    #[must_use]
    pub const fn relative_error(&self) -> f64 {
        self.relative_error
    }

    /// Computes the kernel sum of every query point over the reference
    /// points.
    ///
    /// Reference points are weighted by their payload. Monochromatic sums
    /// include each point's contribution to itself.
    ///
    /// # Arguments
    ///
    /// * `query` - The tree over the query points.
    /// * `reference` - The tree over the weighted reference points. Its
    ///   metric is used for all distances.
    /// * `kernel` - The kernel.
    ///
    /// # Returns
    ///
    /// The bounds and estimate of every query point, in tree order.
    ///
    /// # Errors
    ///
    /// * If the relative error is outside `[0, 1)`.
    /// * If any reference weight is negative or not finite.
    /// * If the trees have different dimensionality.
    /// * `Unimplemented` if the kernel is not monotone or does not support
    ///   the metric.
    pub fn sum<B: BoundingVolume, M: Metric, P, Q: Weighted>(
        &self,
        query: &Tree<B, M, P>,
        reference: &Tree<B, M, Q>,
        kernel: &dyn Kernel,
    ) -> Result<PerQueryBoundedSum> {
        let prefix_weights = self.validate(query, reference, kernel)?;
        let (sums, stats) = self.traverse(query.root(), query, reference, kernel, &prefix_weights);
        self.log_summary(kernel, &stats);
        Ok(PerQueryBoundedSum::from_sums(sums, stats))
    }

    /// Parallel version of [`KernelSum::sum`].
    ///
    /// # Errors
    ///
    /// See [`KernelSum::sum`].
    pub fn par_sum<B: BoundingVolume, M: Metric, P: Send + Sync, Q: Weighted + Send + Sync>(
        &self,
        query: &Tree<B, M, P>,
        reference: &Tree<B, M, Q>,
        kernel: &dyn Kernel,
    ) -> Result<PerQueryBoundedSum> {
        let prefix_weights = self.validate(query, reference, kernel)?;
        let parts = traversal::parallel_frontier(query.root())
            .into_par_iter()
            .map(|root| self.traverse(root, query, reference, kernel, &prefix_weights))
            .collect::<Vec<_>>();

        let mut sums = Vec::with_capacity(query.len());
        let mut stats = TraversalStats::new();
        for (part, part_stats) in parts {
            sums.extend(part);
            stats += part_stats;
        }
        self.log_summary(kernel, &stats);
        Ok(PerQueryBoundedSum::from_sums(sums, stats))
    }

    /// Checks the arguments and returns the prefix sums of the reference
    /// weights.
    fn validate<B, M: Metric, P, Q: Weighted>(
        &self,
        query: &Tree<B, M, P>,
        reference: &Tree<B, M, Q>,
        kernel: &dyn Kernel,
    ) -> Result<Vec<f64>> {
        traversal::check_relative_error(self.relative_error)?;
        traversal::check_dims(query.points(), reference.points())?;
        if !kernel.is_monotone() {
            return Err(TreeError::Unimplemented(format!(
                "kernel sums need a non-increasing kernel, and {} is not",
                kernel.name()
            )));
        }
        if !kernel.supports_metric(reference.metric().name()) {
            return Err(TreeError::Unimplemented(format!(
                "the {} kernel cannot be used with the {} metric",
                kernel.name(),
                reference.metric().name()
            )));
        }
        prefix_weights(reference.points())
    }

    /// Runs one traversal of the query sub-tree rooted at `root`.
    fn traverse<B: BoundingVolume, M: Metric, P, Q: Weighted>(
        &self,
        root: &Node<B>,
        query: &Tree<B, M, P>,
        reference: &Tree<B, M, Q>,
        kernel: &dyn Kernel,
        prefix_weights: &[f64],
    ) -> (Vec<Delta>, TraversalStats) {
        let mut rules = KdeRules::new(
            query.points(),
            reference.points(),
            reference.metric(),
            kernel,
            self.relative_error,
            prefix_weights,
            root,
        );
        let stats = DualTreeTraversal::new(reference.metric()).run(root, reference.root(), &mut rules);
        (rules.finish(root), stats)
    }

    /// Logs the counters of a finished sum.
    fn log_summary(&self, kernel: &dyn Kernel, stats: &TraversalStats) {
        ftlog::debug!(
            "{} kernel sum with relative error {}: {stats}",
            kernel.name(),
            self.relative_error
        );
    }
}

/// Computes the kernel sum of every query point with the given relative
/// error, in tree order.
///
/// # Errors
///
/// See [`KernelSum::sum`].
pub fn dual_tree_sum<B: BoundingVolume, M: Metric, P, Q: Weighted>(
    query: &Tree<B, M, P>,
    reference: &Tree<B, M, Q>,
    kernel: &dyn Kernel,
    relative_error: f64,
) -> Result<PerQueryBoundedSum> {
    KernelSum::new(relative_error).sum(query, reference, kernel)
}

/// Prefix sums of the weights of `points`, with a leading zero.
fn prefix_weights<Q: Weighted>(points: &PointSet<Q>) -> Result<Vec<f64>> {
    let mut prefix = Vec::with_capacity(points.len() + 1);
    prefix.push(0.0);
    let mut total = 0.0;
    for (i, payload) in points.payloads().iter().enumerate() {
        let w = payload.weight();
        if !utils::is_non_negative(w) {
            return Err(TreeError::invalid(format!(
                "reference weights must be non-negative and finite, but point {i} has weight {w}"
            )));
        }
        total += w;
        prefix.push(total);
    }
    Ok(prefix)
}

/// The bounded kernel sum of every query point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerQueryBoundedSum {
    /// Lower bounds on the sums.
    lower: Vec<f64>,
    /// The estimated sums.
    estimate: Vec<f64>,
    /// Upper bounds on the sums.
    upper: Vec<f64>,
    /// The counters of the traversal.
    stats: TraversalStats,
}

impl PerQueryBoundedSum {
    /// Unpacks the running sums of a finished traversal.
    fn from_sums(sums: Vec<Delta>, stats: TraversalStats) -> Self {
        let mut lower = Vec::with_capacity(sums.len());
        let mut estimate = Vec::with_capacity(sums.len());
        let mut upper = Vec::with_capacity(sums.len());
        for s in sums {
            // Rounding can move the bounds past the estimate by a few ulps.
            lower.push(s.lower.min(s.estimate));
            estimate.push(s.estimate);
            upper.push(s.upper.max(s.estimate));
        }
        Self {
            lower,
            estimate,
            upper,
            stats,
        }
    }

    /// The lower bounds, in tree order.
    #[must_use]
    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    /// The estimates, in tree order.
    #[must_use]
    pub fn estimate(&self) -> &[f64] {
        &self.estimate
    }

    /// The upper bounds, in tree order.
    #[must_use]
    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// The number of query points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.estimate.len()
    }

    /// Whether there are no query points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.estimate.is_empty()
    }

    /// The counters of the traversal.
    #[must_use]
    pub const fn stats(&self) -> &TraversalStats {
        &self.stats
    }

    /// Consumes the sums, returning `(lower, estimate, upper)` indexed by the
    /// original index of each query point.
    ///
    /// # Errors
    ///
    /// * If `query` does not have one entry per query point.
    pub fn into_original_order(self, query: &Permutation) -> Result<(Vec<f64>, Vec<f64>, Vec<f64>)> {
        Ok((
            query.to_original(self.lower)?,
            query.to_original(self.estimate)?,
            query.to_original(self.upper)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::approx_eq;

    use crate::{metric::Euclidean, KdTree, PointSet, TreeBuilder, TreeError};

    use super::{prefix_weights, Epanechnikov, Gaussian, Kernel, KernelSum};

    /// A kernel that grows with distance.
    struct Growing;

    impl Kernel for Growing {
        fn evaluate(&self, distance: f64) -> f64 {
            distance
        }

        fn name(&self) -> &str {
            "growing"
        }

        fn is_monotone(&self) -> bool {
            false
        }
    }

    fn line(n: u32) -> KdTree {
        let rows = (0..n).map(|i| [f64::from(i)]).collect::<Vec<_>>();
        KdTree::new(PointSet::from_rows(&rows).unwrap(), Euclidean, &TreeBuilder::new(4)).unwrap()
    }

    #[test]
    fn exact_sum_on_a_line() {
        let tree = line(50);
        let kernel = Epanechnikov::new(3.0).unwrap();
        let sums = KernelSum::new(0.0).sum(&tree, &tree, &kernel).unwrap();
        for (i, p) in tree.points().iter().enumerate() {
            let expected = tree.points().iter().map(|r| kernel.evaluate((p[0] - r[0]).abs())).sum::<f64>();
            assert!(approx_eq!(f64, sums.estimate()[i], expected, epsilon = 1e-9));
        }
        // Far away pairs contribute exactly zero and are pruned.
        assert!(sums.stats().prunes > 0);
    }

    #[test]
    fn weights_prefix() {
        let points = PointSet::new(1, vec![0.0, 1.0, 2.0]).unwrap().with_payload(vec![1.0, 0.5, 2.0]).unwrap();
        assert_eq!(prefix_weights(&points).unwrap(), vec![0.0, 1.0, 1.5, 3.5]);

        let points = PointSet::new(1, vec![0.0, 1.0]).unwrap().with_payload(vec![1.0, -0.5]).unwrap();
        assert!(prefix_weights(&points).is_err());
    }

    #[test]
    fn rejects_bad_arguments() {
        let tree = line(10);
        let kernel = Gaussian::new(1.0).unwrap();
        assert!(matches!(
            KernelSum::new(1.0).sum(&tree, &tree, &kernel),
            Err(TreeError::InvalidArgument(_))
        ));
        assert!(matches!(
            KernelSum::new(0.1).sum(&tree, &tree, &Growing),
            Err(TreeError::Unimplemented(_))
        ));
    }
}
