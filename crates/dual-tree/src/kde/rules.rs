//! Finite-difference pruning rules for kernel sums.

use core::ops::AddAssign;

use crate::{
    dataset::{PointSet, Weighted},
    traversal::{QueryWindow, TraversalRules},
    Metric, Node,
};

use super::Kernel;

/// Contributions to the running sums of a query point, or of every point in
/// a query node when postponed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Delta {
    /// Added to the lower bound.
    pub(crate) lower: f64,
    /// Added to the estimate.
    pub(crate) estimate: f64,
    /// Added to the upper bound. Never positive.
    pub(crate) upper: f64,
    /// The absolute error introduced into the estimate.
    pub(crate) error: f64,
    /// The reference weight resolved by pruning.
    pub(crate) pruned: f64,
}

impl AddAssign for Delta {
    fn add_assign(&mut self, rhs: Self) {
        self.lower += rhs.lower;
        self.estimate += rhs.estimate;
        self.upper += rhs.upper;
        self.error += rhs.error;
        self.pruned += rhs.pruned;
    }
}

/// The state of one kernel-sum traversal over a query window.
pub(crate) struct KdeRules<'a, P, Q, M> {
    /// The query points, in tree order.
    queries: &'a PointSet<P>,
    /// The reference points, in tree order.
    references: &'a PointSet<Q>,
    /// The metric.
    metric: &'a M,
    /// The kernel.
    kernel: &'a dyn Kernel,
    /// The relative error tolerance.
    tolerance: f64,
    /// The kernel at distance zero.
    k_zero: f64,
    /// The total reference weight.
    total_weight: f64,
    /// Prefix sums of the reference weights, in tree order.
    prefix_weights: &'a [f64],
    /// The query points and nodes this traversal owns.
    window: QueryWindow,
    /// The running sums of every query point in the window.
    sums: Vec<Delta>,
    /// Contributions recorded at a query node but not yet pushed to its
    /// children or points.
    postponed: Vec<Delta>,
    /// The smallest lower bound of any point below each query node,
    /// ignoring the node's own postponed contributions.
    min_lower: Vec<f64>,
    /// The largest error used by any point below each query node.
    max_error: Vec<f64>,
    /// The smallest pruned weight of any point below each query node.
    min_pruned: Vec<f64>,
}

impl<'a, P, Q: Weighted, M: Metric> KdeRules<'a, P, Q, M> {
    /// Fresh state for the query sub-tree rooted at `root`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new<B>(
        queries: &'a PointSet<P>,
        references: &'a PointSet<Q>,
        metric: &'a M,
        kernel: &'a dyn Kernel,
        tolerance: f64,
        prefix_weights: &'a [f64],
        root: &Node<B>,
    ) -> Self {
        let window = QueryWindow::of(root);
        let k_zero = kernel.evaluate(0.0);
        let total_weight = prefix_weights.last().copied().unwrap_or(0.0);
        let initial = Delta {
            upper: total_weight * k_zero,
            ..Delta::default()
        };
        Self {
            queries,
            references,
            metric,
            kernel,
            tolerance,
            k_zero,
            total_weight,
            prefix_weights,
            window,
            sums: vec![initial; window.count()],
            postponed: vec![Delta::default(); window.num_nodes()],
            min_lower: vec![0.0; window.num_nodes()],
            max_error: vec![0.0; window.num_nodes()],
            min_pruned: vec![0.0; window.num_nodes()],
        }
    }

    /// The total weight of the reference points in `node`.
    fn weight_of<B>(&self, node: &Node<B>) -> f64 {
        self.prefix_weights[node.end()] - self.prefix_weights[node.begin()]
    }

    /// Pushes every postponed contribution down to the points and returns
    /// the running sums of the window.
    pub(crate) fn finish<B>(mut self, root: &Node<B>) -> Vec<Delta> {
        self.flush(root, Delta::default());
        self.sums
    }

    /// Applies `inherited` and the postponed contributions of the sub-tree
    /// rooted at `node` to its points.
    fn flush<B>(&mut self, node: &Node<B>, mut inherited: Delta) {
        let slot = self.window.node(node);
        inherited += core::mem::take(&mut self.postponed[slot]);
        match node.children() {
            Some((left, right)) => {
                self.flush(left, inherited);
                self.flush(right, inherited);
            }
            None => {
                for q in node.indices() {
                    self.sums[self.window.point(q)] += inherited;
                }
            }
        }
    }

    /// Recomputes the statistics of a leaf from its points.
    fn refresh_leaf<B>(&mut self, node: &Node<B>) {
        let slot = self.window.node(node);
        let points = &self.sums[self.window.point(node.begin())..self.window.point(node.end())];
        self.min_lower[slot] = points.iter().map(|s| s.lower).fold(f64::INFINITY, f64::min);
        self.max_error[slot] = points.iter().map(|s| s.error).fold(0.0, f64::max);
        self.min_pruned[slot] = points.iter().map(|s| s.pruned).fold(f64::INFINITY, f64::min);
    }
}

impl<B, P, Q: Weighted, M: Metric> TraversalRules<B> for KdeRules<'_, P, Q, M> {
    fn prune(&mut self, query: &Node<B>, reference: &Node<B>, min_distance: f64, max_distance: f64) -> bool {
        let weight = self.weight_of(reference);
        if weight <= 0.0 {
            return true;
        }

        let (k_near, k_far) = (self.kernel.evaluate(min_distance), self.kernel.evaluate(max_distance));
        let slot = self.window.node(query);
        let pending = self.postponed[slot];

        let lower = self.min_lower[slot] + pending.lower + weight * k_far;
        let used = self.max_error[slot] + pending.error;
        let remaining = self.total_weight - (self.min_pruned[slot] + pending.pruned);
        let budget = (self.tolerance * lower - used) / remaining;

        let half_width = (k_near - k_far) / 2.0;
        // NaN budgets and half-widths both fail this test.
        if remaining > 0.0 && half_width <= budget {
            self.postponed[slot] += Delta {
                lower: weight * k_far,
                estimate: weight * (k_near + k_far) / 2.0,
                upper: weight * (k_near - self.k_zero),
                error: weight * half_width,
                pruned: weight,
            };
            true
        } else {
            false
        }
    }

    fn base_case(&mut self, query: &Node<B>, reference: &Node<B>) -> usize {
        let slot = self.window.node(query);
        let pending = core::mem::take(&mut self.postponed[slot]);

        for q in query.indices() {
            let point = self.queries.point(q);
            let sum = &mut self.sums[self.window.point(q)];
            *sum += pending;
            for r in reference.indices() {
                let w = self.references.payload(r).weight();
                let k = w * self.kernel.evaluate(self.metric.distance(point, self.references.point(r)));
                sum.lower += k;
                sum.estimate += k;
                sum.upper += k - w * self.k_zero;
            }
        }
        self.refresh_leaf(query);

        query.count() * reference.count()
    }

    fn descend(&mut self, query: &Node<B>) {
        if let Some((left, right)) = query.children() {
            let pending = core::mem::take(&mut self.postponed[self.window.node(query)]);
            self.postponed[self.window.node(left)] += pending;
            self.postponed[self.window.node(right)] += pending;
        }
    }

    fn combine(&mut self, query: &Node<B>) {
        if let Some((left, right)) = query.children() {
            let (l, r) = (self.window.node(left), self.window.node(right));
            let slot = self.window.node(query);
            self.min_lower[slot] =
                (self.min_lower[l] + self.postponed[l].lower).min(self.min_lower[r] + self.postponed[r].lower);
            self.max_error[slot] =
                (self.max_error[l] + self.postponed[l].error).max(self.max_error[r] + self.postponed[r].error);
            self.min_pruned[slot] =
                (self.min_pruned[l] + self.postponed[l].pruned).min(self.min_pruned[r] + self.postponed[r].pruned);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{kde::Gaussian, metric::Euclidean, KdTree, PointSet, TraversalRules, TreeBuilder};

    use super::{super::prefix_weights, Delta, KdeRules};

    #[test]
    fn prune_needs_a_defined_budget() {
        let points = PointSet::new(1, vec![0.0, 1.0, 5.0, 6.0]).unwrap();
        let points = points.with_payload(vec![1.0; 4]).unwrap();
        let tree = KdTree::<Euclidean, f64>::new(points, Euclidean, &TreeBuilder::new(2)).unwrap();
        let prefix = prefix_weights(tree.points()).unwrap();
        let kernel = Gaussian::new(1.0).unwrap();
        let mut rules = KdeRules::new(tree.points(), tree.points(), tree.metric(), &kernel, 0.5, &prefix, tree.root());

        let (left, right) = tree.root().children().unwrap();
        let slot = rules.window.node(left);

        // Every reference weight is already accounted for.
        rules.min_lower[slot] = 4.0;
        rules.min_pruned[slot] = rules.total_weight;
        assert!(!rules.prune(left, right, 4.0, 6.0));
        assert_eq!(rules.postponed[slot], Delta::default());

        rules.min_pruned[slot] = 0.0;
        rules.min_lower[slot] = f64::NAN;
        assert!(!rules.prune(left, right, 4.0, 6.0));
        assert_eq!(rules.postponed[slot], Delta::default());

        rules.min_lower[slot] = 4.0;
        assert!(rules.prune(left, right, 4.0, 6.0));
        assert!((rules.postponed[slot].pruned - 2.0).abs() < f64::EPSILON);
    }
}
