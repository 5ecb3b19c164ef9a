//! Pruning and sampling rules for rank-approximate search.

use rand::Rng;

use crate::{
    dataset::PointSet,
    knn::NeighborList,
    traversal::{QueryWindow, TraversalRules},
    Metric, Node,
};

use super::RankApproximationSampler;

/// The state of one rank-approximate traversal over a query window.
pub(crate) struct RankApproxRules<'a, P, Q, M, R> {
    /// The query points, in tree order.
    queries: &'a PointSet<P>,
    /// The reference points, in tree order.
    references: &'a PointSet<Q>,
    /// The metric.
    metric: &'a M,
    /// The sample sizes.
    sampler: &'a RankApproximationSampler,
    /// The largest number of points sampled from one reference node.
    sample_limit: usize,
    /// The source of randomness for sampling.
    rng: &'a mut R,
    /// The query points and nodes this traversal owns.
    window: QueryWindow,
    /// Whether a query point must not be its own neighbor.
    exclude_self: bool,
    /// The candidates of every query point in the window.
    lists: Vec<NeighborList>,
    /// The number of reference points accounted for by every query point.
    samples: Vec<usize>,
    /// For every query node, an upper bound on the `k`-th neighbor distance
    /// of all its points.
    bounds: Vec<f64>,
    /// For every query node, the fewest samples of any point below it,
    /// ignoring the node's own postponed samples.
    min_samples: Vec<usize>,
    /// Samples credited to a query node but not yet pushed down.
    postponed: Vec<usize>,
}

impl<'a, P, Q, M: Metric, R: Rng> RankApproxRules<'a, P, Q, M, R> {
    /// Fresh state for the query sub-tree rooted at `root`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new<B>(
        queries: &'a PointSet<P>,
        references: &'a PointSet<Q>,
        metric: &'a M,
        sampler: &'a RankApproximationSampler,
        sample_limit: usize,
        rng: &'a mut R,
        root: &Node<B>,
        exclude_self: bool,
    ) -> Self {
        let window = QueryWindow::of(root);
        Self {
            queries,
            references,
            metric,
            sampler,
            sample_limit,
            rng,
            window,
            exclude_self,
            lists: vec![NeighborList::new(sampler.k()); window.count()],
            samples: vec![0; window.count()],
            bounds: vec![f64::INFINITY; window.num_nodes()],
            min_samples: vec![0; window.num_nodes()],
            postponed: vec![0; window.num_nodes()],
        }
    }

    /// The candidates of every query point in the window.
    pub(crate) fn into_neighbors(self) -> Vec<Vec<(usize, f64)>> {
        self.lists.into_iter().map(NeighborList::into_vec).collect()
    }

    /// Whether every point in `query` already has enough samples.
    fn is_satisfied<B>(&self, query: &Node<B>) -> bool {
        let slot = self.window.node(query);
        self.min_samples[slot] + self.postponed[slot] >= self.sampler.min_samples()
    }

    /// Moves the postponed samples of a leaf onto its points.
    fn flush_leaf<B>(&mut self, query: &Node<B>) {
        let pending = core::mem::take(&mut self.postponed[self.window.node(query)]);
        if pending > 0 {
            for q in query.indices() {
                self.samples[self.window.point(q)] += pending;
            }
        }
    }

    /// Recomputes the statistics of a leaf from its points.
    fn refresh_leaf<B>(&mut self, query: &Node<B>) {
        let slot = self.window.node(query);
        let points = self.window.point(query.begin())..self.window.point(query.end());
        self.bounds[slot] = self.lists[points.clone()]
            .iter()
            .map(NeighborList::kth_distance)
            .fold(0.0, f64::max);
        self.min_samples[slot] = self.samples[points].iter().copied().min().unwrap_or(0);
    }

    /// Offers the reference point `r` to the query point `q`.
    ///
    /// Returns whether a distance was computed.
    fn compare(&mut self, q: usize, r: usize) -> bool {
        if self.exclude_self && q == r {
            return false;
        }
        let d = self.metric.distance(self.queries.point(q), self.references.point(r));
        self.lists[self.window.point(q)].push(r, d);
        true
    }
}

impl<B, P, Q, M: Metric, R: Rng> TraversalRules<B> for RankApproxRules<'_, P, Q, M, R> {
    fn prune(&mut self, query: &Node<B>, reference: &Node<B>, min_distance: f64, _: f64) -> bool {
        if self.is_satisfied(query) {
            return true;
        }
        let slot = self.window.node(query);
        if min_distance > self.bounds[slot] {
            // Every point of the node is worse than the current candidates,
            // so its share of the samples is already decided.
            self.postponed[slot] += self.sampler.sample_size(reference.count());
            true
        } else {
            false
        }
    }

    fn sample(&mut self, query: &Node<B>, reference: &Node<B>) -> Option<usize> {
        let size = reference.count();
        let n = self.sampler.sample_size(size);
        if !query.is_leaf() || n >= size || n > self.sample_limit {
            return None;
        }

        self.flush_leaf(query);
        let mut evaluations = 0;
        for q in query.indices() {
            // The query point is not a candidate for itself, so draw from the
            // other points of the node and step over its offset.
            let skip = (self.exclude_self && reference.contains(q)).then(|| q - reference.begin());
            let pool = if skip.is_some() { size - 1 } else { size };
            let picks = rand::seq::index::sample(&mut *self.rng, pool, self.sampler.sample_size(pool));
            let mut taken = 0;
            for offset in picks {
                let offset = match skip {
                    Some(s) if offset >= s => offset + 1,
                    _ => offset,
                };
                if self.compare(q, reference.begin() + offset) {
                    taken += 1;
                }
            }
            self.samples[self.window.point(q)] += taken;
            evaluations += taken;
        }
        self.refresh_leaf(query);
        Some(evaluations)
    }

    fn base_case(&mut self, query: &Node<B>, reference: &Node<B>) -> usize {
        self.flush_leaf(query);
        let mut evaluations = 0;
        for q in query.indices() {
            let mut taken = 0;
            for r in reference.indices() {
                if self.compare(q, r) {
                    taken += 1;
                }
            }
            self.samples[self.window.point(q)] += taken;
            evaluations += taken;
        }
        self.refresh_leaf(query);
        evaluations
    }

    fn descend(&mut self, query: &Node<B>) {
        if let Some((left, right)) = query.children() {
            let slot = self.window.node(query);
            let pending = core::mem::take(&mut self.postponed[slot]);
            let bound = self.bounds[slot];
            for child in [left, right] {
                let c = self.window.node(child);
                self.postponed[c] += pending;
                self.bounds[c] = self.bounds[c].min(bound);
            }
        }
    }

    fn combine(&mut self, query: &Node<B>) {
        if let Some((left, right)) = query.children() {
            let (l, r) = (self.window.node(left), self.window.node(right));
            let slot = self.window.node(query);
            self.bounds[slot] = self.bounds[slot].min(self.bounds[l].max(self.bounds[r]));
            self.min_samples[slot] =
                (self.min_samples[l] + self.postponed[l]).min(self.min_samples[r] + self.postponed[r]);
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use crate::{metric::Euclidean, KdTree, PointSet, TraversalRules, TreeBuilder};

    use super::{RankApproxRules, RankApproximationSampler};

    #[test]
    fn sampling_a_node_that_holds_the_query_skips_it() {
        let points = PointSet::new(1, (0..200).map(f64::from).collect()).unwrap();
        let tree = KdTree::<Euclidean>::new(points, Euclidean, &TreeBuilder::new(10)).unwrap();
        // Monochromatic, so every query has 199 candidates.
        let sampler = RankApproximationSampler::new(199, 10.0, 0.05, 1).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let mut rules = RankApproxRules::new(
            tree.points(),
            tree.points(),
            tree.metric(),
            &sampler,
            1000,
            &mut rng,
            tree.root(),
            true,
        );

        let leaf = tree.leaves()[0];
        let evaluations = rules.sample(leaf, tree.root()).unwrap();
        assert_eq!(evaluations, leaf.count() * sampler.min_samples());
        for q in leaf.indices() {
            assert_eq!(rules.samples[rules.window.point(q)], sampler.min_samples());
        }

        let neighbors = rules.into_neighbors();
        for q in leaf.indices() {
            assert!(neighbors[q].iter().all(|&(r, d)| r != q && d > 0.0));
        }
    }
}
