//! Pruning rules for (approximate) k-nearest-neighbor search.

use crate::{
    dataset::PointSet,
    traversal::{QueryWindow, TraversalRules},
    Metric, Node,
};

use super::NeighborList;

/// The state of one k-NN traversal over a query window.
pub(crate) struct KnnRules<'a, P, Q, M> {
    /// The query points, in tree order.
    queries: &'a PointSet<P>,
    /// The reference points, in tree order.
    references: &'a PointSet<Q>,
    /// The metric.
    metric: &'a M,
    /// The query points and nodes this traversal owns.
    window: QueryWindow,
    /// Whether a query point must not be its own neighbor.
    exclude_self: bool,
    /// `1 + relative_error`.
    slack: f64,
    /// The candidates of every query point in the window.
    lists: Vec<NeighborList>,
    /// For every query node, an upper bound on the `k`-th neighbor distance
    /// of all its points.
    bounds: Vec<f64>,
}

impl<'a, P, Q, M: Metric> KnnRules<'a, P, Q, M> {
    /// Fresh state for the query sub-tree rooted at `root`.
    pub(crate) fn new<B>(
        queries: &'a PointSet<P>,
        references: &'a PointSet<Q>,
        metric: &'a M,
        root: &Node<B>,
        k: usize,
        relative_error: f64,
        exclude_self: bool,
    ) -> Self {
        let window = QueryWindow::of(root);
        Self {
            queries,
            references,
            metric,
            window,
            exclude_self,
            slack: 1.0 + relative_error,
            lists: vec![NeighborList::new(k); window.count()],
            bounds: vec![f64::INFINITY; window.num_nodes()],
        }
    }

    /// The candidates of every query point in the window.
    pub(crate) fn into_neighbors(self) -> Vec<Vec<(usize, f64)>> {
        self.lists.into_iter().map(NeighborList::into_vec).collect()
    }
}

impl<B, P, Q, M: Metric> TraversalRules<B> for KnnRules<'_, P, Q, M> {
    fn prune(&mut self, query: &Node<B>, _: &Node<B>, min_distance: f64, _: f64) -> bool {
        min_distance * self.slack > self.bounds[self.window.node(query)]
    }

    fn base_case(&mut self, query: &Node<B>, reference: &Node<B>) -> usize {
        let mut evaluations = 0;
        let mut bound = 0_f64;
        for q in query.indices() {
            let point = self.queries.point(q);
            let list = &mut self.lists[self.window.point(q)];
            for r in reference.indices() {
                if self.exclude_self && q == r {
                    continue;
                }
                evaluations += 1;
                list.push(r, self.metric.distance(point, self.references.point(r)));
            }
            bound = bound.max(list.kth_distance());
        }
        let slot = self.window.node(query);
        self.bounds[slot] = self.bounds[slot].min(bound);
        evaluations
    }

    fn descend(&mut self, query: &Node<B>) {
        if let Some((left, right)) = query.children() {
            let bound = self.bounds[self.window.node(query)];
            for child in [left, right] {
                let slot = self.window.node(child);
                self.bounds[slot] = self.bounds[slot].min(bound);
            }
        }
    }

    fn combine(&mut self, query: &Node<B>) {
        if let Some((left, right)) = query.children() {
            let bound = self.bounds[self.window.node(left)].max(self.bounds[self.window.node(right)]);
            let slot = self.window.node(query);
            self.bounds[slot] = self.bounds[slot].min(bound);
        }
    }
}
