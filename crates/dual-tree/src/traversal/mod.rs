//! The generic dual-tree traversal.
//!
//! A traversal visits pairs of (query node, reference node), starting from
//! the two roots. For every pair it asks a set of `TraversalRules` whether
//! the pair can be pruned, sampled or must be resolved by comparing every
//! pair of points. The rules own all algorithm-specific state, keyed by the
//! pre-order ids of the query nodes, so the trees themselves are never
//! mutated.

mod stats;

pub use stats::TraversalStats;

use crate::{BoundingVolume, Metric, Node, PointSet, Result, TreeError};

/// The algorithm-specific half of a dual-tree traversal.
///
/// Every method receives the query node first and the reference node second.
pub trait TraversalRules<B> {
    /// Whether the pair can be skipped entirely, given the bounds on the
    /// distance between any query point and any reference point.
    ///
    /// A rule that prunes is responsible for recording whatever summary
    /// contribution the pair makes.
    fn prune(&mut self, query: &Node<B>, reference: &Node<B>, min_distance: f64, max_distance: f64) -> bool;

    /// Compares every query point in `query` with every reference point in
    /// `reference`. Both nodes are leaves.
    ///
    /// Returns the number of point distances computed.
    fn base_case(&mut self, query: &Node<B>, reference: &Node<B>) -> usize;

    /// Replaces the recursion below this pair by a random sample of the
    /// reference points.
    ///
    /// Returns the number of point distances computed, or `None` if the
    /// pair must be traversed as usual.
    fn sample(&mut self, query: &Node<B>, reference: &Node<B>) -> Option<usize> {
        let _ = (query, reference);
        None
    }

    /// Called before the children of `query` are visited, to push any
    /// postponed state down to them.
    fn descend(&mut self, query: &Node<B>) {
        let _ = query;
    }

    /// Called after the children of `query` were visited, to pull their
    /// state back up.
    fn combine(&mut self, query: &Node<B>) {
        let _ = query;
    }
}

/// Drives a `TraversalRules` over a pair of trees.
///
/// The traversal is depth-first and single-threaded. Parallel queries run
/// one traversal per query sub-tree, each with its own rules.
#[derive(Debug)]
pub struct DualTreeTraversal<'a, M> {
    /// The metric the node bounds are measured in.
    metric: &'a M,
    /// Counters for the current traversal.
    stats: TraversalStats,
}

impl<'a, M: Metric> DualTreeTraversal<'a, M> {
    /// Creates a traversal measuring node bounds with `metric`.
    #[must_use]
    pub const fn new(metric: &'a M) -> Self {
        Self {
            metric,
            stats: TraversalStats::new(),
        }
    }

    /// Traverses the pair of sub-trees rooted at `query` and `reference`.
    ///
    /// Returns the counters of the traversal.
    pub fn run<B: BoundingVolume, R: TraversalRules<B>>(
        mut self,
        query: &Node<B>,
        reference: &Node<B>,
        rules: &mut R,
    ) -> TraversalStats {
        if query.count() > 0 && reference.count() > 0 {
            let (min, max) = query.bound().range_distance(reference.bound(), self.metric);
            self.visit(query, reference, min, max, rules);
        }
        ftlog::trace!(
            "Traversal of query node {} against reference node {}: {}",
            query.id(),
            reference.id(),
            self.stats
        );
        self.stats
    }

    /// Visits one pair of nodes whose distance bounds are already known.
    fn visit<B: BoundingVolume, R: TraversalRules<B>>(
        &mut self,
        query: &Node<B>,
        reference: &Node<B>,
        min_distance: f64,
        max_distance: f64,
        rules: &mut R,
    ) {
        self.stats.pair_visits += 1;

        if rules.prune(query, reference, min_distance, max_distance) {
            self.stats.prunes += 1;
            return;
        }

        if let Some(evaluations) = rules.sample(query, reference) {
            self.stats.samples += 1;
            self.stats.sampled_pairs += evaluations;
            self.stats.distance_evaluations += evaluations;
            return;
        }

        match (query.children(), reference.children()) {
            (None, None) => {
                self.stats.base_cases += 1;
                self.stats.distance_evaluations += rules.base_case(query, reference);
            }
            (None, Some((left, right))) => self.visit_best_first(query, left, right, rules),
            (Some((q_left, q_right)), None) => {
                rules.descend(query);
                for child in [q_left, q_right] {
                    let (min, max) = child.bound().range_distance(reference.bound(), self.metric);
                    self.visit(child, reference, min, max, rules);
                }
                rules.combine(query);
            }
            (Some((q_left, q_right)), Some((r_left, r_right))) => {
                rules.descend(query);
                self.visit_best_first(q_left, r_left, r_right, rules);
                self.visit_best_first(q_right, r_left, r_right, rules);
                rules.combine(query);
            }
        }
    }

    /// Visits `query` against both reference children, closest child first.
    fn visit_best_first<B: BoundingVolume, R: TraversalRules<B>>(
        &mut self,
        query: &Node<B>,
        left: &Node<B>,
        right: &Node<B>,
        rules: &mut R,
    ) {
        let (l_min, l_max) = query.bound().range_distance(left.bound(), self.metric);
        let (r_min, r_max) = query.bound().range_distance(right.bound(), self.metric);
        if r_min < l_min {
            self.visit(query, right, r_min, r_max, rules);
            self.visit(query, left, l_min, l_max, rules);
        } else {
            self.visit(query, left, l_min, l_max, rules);
            self.visit(query, right, r_min, r_max, rules);
        }
    }
}

/// The slice of a query tree owned by one traversal.
///
/// A traversal rooted at a query sub-tree only ever touches the points and
/// node ids of that sub-tree, so its state can live in small local arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWindow {
    /// The first reordered point index of the sub-tree.
    begin: usize,
    /// The number of points in the sub-tree.
    count: usize,
    /// The pre-order id of the sub-tree root.
    first_id: usize,
    /// The number of nodes in the sub-tree.
    num_nodes: usize,
}

impl QueryWindow {
    /// The window covering the sub-tree rooted at `node`.
    #[must_use]
    pub const fn of<B>(node: &Node<B>) -> Self {
        Self {
            begin: node.begin(),
            count: node.count(),
            first_id: node.id(),
            num_nodes: node.subtree_size(),
        }
    }

    /// The first reordered point index in the window.
    #[must_use]
    pub const fn begin(&self) -> usize {
        self.begin
    }

    /// The number of points in the window.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// The number of nodes in the window.
    #[must_use]
    pub const fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// The local slot of a reordered point index.
    #[must_use]
    pub const fn point(&self, index: usize) -> usize {
        index - self.begin
    }

    /// The local slot of a node.
    #[must_use]
    pub const fn node<B>(&self, node: &Node<B>) -> usize {
        node.id() - self.first_id
    }
}

/// The query sub-trees a parallel traversal hands to independent tasks.
pub(crate) fn parallel_frontier<B>(root: &Node<B>) -> Vec<&Node<B>> {
    root.frontier(4 * rayon::current_num_threads())
}

/// Whether two point buffers are the same buffer, i.e. a monochromatic
/// query.
pub(crate) fn same_buffer(a: &[f64], b: &[f64]) -> bool {
    core::ptr::eq(a.as_ptr(), b.as_ptr()) && a.len() == b.len()
}

/// Checks that a relative error tolerance lies in `[0, 1)`.
pub(crate) fn check_relative_error(relative_error: f64) -> Result<()> {
    if (0.0..1.0).contains(&relative_error) {
        Ok(())
    } else {
        Err(TreeError::invalid(format!(
            "the relative error must be in [0, 1), got {relative_error}"
        )))
    }
}

/// Checks that query and reference points live in the same space.
pub(crate) fn check_dims<P, Q>(queries: &PointSet<P>, references: &PointSet<Q>) -> Result<()> {
    if queries.dim() == references.dim() {
        Ok(())
    } else {
        Err(TreeError::invalid(format!(
            "query points have {} dimensions but reference points have {}",
            queries.dim(),
            references.dim()
        )))
    }
}
