//! Binary space-partitioning trees over a reordered `PointSet`.

mod builder;
mod node;

pub use builder::{SplitRule, TreeBuilder};
pub use node::Node;

use crate::{
    bound::{Ball, BoundingVolume, Hrect},
    dataset::{Permutation, PointSet},
    metric::Euclidean,
    Metric, Result,
};

/// A tree whose nodes are bounded by axis-aligned boxes.
pub type KdTree<M = Euclidean, P = ()> = Tree<Hrect, M, P>;

/// A tree whose nodes are bounded by balls.
pub type BallTree<M = Euclidean, P = ()> = Tree<Ball, M, P>;

/// Builds a tree over `points` with the default split rule, reordering
/// them in place.
///
/// # Arguments
///
/// * `points` - The points to index. They are reordered so that every node
///   covers a contiguous range.
/// * `leaf_size` - The maximum number of points in a leaf.
/// * `metric` - The metric the bounds are computed under.
///
/// # Errors
///
/// See [`TreeBuilder::build`].
pub fn build_tree<B: BoundingVolume, P, M: Metric>(
    points: &mut PointSet<P>,
    leaf_size: usize,
    metric: &M,
) -> Result<(Node<B>, Permutation)> {
    TreeBuilder::new(leaf_size).build(points, metric)
}

/// A tree that owns its reordered points, its root and its permutation.
///
/// # Type parameters
///
/// * `B` - The bounding volume of every node.
/// * `M` - The metric.
/// * `P` - The per-point payload.
///
/// # Example
///
/// ```rust
/// use dual_tree::{KdTree, PointSet, TreeBuilder, metric::Euclidean};
///
/// let points = PointSet::from_rows(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [5.0, 5.0], [5.0, 6.0]]).unwrap();
/// let tree: KdTree = KdTree::new(points, Euclidean, &TreeBuilder::new(1)).unwrap();
///
/// assert_eq!(tree.points().len(), 5);
/// for old in 0..5 {
///     let new = tree.permutation().reordered_index(old);
///     assert_eq!(tree.permutation().original_index(new), old);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Tree<B, M, P = ()> {
    /// The root of the tree.
    root: Node<B>,
    /// The points, in tree order.
    points: PointSet<P>,
    /// Maps between original and tree order.
    permutation: Permutation,
    /// The metric used for the bounds and by the queries.
    metric: M,
    /// The parameters the tree was built with.
    builder: TreeBuilder,
}

impl<B: BoundingVolume, M: Metric, P> Tree<B, M, P> {
    /// Builds a tree over `points`.
    ///
    /// # Errors
    ///
    /// See [`TreeBuilder::build`]. On error, the points are dropped without
    /// having been reordered.
    pub fn new(mut points: PointSet<P>, metric: M, builder: &TreeBuilder) -> Result<Self> {
        let (root, permutation) = builder.build(&mut points, &metric)?;
        Ok(Self {
            root,
            points,
            permutation,
            metric,
            builder: *builder,
        })
    }
}

impl<B, M, P> Tree<B, M, P> {
    /// The root node.
    #[must_use]
    pub const fn root(&self) -> &Node<B> {
        &self.root
    }

    /// The points, in tree order.
    #[must_use]
    pub const fn points(&self) -> &PointSet<P> {
        &self.points
    }

    /// The permutation between original and tree order.
    #[must_use]
    pub const fn permutation(&self) -> &Permutation {
        &self.permutation
    }

    /// The metric.
    #[must_use]
    pub const fn metric(&self) -> &M {
        &self.metric
    }

    /// The parameters the tree was built with.
    #[must_use]
    pub const fn builder(&self) -> &TreeBuilder {
        &self.builder
    }

    /// The number of points in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always `false`; trees are never built over empty point sets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The number of nodes in the tree.
    #[must_use]
    pub const fn num_nodes(&self) -> usize {
        self.root.subtree_size()
    }

    /// The depth of the deepest leaf.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.root.max_depth()
    }

    /// The leaves of the tree, left to right.
    #[must_use]
    pub fn leaves(&self) -> Vec<&Node<B>> {
        self.root.leaves()
    }

    /// Consumes the tree, returning its root, points and permutation.
    #[must_use]
    pub fn into_parts(self) -> (Node<B>, PointSet<P>, Permutation) {
        (self.root, self.points, self.permutation)
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use crate::{
        bound::{Ball, BoundingVolume, Hrect},
        metric::{Euclidean, Manhattan, SquaredEuclidean},
        Metric, PointSet, TreeError,
    };

    use super::{build_tree, BallTree, KdTree, Node, SplitRule, TreeBuilder};

    fn five_points() -> PointSet {
        PointSet::from_rows(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [5.0, 5.0], [5.0, 6.0]]).unwrap()
    }

    /// Checks the structural invariants of every node.
    fn check_structure<B: BoundingVolume>(root: &Node<B>) {
        for (expected_id, node) in root.subtree().into_iter().enumerate() {
            assert_eq!(node.id(), expected_id);
            match node.children() {
                Some((left, right)) => {
                    assert_eq!(left.begin(), node.begin());
                    assert_eq!(left.end(), right.begin());
                    assert_eq!(right.end(), node.end());
                    assert_eq!(left.count() + right.count(), node.count());
                    assert!(left.count() > 0 && right.count() > 0);
                    assert_eq!(left.depth(), node.depth() + 1);
                    assert_eq!(node.subtree_size(), 1 + left.subtree_size() + right.subtree_size());
                }
                None => assert!(node.count() > 0),
            }
        }
    }

    #[test]
    fn five_point_round_trip() {
        let original = five_points();
        let mut points = original.clone();
        let (root, permutation) = build_tree::<Hrect, _, _>(&mut points, 1, &Euclidean).unwrap();

        check_structure(&root);
        assert!(root.leaves().iter().all(|l| l.count() == 1));
        assert_eq!(root.leaves().len(), 5);

        for new in 0..5 {
            let old = permutation.original_index(new);
            assert_eq!(permutation.reordered_index(old), new);
            assert_eq!(points.point(new), original.point(old));
        }
    }

    #[test]
    fn degenerate_split_is_a_single_leaf() {
        let mut points = PointSet::from_rows(&[[3.0, 3.0]; 50]).unwrap();
        let (root, permutation) = build_tree::<Hrect, _, _>(&mut points, 4, &Euclidean).unwrap();
        assert!(root.is_leaf());
        assert_eq!(root.count(), 50);
        assert_eq!(root.subtree_size(), 1);
        assert_eq!(permutation.old_from_new(), (0..50).collect::<Vec<_>>().as_slice());
    }

    #[test]
    fn partially_degenerate_split() {
        // All x are equal; the tree must split along y only.
        let rows = (0..40).map(|i| [1.0, f64::from(i)]).collect::<Vec<_>>();
        let mut points = PointSet::from_rows(&rows).unwrap();
        let (root, _) = build_tree::<Hrect, _, _>(&mut points, 3, &Euclidean).unwrap();
        check_structure(&root);
        assert!(root.leaves().iter().all(|l| l.count() <= 3));
    }

    #[test_case(SplitRule::Midpoint, 1 ; "midpoint_1")]
    #[test_case(SplitRule::Midpoint, 10 ; "midpoint_10")]
    #[test_case(SplitRule::Median, 1 ; "median_1")]
    #[test_case(SplitRule::Median, 10 ; "median_10")]
    fn bounds_enclose_their_points(rule: SplitRule, leaf_size: usize) {
        let rows = (0..200)
            .map(|i| {
                let t = f64::from(i);
                [(t * 0.37).sin() * 10.0, (t * 1.3).cos() * 3.0, t % 7.0]
            })
            .collect::<Vec<_>>();
        let builder = TreeBuilder::new(leaf_size).with_split_rule(rule);

        let tree: KdTree = KdTree::new(PointSet::from_rows(&rows).unwrap(), Euclidean, &builder).unwrap();
        check_structure(tree.root());
        assert!(tree.leaves().iter().all(|l| l.count() <= leaf_size));
        for node in tree.root().subtree() {
            for i in node.indices() {
                let p = tree.points().point(i);
                assert!(node.bound().min_distance_to_point(p, &Euclidean) <= 0.0);
            }
        }

        let tree: BallTree = BallTree::new(PointSet::from_rows(&rows).unwrap(), Euclidean, &builder).unwrap();
        check_structure(tree.root());
        assert!(tree.leaves().iter().all(|l| l.count() <= leaf_size));
        for node in tree.root().subtree() {
            for i in node.indices() {
                let p = tree.points().point(i);
                let d = Euclidean.distance(node.bound().center(), p);
                assert!(d <= node.bound().radius() + 1e-9);
            }
        }
    }

    #[test]
    fn payload_follows_points() {
        let rows = (0..30).map(|i| [f64::from(i % 10), f64::from(i / 10)]).collect::<Vec<_>>();
        let labels = (0..30).collect::<Vec<usize>>();
        let points = PointSet::from_rows(&rows).unwrap().with_payload(labels).unwrap();
        let tree: KdTree<Manhattan, usize> = KdTree::new(points, Manhattan, &TreeBuilder::new(2)).unwrap();
        for new in 0..30 {
            assert_eq!(*tree.points().payload(new), tree.permutation().original_index(new));
        }
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(PointSet::new(2, Vec::new()), Err(TreeError::InvalidArgument(_))));
        assert!(matches!(
            KdTree::<Euclidean>::new(five_points(), Euclidean, &TreeBuilder::new(0)),
            Err(TreeError::InvalidArgument(_))
        ));
        assert!(matches!(
            BallTree::<SquaredEuclidean>::new(five_points(), SquaredEuclidean, &TreeBuilder::default()),
            Err(TreeError::Unimplemented(_))
        ));
        let mut points = five_points();
        assert!(build_tree::<Ball, _, _>(&mut points, 0, &Euclidean).is_err());
        assert_eq!(points, five_points());
    }

    #[test]
    fn frontier_covers_the_root() {
        let rows = (0..100).map(|i| [f64::from(i)]).collect::<Vec<_>>();
        let tree: KdTree = KdTree::new(PointSet::from_rows(&rows).unwrap(), Euclidean, &TreeBuilder::new(5)).unwrap();
        for n in [1, 2, 3, 8, 1000] {
            let pieces = tree.root().frontier(n);
            assert!(pieces.len() >= n.min(tree.leaves().len()));
            assert_eq!(pieces[0].begin(), 0);
            assert_eq!(pieces[pieces.len() - 1].end(), 100);
            for w in pieces.windows(2) {
                assert_eq!(w[0].end(), w[1].begin());
            }
        }
    }
}
