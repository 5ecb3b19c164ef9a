//! Recursive construction of a tree over a mutable `PointSet`.

use serde::{Deserialize, Serialize};

use crate::{
    bound::{BoundingVolume, Hrect},
    dataset::{Permutable, Permutation, PointSet},
    utils, Metric, Result, TreeError,
};

use super::Node;

/// How a node chooses the split value along its widest dimension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitRule {
    /// The midpoint of the node's range along the split dimension.
    Midpoint,
    /// The median of the coordinates along the split dimension.
    ///
    /// A median equal to the minimum or maximum coordinate is replaced by the
    /// midpoint, so both children are non-empty.
    #[default]
    Median,
}

/// Parameters for building a tree.
///
/// # Example
///
/// ```rust
/// use dual_tree::{metric::Euclidean, Hrect, PointSet, SplitRule, TreeBuilder};
///
/// let mut points = PointSet::from_rows(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [5.0, 5.0], [5.0, 6.0]]).unwrap();
/// let builder = TreeBuilder::new(1).with_split_rule(SplitRule::Midpoint);
/// let (root, permutation) = builder.build::<Hrect, _, _>(&mut points, &Euclidean).unwrap();
///
/// assert_eq!(root.count(), 5);
/// assert!(!root.is_leaf());
/// assert_eq!(permutation.len(), 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeBuilder {
    /// The maximum number of points in a leaf.
    leaf_size: usize,
    /// How split values are chosen.
    split_rule: SplitRule,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self {
            leaf_size: 20,
            split_rule: SplitRule::default(),
        }
    }
}

impl TreeBuilder {
    /// Creates a builder with the given leaf size and the default split rule.
    #[must_use]
    pub fn new(leaf_size: usize) -> Self {
        Self {
            leaf_size,
            ..Self::default()
        }
    }

    /// Sets the split rule.
    #[must_use]
    pub const fn with_split_rule(mut self, split_rule: SplitRule) -> Self {
        self.split_rule = split_rule;
        self
    }

    /// Sets the leaf size.
    #[must_use]
    pub const fn with_leaf_size(mut self, leaf_size: usize) -> Self {
        self.leaf_size = leaf_size;
        self
    }

    /// The maximum number of points in a leaf.
    #[must_use]
    pub const fn leaf_size(&self) -> usize {
        self.leaf_size
    }

    /// The split rule.
    #[must_use]
    pub const fn split_rule(&self) -> SplitRule {
        self.split_rule
    }

    /// Builds a tree over `points`, reordering them in place.
    ///
    /// # Returns
    ///
    /// - The root `Node` of the tree.
    /// - The `Permutation` relating the original and reordered indices.
    ///
    /// # Errors
    ///
    /// * `InvalidArgument` if the leaf size is zero or `points` is empty.
    /// * `Unimplemented` if the bounding volume cannot be used with `metric`.
    ///
    /// Nothing is reordered when an error is returned.
    pub fn build<B: BoundingVolume, P, M: Metric>(
        &self,
        points: &mut PointSet<P>,
        metric: &M,
    ) -> Result<(Node<B>, Permutation)> {
        if self.leaf_size == 0 {
            return Err(TreeError::invalid("the leaf size must be positive"));
        }
        if points.is_empty() {
            return Err(TreeError::invalid("cannot build a tree over an empty point set"));
        }
        if points.dim() == 0 || points.coords().len() != points.len() * points.dim() {
            return Err(TreeError::invalid("the coordinate buffer does not match the point count"));
        }
        B::check_metric(metric)?;

        let n = points.len();
        let mut old_from_new = (0..n).collect::<Vec<_>>();
        let mut next_id = 0;
        let root = self.build_range(points, &mut old_from_new, metric, 0, n, 0, &mut next_id);

        ftlog::debug!(
            "Built a {} tree over {} points in {} dimensions: {} nodes, {} leaves, depth {}",
            B::name(),
            points.len(),
            points.dim(),
            root.subtree_size(),
            root.leaves().len(),
            root.max_depth()
        );

        Ok((root, Permutation::from_bijection(old_from_new)))
    }

    /// Recursively builds the sub-tree over `begin..end`.
    #[allow(clippy::too_many_arguments)]
    fn build_range<B: BoundingVolume, P, M: Metric>(
        &self,
        points: &mut PointSet<P>,
        old_from_new: &mut [usize],
        metric: &M,
        begin: usize,
        end: usize,
        depth: usize,
        next_id: &mut usize,
    ) -> Node<B> {
        let id = *next_id;
        *next_id += 1;

        let extent = Hrect::of_range(points, begin, end);
        let bound = B::from_range(points, begin, end, &extent, metric);

        let mid = if end - begin > self.leaf_size {
            self.split_value(points, &extent, begin, end)
                .map(|(dim, value)| hoare_partition(points, old_from_new, begin, end, dim, value))
                .filter(|&mid| begin < mid && mid < end)
        } else {
            None
        };

        let children = mid.map(|mid| {
            let left = self.build_range(points, old_from_new, metric, begin, mid, depth + 1, next_id);
            let right = self.build_range(points, old_from_new, metric, mid, end, depth + 1, next_id);
            Box::new((left, right))
        });
        let subtree_size = 1 + children
            .as_deref()
            .map_or(0, |(l, r)| l.subtree_size + r.subtree_size);

        Node {
            id,
            depth,
            begin,
            count: end - begin,
            subtree_size,
            bound,
            children,
        }
    }

    /// Chooses the split dimension and value for the points in `begin..end`.
    ///
    /// Returns `None` when every coordinate along the widest dimension is
    /// equal, in which case the node must stay a leaf.
    fn split_value<P>(&self, points: &PointSet<P>, extent: &Hrect, begin: usize, end: usize) -> Option<(usize, f64)> {
        let (dim, lo, hi) = extent.widest_dimension()?;
        if hi <= lo {
            return None;
        }
        // Over a spread of about one ulp the midpoint rounds back to `lo`,
        // which would leave the left part empty.
        let midpoint = lo + (hi - lo) / 2.0;
        let midpoint = if midpoint <= lo { hi } else { midpoint };

        let value = match self.split_rule {
            SplitRule::Midpoint => midpoint,
            SplitRule::Median => {
                let mut values = (begin..end).map(|i| points.coordinate(i, dim)).collect::<Vec<_>>();
                match utils::median(&mut values) {
                    Some(m) if lo < m && m < hi => m,
                    _ => midpoint,
                }
            }
        };
        Some((dim, value))
    }
}

/// Partitions `begin..end` in place so that points with a coordinate below
/// `value` along `dim` come first. Every swap is mirrored in `old_from_new`.
///
/// Returns the first index of the right part.
fn hoare_partition<P>(
    points: &mut PointSet<P>,
    old_from_new: &mut [usize],
    begin: usize,
    end: usize,
    dim: usize,
    value: f64,
) -> usize {
    let (mut i, mut j) = (begin, end);
    loop {
        while i < j && points.coordinate(i, dim) < value {
            i += 1;
        }
        while i < j && points.coordinate(j - 1, dim) >= value {
            j -= 1;
        }
        if i >= j {
            return i;
        }
        points.swap_two(i, j - 1);
        old_from_new.swap(i, j - 1);
        i += 1;
        j -= 1;
    }
}

#[cfg(test)]
mod tests {
    use crate::{bound::Hrect, metric::Euclidean, PointSet, TreeError};

    use super::{hoare_partition, SplitRule, TreeBuilder};

    #[test]
    fn partition_splits_around_value() {
        let mut points = PointSet::new(1, vec![5.0, 1.0, 4.0, 2.0, 3.0, 0.0]).unwrap();
        let mut old_from_new = (0..6).collect::<Vec<_>>();
        let mid = hoare_partition(&mut points, &mut old_from_new, 0, 6, 0, 3.0);
        assert_eq!(mid, 3);
        assert!((0..3).all(|i| points.coordinate(i, 0) < 3.0));
        assert!((3..6).all(|i| points.coordinate(i, 0) >= 3.0));

        let original = [5.0, 1.0, 4.0, 2.0, 3.0, 0.0];
        for (new, &old) in old_from_new.iter().enumerate() {
            assert_eq!(points.coordinate(new, 0), original[old]);
        }
    }

    #[test]
    fn leaf_size_is_respected() {
        let coords = (0..100).map(f64::from).collect::<Vec<_>>();
        for rule in [SplitRule::Midpoint, SplitRule::Median] {
            let mut points = PointSet::new(1, coords.clone()).unwrap();
            let (root, _) = TreeBuilder::new(7)
                .with_split_rule(rule)
                .build::<Hrect, _, _>(&mut points, &Euclidean)
                .unwrap();
            assert!(root.leaves().iter().all(|l| l.count() <= 7));
            assert_eq!(root.leaves().iter().map(|l| l.count()).sum::<usize>(), 100);
        }
    }

    #[test]
    fn median_equal_to_max_falls_back_to_midpoint() {
        // The upper median is 9, the maximum.
        let mut points = PointSet::new(1, vec![0.0, 9.0, 9.0, 9.0]).unwrap();
        let (root, _) = TreeBuilder::new(1).build::<Hrect, _, _>(&mut points, &Euclidean).unwrap();
        let (left, right) = root.children().unwrap();
        assert_eq!(left.count(), 1);
        assert_eq!(right.count(), 3);
        assert!(right.is_leaf());
    }

    #[test]
    fn ulp_wide_spread_still_splits() {
        let next = f64::from_bits(1.0_f64.to_bits() + 1);
        for rule in [SplitRule::Midpoint, SplitRule::Median] {
            let mut points = PointSet::new(1, vec![1.0, next, 1.0, next, 1.0, next]).unwrap();
            let (root, _) = TreeBuilder::new(1)
                .with_split_rule(rule)
                .build::<Hrect, _, _>(&mut points, &Euclidean)
                .unwrap();
            let (left, right) = root.children().unwrap();
            assert_eq!((left.count(), right.count()), (3, 3));
            assert!(left.indices().all(|i| points.coordinate(i, 0) == 1.0));
            assert!(right.indices().all(|i| points.coordinate(i, 0) == next));
        }
    }

    #[test]
    fn rejects_bad_arguments() {
        let mut points = PointSet::new(1, vec![0.0, 1.0]).unwrap();
        assert!(matches!(
            TreeBuilder::new(0).build::<Hrect, _, _>(&mut points, &Euclidean),
            Err(TreeError::InvalidArgument(_))
        ));
    }
}
