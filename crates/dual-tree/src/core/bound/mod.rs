//! Bounding volumes over contiguous ranges of a reordered `PointSet`.
//!
//! The pruning rules of every traversal depend on one property of these
//! volumes: for any `A`, `B`, any point `p` in `A` and any point `q` in `B`,
//! `A.min_distance(B) <= d(p, q) <= A.max_distance(B)`.

mod ball;
mod hrect;

pub use ball::Ball;
pub use hrect::Hrect;

use crate::{dataset::PointSet, Metric, Result};

/// A convex region guaranteed to contain every point of a tree node.
pub trait BoundingVolume: Clone + core::fmt::Debug + Send + Sync + Sized {
    /// A short name for the kind of volume, used in logs.
    fn name() -> &'static str;

    /// Checks that the volume gives admissible bounds under `metric`.
    ///
    /// # Errors
    ///
    /// * `Unimplemented` if the metric cannot be used with this volume.
    fn check_metric<M: Metric>(metric: &M) -> Result<()>;

    /// Builds the tightest volume of this kind around the points in
    /// `begin..end`.
    ///
    /// `extent` is the axis-aligned box of the same range, which the tree
    /// builder has already computed to choose its split.
    fn from_range<P, M: Metric>(points: &PointSet<P>, begin: usize, end: usize, extent: &Hrect, metric: &M) -> Self;

    /// A lower bound on the distance between any point in `self` and any
    /// point in `other`.
    fn min_distance<M: Metric>(&self, other: &Self, metric: &M) -> f64;

    /// An upper bound on the distance between any point in `self` and any
    /// point in `other`.
    fn max_distance<M: Metric>(&self, other: &Self, metric: &M) -> f64;

    /// A lower bound on the distance from `point` to any point in `self`.
    fn min_distance_to_point<M: Metric>(&self, point: &[f64], metric: &M) -> f64;

    /// An upper bound on the distance from `point` to any point in `self`.
    fn max_distance_to_point<M: Metric>(&self, point: &[f64], metric: &M) -> f64;

    /// Both bounds at once, `(min_distance, max_distance)`.
    fn range_distance<M: Metric>(&self, other: &Self, metric: &M) -> (f64, f64) {
        (self.min_distance(other, metric), self.max_distance(other, metric))
    }
}
