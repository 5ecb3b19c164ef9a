//! The `Metric` trait is used for all distance computations in the trees.

mod chebyshev;
mod euclidean;
mod manhattan;
mod squared_euclidean;

pub use chebyshev::Chebyshev;
pub use euclidean::Euclidean;
pub use manhattan::Manhattan;
pub use squared_euclidean::SquaredEuclidean;

/// The `Metric` trait is used for all distance computations in the trees.
///
/// A metric here is an Lp-style distance on real vectors: the distance
/// between two points must equal the `norm` of the absolute differences of
/// their coordinates, and `norm` must be non-decreasing in every delta. That
/// property is what makes the axis-aligned box bounds admissible.
///
/// # Example
///
/// The following is an example of a `Metric` implementation for a weighted
/// Manhattan distance that counts the first coordinate twice.
///
/// ```rust
/// use dual_tree::Metric;
///
/// struct Weighted;
///
/// impl Metric for Weighted {
///     fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
///         self.norm(a.iter().zip(b).map(|(x, y)| (x - y).abs()))
///     }
///
///     fn norm<I: IntoIterator<Item = f64>>(&self, deltas: I) -> f64 {
///         deltas.into_iter().enumerate().map(|(i, d)| if i == 0 { 2.0 * d } else { d }).sum()
///     }
///
///     fn name(&self) -> &str {
///         "weighted-manhattan"
///     }
///
///     fn obeys_triangle_inequality(&self) -> bool {
///         true
///     }
/// }
///
/// assert_eq!(Weighted.distance(&[0.0, 0.0], &[1.0, 1.0]), 3.0);
/// ```
pub trait Metric: Send + Sync {
    /// Call the metric on two points.
    fn distance(&self, a: &[f64], b: &[f64]) -> f64;

    /// Combine per-dimension absolute differences into a distance.
    fn norm<I: IntoIterator<Item = f64>>(&self, deltas: I) -> f64;

    /// The name of the metric.
    fn name(&self) -> &str;

    /// Whether the metric satisfies the triangle inequality.
    ///
    /// Ball bounds are only admissible for metrics that do.
    fn obeys_triangle_inequality(&self) -> bool;
}
