//! The `SquaredEuclidean` distance.

use super::Metric;

/// The square of the Euclidean distance.
///
/// It orders neighbors exactly like `Euclidean` and saves a square root per
/// evaluation, but it does not satisfy the triangle inequality, so it can
/// only be used with box bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SquaredEuclidean;

impl Metric for SquaredEuclidean {
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        distances::vectors::euclidean_sq(a, b)
    }

    fn norm<I: IntoIterator<Item = f64>>(&self, deltas: I) -> f64 {
        deltas.into_iter().map(|d| d * d).sum()
    }

    fn name(&self) -> &str {
        "squared-euclidean"
    }

    fn obeys_triangle_inequality(&self) -> bool {
        false
    }
}
