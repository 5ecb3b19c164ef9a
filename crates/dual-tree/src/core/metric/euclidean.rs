//! The `Euclidean` distance metric.

use super::Metric;

/// The `Euclidean` distance metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Euclidean;

impl Metric for Euclidean {
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        distances::vectors::euclidean(a, b)
    }

    fn norm<I: IntoIterator<Item = f64>>(&self, deltas: I) -> f64 {
        deltas.into_iter().map(|d| d * d).sum::<f64>().sqrt()
    }

    fn name(&self) -> &str {
        "euclidean"
    }

    fn obeys_triangle_inequality(&self) -> bool {
        true
    }
}
