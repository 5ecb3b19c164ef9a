//! The `Chebyshev` distance metric.

use super::Metric;

/// The `Chebyshev` (L-infinity) distance metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Chebyshev;

impl Metric for Chebyshev {
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        distances::vectors::chebyshev(a, b)
    }

    fn norm<I: IntoIterator<Item = f64>>(&self, deltas: I) -> f64 {
        deltas.into_iter().fold(0.0, f64::max)
    }

    fn name(&self) -> &str {
        "chebyshev"
    }

    fn obeys_triangle_inequality(&self) -> bool {
        true
    }
}
