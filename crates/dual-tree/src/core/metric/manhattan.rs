//! The `Manhattan` distance metric.

use super::Metric;

/// The `Manhattan` (L1) distance metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Manhattan;

impl Metric for Manhattan {
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        distances::vectors::manhattan(a, b)
    }

    fn norm<I: IntoIterator<Item = f64>>(&self, deltas: I) -> f64 {
        deltas.into_iter().sum()
    }

    fn name(&self) -> &str {
        "manhattan"
    }

    fn obeys_triangle_inequality(&self) -> bool {
        true
    }
}
