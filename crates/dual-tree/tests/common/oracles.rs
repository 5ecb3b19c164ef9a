//! Brute-force answers to check the traversals against.

use dual_tree::{dataset::Weighted, kde::Kernel, Metric, PointSet};

/// The sorted distances from every query to every reference point,
/// skipping `i == j` when `exclude_self` is set.
pub fn all_distances<M: Metric, P, Q>(
    queries: &PointSet<P>,
    references: &PointSet<Q>,
    metric: &M,
    exclude_self: bool,
) -> Vec<Vec<f64>> {
    queries
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let mut distances = references
                .iter()
                .enumerate()
                .filter(|&(j, _)| !(exclude_self && i == j))
                .map(|(_, r)| metric.distance(q, r))
                .collect::<Vec<_>>();
            distances.sort_by(f64::total_cmp);
            distances
        })
        .collect()
}

/// The true kernel sum of every query point.
pub fn kernel_sums<M: Metric, P, Q: Weighted>(
    queries: &PointSet<P>,
    references: &PointSet<Q>,
    metric: &M,
    kernel: &dyn Kernel,
) -> Vec<f64> {
    queries
        .iter()
        .map(|q| {
            references
                .iter()
                .zip(references.payloads())
                .map(|(r, w)| w.weight() * kernel.evaluate(metric.distance(q, r)))
                .sum()
        })
        .collect()
}

/// The rank of `distance` among the sorted `distances`: the number of
/// entries strictly smaller than it.
pub fn rank_of(distance: f64, sorted: &[f64]) -> usize {
    sorted.partition_point(|&d| d < distance)
}
