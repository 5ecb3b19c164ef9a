//! Data generation utilities for testing.

use dual_tree::PointSet;
use rand::prelude::*;

/// `car` points uniformly distributed in `[min, max)^dim`.
pub fn tabular(car: usize, dim: usize, min: f64, max: f64, seed: u64) -> PointSet {
    let mut rng = StdRng::seed_from_u64(seed);
    let coords = (0..car * dim).map(|_| rng.gen_range(min..max)).collect();
    PointSet::new(dim, coords).unwrap_or_else(|e| unreachable!("{e}"))
}

/// `car` points around `centers` well-separated cluster centers.
pub fn clustered(car: usize, dim: usize, centers: usize, seed: u64) -> PointSet {
    let mut rng = StdRng::seed_from_u64(seed);
    let centers = (0..centers)
        .map(|_| (0..dim).map(|_| rng.gen_range(-100.0..100.0)).collect::<Vec<f64>>())
        .collect::<Vec<_>>();
    let coords = (0..car)
        .flat_map(|i| {
            let center = &centers[i % centers.len()];
            center.iter().map(|c| c + rng.gen_range(-1.0..1.0)).collect::<Vec<_>>()
        })
        .collect();
    PointSet::new(dim, coords).unwrap_or_else(|e| unreachable!("{e}"))
}

/// The integer grid `[0, side)^2`.
pub fn grid(side: u32) -> PointSet {
    let rows = (0..side)
        .flat_map(|x| (0..side).map(move |y| [f64::from(x), f64::from(y)]))
        .collect::<Vec<_>>();
    PointSet::from_rows(&rows).unwrap_or_else(|e| unreachable!("{e}"))
}

/// The five points used by the round-trip scenarios.
pub fn five_points() -> PointSet {
    PointSet::from_rows(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [5.0, 5.0], [5.0, 6.0]])
        .unwrap_or_else(|e| unreachable!("{e}"))
}
