//! Point sets, the permutation produced by tree construction, and the
//! payload traits.

mod permutable;
mod permutation;
mod point_set;

pub use permutable::Permutable;
pub use permutation::Permutation;
pub use point_set::PointSet;

/// A per-point payload that carries a non-negative weight.
///
/// Kernel sums multiply every reference contribution by the weight of the
/// reference point. Payloads without a natural weight count as `1`.
pub trait Weighted {
    /// The weight of the point.
    fn weight(&self) -> f64;
}

impl Weighted for () {
    fn weight(&self) -> f64 {
        1.0
    }
}

impl Weighted for f64 {
    fn weight(&self) -> f64 {
        *self
    }
}

impl Weighted for f32 {
    fn weight(&self) -> f64 {
        f64::from(*self)
    }
}

/// A `(label, weight)` pair, e.g. for weighted classification data.
impl Weighted for (usize, f64) {
    fn weight(&self) -> f64 {
        self.1
    }
}
