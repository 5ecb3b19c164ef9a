//! An axis-aligned hyper-rectangle.

use serde::{Deserialize, Serialize};

use crate::{dataset::PointSet, Metric, Result};

use super::BoundingVolume;

/// An axis-aligned hyper-rectangle, the bounding volume of a kd-tree.
///
/// # Example
///
/// ```rust
/// use dual_tree::{bound::Hrect, metric::Euclidean, BoundingVolume};
///
/// let a = Hrect::new(vec![0.0, 0.0], vec![1.0, 1.0]).unwrap();
/// let b = Hrect::new(vec![4.0, 5.0], vec![5.0, 6.0]).unwrap();
///
/// // The gap is 3 along x and 4 along y.
/// assert_eq!(a.min_distance(&b, &Euclidean), 5.0);
/// assert_eq!(a.min_distance_to_point(&[0.5, 0.5], &Euclidean), 0.0);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hrect {
    /// The lower corner.
    lo: Vec<f64>,
    /// The upper corner.
    hi: Vec<f64>,
}

impl Hrect {
    /// Creates a box from its two corners.
    ///
    /// # Errors
    ///
    /// * If the corners have different or zero dimensionality, or if
    ///   `lo[i] > hi[i]` for some `i`.
    pub fn new(lo: Vec<f64>, hi: Vec<f64>) -> Result<Self> {
        if lo.is_empty() || lo.len() != hi.len() {
            return Err(crate::TreeError::invalid(format!(
                "corners of dimension {} and {} do not describe a box",
                lo.len(),
                hi.len()
            )));
        }
        if lo.iter().zip(&hi).any(|(l, h)| l > h || !l.is_finite() || !h.is_finite()) {
            return Err(crate::TreeError::invalid("the lower corner must not exceed the upper corner"));
        }
        Ok(Self { lo, hi })
    }

    /// The axis-aligned box of the points in `begin..end`.
    pub(crate) fn of_range<P>(points: &PointSet<P>, begin: usize, end: usize) -> Self {
        let dim = points.dim();
        let mut lo = vec![f64::INFINITY; dim];
        let mut hi = vec![f64::NEG_INFINITY; dim];
        for i in begin..end {
            for (d, &c) in points.point(i).iter().enumerate() {
                lo[d] = lo[d].min(c);
                hi[d] = hi[d].max(c);
            }
        }
        Self { lo, hi }
    }

    /// The lower corner.
    #[must_use]
    pub fn lo(&self) -> &[f64] {
        &self.lo
    }

    /// The upper corner.
    #[must_use]
    pub fn hi(&self) -> &[f64] {
        &self.hi
    }

    /// The dimensionality of the box.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.lo.len()
    }

    /// The side lengths of the box.
    pub fn widths(&self) -> impl Iterator<Item = f64> + '_ {
        self.lo.iter().zip(&self.hi).map(|(l, h)| h - l)
    }

    /// The dimension of greatest spread and its `(lo, hi)` range.
    ///
    /// Ties go to the lowest dimension.
    #[must_use]
    pub fn widest_dimension(&self) -> Option<(usize, f64, f64)> {
        self.widths()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (d, w)| match best {
                Some((_, widest)) if widest >= w => best,
                _ => Some((d, w)),
            })
            .map(|(d, _)| (d, self.lo[d], self.hi[d]))
    }

    /// Per-dimension gaps between the two boxes, zero where they overlap.
    fn gaps<'a>(&'a self, other: &'a Self) -> impl Iterator<Item = f64> + 'a {
        self.lo
            .iter()
            .zip(&self.hi)
            .zip(other.lo.iter().zip(&other.hi))
            .map(|((&l, &h), (&ol, &oh))| (ol - h).max(l - oh).max(0.0))
    }

    /// Per-dimension distances between the farthest faces of the two boxes.
    fn spans<'a>(&'a self, other: &'a Self) -> impl Iterator<Item = f64> + 'a {
        self.lo
            .iter()
            .zip(&self.hi)
            .zip(other.lo.iter().zip(&other.hi))
            .map(|((&l, &h), (&ol, &oh))| (oh - l).max(h - ol))
    }
}

impl BoundingVolume for Hrect {
    fn name() -> &'static str {
        "hrect"
    }

    fn check_metric<M: Metric>(_: &M) -> Result<()> {
        Ok(())
    }

    fn from_range<P, M: Metric>(_: &PointSet<P>, _: usize, _: usize, extent: &Hrect, _: &M) -> Self {
        extent.clone()
    }

    fn min_distance<M: Metric>(&self, other: &Self, metric: &M) -> f64 {
        metric.norm(self.gaps(other))
    }

    fn max_distance<M: Metric>(&self, other: &Self, metric: &M) -> f64 {
        metric.norm(self.spans(other))
    }

    fn min_distance_to_point<M: Metric>(&self, point: &[f64], metric: &M) -> f64 {
        let gaps = self
            .lo
            .iter()
            .zip(&self.hi)
            .zip(point)
            .map(|((&l, &h), &p)| (l - p).max(p - h).max(0.0));
        metric.norm(gaps)
    }

    fn max_distance_to_point<M: Metric>(&self, point: &[f64], metric: &M) -> f64 {
        let spans = self
            .lo
            .iter()
            .zip(&self.hi)
            .zip(point)
            .map(|((&l, &h), &p)| (p - l).abs().max((h - p).abs()));
        metric.norm(spans)
    }
}

#[cfg(test)]
mod tests {
    use crate::{metric::Euclidean, BoundingVolume, PointSet};

    use super::Hrect;

    #[test]
    fn of_range_is_tight() {
        let points = PointSet::from_rows(&[[0.0, 5.0], [2.0, -1.0], [1.0, 3.0], [9.0, 9.0]]).unwrap();
        let hrect = Hrect::of_range(&points, 0, 3);
        assert_eq!(hrect.lo(), &[0.0, -1.0]);
        assert_eq!(hrect.hi(), &[2.0, 5.0]);
        assert_eq!(hrect.widest_dimension(), Some((1, -1.0, 5.0)));
    }

    #[test]
    fn widest_dimension_prefers_lowest_on_ties() {
        let hrect = Hrect::new(vec![0.0, 0.0, 0.0], vec![1.0, 2.0, 2.0]).unwrap();
        assert_eq!(hrect.widest_dimension(), Some((1, 0.0, 2.0)));
    }

    #[test]
    fn overlapping_boxes() {
        let a = Hrect::new(vec![0.0, 0.0], vec![2.0, 2.0]).unwrap();
        let b = Hrect::new(vec![1.0, 1.0], vec![3.0, 4.0]).unwrap();
        assert_eq!(a.min_distance(&b, &Euclidean), 0.0);
        // Farthest corners are (0, 0) and (3, 4).
        assert_eq!(a.max_distance(&b, &Euclidean), 5.0);
        assert_eq!(b.max_distance(&a, &Euclidean), 5.0);
    }

    #[test]
    fn point_bounds() {
        let a = Hrect::new(vec![0.0, 0.0], vec![1.0, 1.0]).unwrap();
        assert_eq!(a.min_distance_to_point(&[4.0, 5.0], &Euclidean), 5.0);
        assert_eq!(a.max_distance_to_point(&[4.0, 5.0], &Euclidean), 41.0_f64.sqrt());
    }

    #[test]
    fn rejects_bad_corners() {
        assert!(Hrect::new(vec![1.0], vec![0.0]).is_err());
        assert!(Hrect::new(vec![0.0], vec![1.0, 2.0]).is_err());
        assert!(Hrect::new(vec![], vec![]).is_err());
    }
}
