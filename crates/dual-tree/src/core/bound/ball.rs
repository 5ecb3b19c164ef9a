//! A metric ball: a center and a radius.

use serde::{Deserialize, Serialize};

use crate::{dataset::PointSet, Metric, Result, TreeError};

use super::{BoundingVolume, Hrect};

/// A metric-`Ball` contains every point within `radius` of its `center`.
///
/// The center is the centroid of the points and the radius is the largest
/// distance from the center to any of them. Bounds between balls rely on the
/// triangle inequality, so a `Ball` can only be used with a metric that
/// obeys it.
///
/// # Example
///
/// ```rust
/// use dual_tree::{bound::Ball, metric::Euclidean, BoundingVolume};
///
/// let a = Ball::new(vec![0.0, 0.0], 1.0).unwrap();
/// let b = Ball::new(vec![6.0, 8.0], 2.0).unwrap();
///
/// assert_eq!(a.min_distance(&b, &Euclidean), 7.0);
/// assert_eq!(a.max_distance(&b, &Euclidean), 13.0);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    /// The center of the `Ball`.
    center: Vec<f64>,
    /// The radius of the `Ball`.
    radius: f64,
}

impl Ball {
    /// Creates a new `Ball`.
    ///
    /// # Errors
    ///
    /// * If the center is empty or not finite, or the radius is negative or
    ///   not finite.
    pub fn new(center: Vec<f64>, radius: f64) -> Result<Self> {
        if center.is_empty() || center.iter().any(|c| !c.is_finite()) {
            return Err(TreeError::invalid("the center of a ball must be a finite, non-empty point"));
        }
        if !crate::utils::is_non_negative(radius) {
            return Err(TreeError::invalid(format!("invalid radius {radius}")));
        }
        Ok(Self { center, radius })
    }

    /// The center of the `Ball`.
    #[must_use]
    pub fn center(&self) -> &[f64] {
        &self.center
    }

    /// The radius of the `Ball`.
    #[must_use]
    pub const fn radius(&self) -> f64 {
        self.radius
    }
}

impl BoundingVolume for Ball {
    fn name() -> &'static str {
        "ball"
    }

    fn check_metric<M: Metric>(metric: &M) -> Result<()> {
        if metric.obeys_triangle_inequality() {
            Ok(())
        } else {
            Err(TreeError::Unimplemented(format!(
                "ball bounds need a metric that obeys the triangle inequality, and {} does not",
                metric.name()
            )))
        }
    }

    fn from_range<P, M: Metric>(points: &PointSet<P>, begin: usize, end: usize, _: &Hrect, metric: &M) -> Self {
        let mut center = vec![0.0; points.dim()];
        for i in begin..end {
            for (c, &x) in center.iter_mut().zip(points.point(i)) {
                *c += x;
            }
        }
        #[allow(clippy::cast_precision_loss)]
        let count = (end - begin) as f64;
        center.iter_mut().for_each(|c| *c /= count);

        let radius = (begin..end)
            .map(|i| metric.distance(&center, points.point(i)))
            .fold(0.0, f64::max);

        Self { center, radius }
    }

    fn min_distance<M: Metric>(&self, other: &Self, metric: &M) -> f64 {
        (metric.distance(&self.center, &other.center) - self.radius - other.radius).max(0.0)
    }

    fn max_distance<M: Metric>(&self, other: &Self, metric: &M) -> f64 {
        metric.distance(&self.center, &other.center) + self.radius + other.radius
    }

    fn min_distance_to_point<M: Metric>(&self, point: &[f64], metric: &M) -> f64 {
        (metric.distance(&self.center, point) - self.radius).max(0.0)
    }

    fn max_distance_to_point<M: Metric>(&self, point: &[f64], metric: &M) -> f64 {
        metric.distance(&self.center, point) + self.radius
    }

    fn range_distance<M: Metric>(&self, other: &Self, metric: &M) -> (f64, f64) {
        let d = metric.distance(&self.center, &other.center);
        let r = self.radius + other.radius;
        ((d - r).max(0.0), d + r)
    }
}
